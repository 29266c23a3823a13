//! Command and reply types for the console.
//!
//! Every form submission is turned into a [`Command`] value and handed to the
//! controller; the outcome comes back as a [`Reply`] or an error, each of
//! which maps to an inline [`Alert`].

use serde::Serialize;

use crate::api::{ModelKind, ModelSummary, PredictionResponse, TabularTrainResponse, TrainResponse};
use crate::archive::ClassScan;
use crate::form::{CnnTrainingForm, FileUpload, PredictionRequest, TabularTrainingForm};

/// Work requested by the user.
#[derive(Debug, Clone)]
pub enum Command {
    /// Train a CNN on server-generated data
    TrainCnnWithTestData(CnnTrainingForm),
    /// Train a CNN on an uploaded archive of class folders
    TrainCnnWithRealData {
        form: CnnTrainingForm,
        /// `None` when the file input is empty
        archive: Option<FileUpload>,
    },
    /// Train a tabular model on an uploaded CSV or Excel file
    TrainTabularWithRealData {
        form: TabularTrainingForm,
        dataset: Option<FileUpload>,
    },
    /// Classify one image with a stored CNN
    PredictCnnWithRealData(PredictionRequest),
    /// Detect the classes of an archive to pre-fill the form
    ScanArchive(FileUpload),
    /// Fetch the stored models of one family
    ListModels(ModelKind),
    /// Delete a stored model
    DeleteModel { kind: ModelKind, name: String },
}

impl Command {
    /// Whether this command runs under the navigation guard.
    pub fn is_training(&self) -> bool {
        matches!(
            self,
            Command::TrainCnnWithTestData(_)
                | Command::TrainCnnWithRealData { .. }
                | Command::TrainTabularWithRealData { .. }
        )
    }
}

/// Successful outcome of a command.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    /// Training finished; `scan` is set when the run used an uploaded archive
    Trained {
        response: TrainResponse,
        scan: Option<ClassScan>,
    },
    TabularTrained {
        response: TabularTrainResponse,
    },
    Predicted {
        response: PredictionResponse,
    },
    Scanned(ClassScan),
    Models {
        kind: ModelKind,
        models: Vec<ModelSummary>,
    },
    Deleted {
        kind: ModelKind,
        name: String,
        message: Option<String>,
    },
}

impl Reply {
    /// Inline message confirming the outcome.
    pub fn success_alert(&self) -> Alert {
        match self {
            Reply::Trained { response, .. } => Alert::success(format!(
                "Model '{}' trained successfully (accuracy {})",
                response.model_name,
                response.accuracy_percent()
            )),
            Reply::TabularTrained { response } => match response.headline_metric() {
                Some((metric, value)) => Alert::success(format!(
                    "Model '{}' trained successfully ({} {:.4})",
                    response.model_name, metric, value
                )),
                None => Alert::success(format!(
                    "Model '{}' trained successfully",
                    response.model_name
                )),
            },
            Reply::Predicted { response } => Alert::success(format!(
                "Predicted '{}' with {:.2}% confidence",
                response.prediction.class_name,
                response.prediction.confidence * 100.0
            )),
            Reply::Scanned(scan) => Alert::info(format!(
                "Detected {} classes with {} images",
                scan.total_classes(),
                scan.total_images()
            )),
            Reply::Models { kind, models } if models.is_empty() => {
                Alert::info(format!("No {} models available", kind.name()))
            }
            Reply::Models { kind, models } => {
                Alert::info(format!("{} {} models available", models.len(), kind.name()))
            }
            Reply::Deleted { name, message, .. } => Alert::success(
                message
                    .clone()
                    .unwrap_or_else(|| format!("Model '{}' deleted", name)),
            ),
        }
    }
}

/// Severity of an inline alert, named after the CSS classes the pages use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Success,
    Info,
    Warning,
    Danger,
}

/// Message shown next to the form that triggered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub level: AlertLevel,
    pub message: String,
}

impl Alert {
    pub fn new(level: AlertLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(AlertLevel::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(AlertLevel::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(AlertLevel::Warning, message)
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self::new(AlertLevel::Danger, message)
    }
}
