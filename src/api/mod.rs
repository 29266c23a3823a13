//! Backend API contract.
//!
//! The console talks to the model management backend over HTTP with a bearer
//! token. Handlers only see the [`ModelApi`] trait; the browser build provides
//! a `fetch`-based implementation and tests substitute their own.

mod error;
#[cfg(target_arch = "wasm32")]
mod fetch;
mod types;

use std::future::Future;

pub use error::{ApiError, parse_response};
#[cfg(target_arch = "wasm32")]
pub use fetch::FetchApi;
pub use types::{
    DeleteResponse, Evaluation, ModelListResponse, ModelSummary, Prediction, PredictionResponse,
    RefreshResponse, TabularTrainResponse, TrainResponse, TrainingHistory,
};

use crate::form::{CnnTrainingForm, FileUpload, TabularTrainingForm, TestTrainingRequest};
use crate::session::Session;

/// Train a CNN on server-generated synthetic data (JSON body).
pub const CNN_TRAIN_TEST_ENDPOINT: &str = "/api/ml/cnn/train/test";

/// Train a CNN on an uploaded ZIP archive (multipart body, file field `file`).
pub const CNN_TRAIN_REAL_ENDPOINT: &str = "/api/ml/cnn/train/real";

/// Classify one uploaded image with a stored CNN (multipart).
pub const CNN_PREDICT_REAL_ENDPOINT: &str = "/api/ml/cnn/predict/real";

/// Train a tabular model on an uploaded CSV or Excel file (multipart).
pub const TABULAR_TRAIN_REAL_ENDPOINT: &str = "/api/ml/tabular/train/real";

/// Exchange the refresh token for a new access token.
pub const AUTH_REFRESH_ENDPOINT: &str = "/auth/refresh";

/// Multipart field carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "file";

/// Family of stored models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Cnn,
    Tabular,
}

impl ModelKind {
    /// Listing endpoint for this model family.
    pub fn models_endpoint(&self) -> &'static str {
        match self {
            ModelKind::Cnn => "/api/ml/cnn/models",
            ModelKind::Tabular => "/api/ml/tabular/models",
        }
    }

    /// Deletion endpoint for one model. `encoded_name` must already be URL-encoded.
    pub fn model_endpoint(&self, encoded_name: &str) -> String {
        format!("{}/{}", self.models_endpoint(), encoded_name)
    }

    /// Get the display name for this model family.
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::Cnn => "CNN",
            ModelKind::Tabular => "Tabular",
        }
    }
}

/// Operations the console needs from the backend.
pub trait ModelApi {
    /// Credentials the requests are made with.
    fn session(&self) -> Session;

    /// Train a CNN on synthetic data.
    fn train_cnn_test(
        &self,
        request: &TestTrainingRequest,
    ) -> impl Future<Output = Result<TrainResponse, ApiError>>;

    /// Train a CNN on the images of an uploaded archive.
    fn train_cnn_real(
        &self,
        form: &CnnTrainingForm,
        archive: &FileUpload,
    ) -> impl Future<Output = Result<TrainResponse, ApiError>>;

    /// Train a tabular model on an uploaded spreadsheet.
    fn train_tabular_real(
        &self,
        form: &TabularTrainingForm,
        dataset: &FileUpload,
    ) -> impl Future<Output = Result<TabularTrainResponse, ApiError>>;

    /// Classify one image with a stored CNN.
    fn predict_cnn_real(
        &self,
        model_name: &str,
        image: &FileUpload,
    ) -> impl Future<Output = Result<PredictionResponse, ApiError>>;

    /// List stored models of one family.
    fn list_models(
        &self,
        kind: ModelKind,
    ) -> impl Future<Output = Result<ModelListResponse, ApiError>>;

    /// Delete a stored model.
    fn delete_model(
        &self,
        kind: ModelKind,
        name: &str,
    ) -> impl Future<Output = Result<DeleteResponse, ApiError>>;
}
