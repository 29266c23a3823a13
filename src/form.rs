//! Training and prediction form data, validation and request encoding.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::archive::{ClassScan, is_image_file};
use crate::constants::{DEFAULT_TEST_SIZE, TABULAR_FILE_EXTENSIONS, cnn_defaults};

/// Reasons a training form is refused before anything is sent.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Model name is required")]
    MissingModelName,

    #[error("Number of classes must be at least {min} (got {found})")]
    TooFewClasses { found: u32, min: u32 },

    #[error("Learning rate must be greater than 0 and at most {max}")]
    LearningRate { max: f64 },

    #[error("Dropout rate must be at least 0 and below 1")]
    DropoutRate,

    #[error("Test split must be strictly between 0 and 1")]
    TestSize,

    #[error("Epochs must be at least 1")]
    Epochs,

    #[error("Batch size must be at least 1")]
    BatchSize,

    #[error("Please select a ZIP file with images")]
    MissingArchive,

    #[error("The file '{file_name}' is not a ZIP archive")]
    NotZip { file_name: String },

    #[error("Please select a CSV or Excel file")]
    MissingDataset,

    #[error("The file '{file_name}' must be CSV or Excel")]
    NotTabular { file_name: String },

    #[error("Please select a target column")]
    MissingTargetColumn,

    #[error("Please select at least one feature column")]
    NoFeatures,

    #[error("Please select an image to classify")]
    MissingImage,

    #[error("The file '{file_name}' must be an image (PNG, JPG, JPEG)")]
    NotImage { file_name: String },
}

/// Values of the CNN training form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CnnTrainingForm {
    pub model_name: String,
    pub architecture: String,
    pub num_classes: u32,
    pub learning_rate: f64,
    pub dropout_rate: f64,
    pub epochs: u32,
    pub batch_size: u32,
    pub test_size: f64,
    pub input_height: u32,
    pub input_width: u32,
    pub filters: Vec<u32>,
    pub dense_units: u32,
    pub data_augmentation: bool,
    /// Optional display names keyed by detected class index
    pub class_names: BTreeMap<usize, String>,
}

impl Default for CnnTrainingForm {
    fn default() -> Self {
        Self {
            model_name: String::new(),
            architecture: cnn_defaults::ARCHITECTURE.to_string(),
            num_classes: cnn_defaults::NUM_CLASSES,
            learning_rate: cnn_defaults::LEARNING_RATE,
            dropout_rate: cnn_defaults::DROPOUT_RATE,
            epochs: cnn_defaults::EPOCHS,
            batch_size: cnn_defaults::BATCH_SIZE,
            test_size: cnn_defaults::TEST_SIZE,
            input_height: cnn_defaults::INPUT_HEIGHT,
            input_width: cnn_defaults::INPUT_WIDTH,
            filters: cnn_defaults::FILTERS.to_vec(),
            dense_units: cnn_defaults::DENSE_UNITS,
            data_augmentation: true,
            class_names: BTreeMap::new(),
        }
    }
}

impl CnnTrainingForm {
    /// Form with default hyperparameters and the given model name.
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            ..Self::default()
        }
    }

    /// Check field ranges. Stops at the first problem, like the inline alerts do.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.model_name.trim().is_empty() {
            return Err(ValidationError::MissingModelName);
        }

        if self.num_classes < cnn_defaults::MIN_CLASSES {
            return Err(ValidationError::TooFewClasses {
                found: self.num_classes,
                min: cnn_defaults::MIN_CLASSES,
            });
        }

        // Negated comparisons so NaN is rejected too
        if !(self.learning_rate > 0.0 && self.learning_rate <= cnn_defaults::MAX_LEARNING_RATE) {
            return Err(ValidationError::LearningRate {
                max: cnn_defaults::MAX_LEARNING_RATE,
            });
        }

        if !(self.dropout_rate >= 0.0 && self.dropout_rate < 1.0) {
            return Err(ValidationError::DropoutRate);
        }

        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(ValidationError::TestSize);
        }

        if self.epochs == 0 {
            return Err(ValidationError::Epochs);
        }

        if self.batch_size == 0 {
            return Err(ValidationError::BatchSize);
        }

        Ok(())
    }

    /// Align the form with what an archive scan found.
    ///
    /// The server always trains on the detected class count, so the form
    /// follows it. Renames for indices that no longer exist are dropped.
    pub fn apply_scan(&mut self, scan: &ClassScan) {
        let detected = scan.total_classes();

        if self.num_classes as usize != detected {
            log::warn!(
                "Form specifies {} classes but the archive contains {}; using the detected count",
                self.num_classes,
                detected
            );
            self.num_classes = u32::try_from(detected).unwrap_or(u32::MAX);
        }

        self.class_names
            .retain(|index, name| *index < detected && !name.trim().is_empty());
    }

    /// Rename a detected class. Blank names clear the rename.
    pub fn rename_class(&mut self, index: usize, name: &str) {
        let name = name.trim();
        if name.is_empty() {
            self.class_names.remove(&index);
        } else {
            self.class_names.insert(index, name.to_string());
        }
    }

    /// Multipart text fields, in the names the backend reads.
    pub fn to_multipart_fields(&self) -> Vec<(String, String)> {
        let filters = self
            .filters
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        let mut fields = vec![
            ("model_name".to_string(), self.model_name.trim().to_string()),
            ("architecture".to_string(), self.architecture.clone()),
            ("num_classes".to_string(), self.num_classes.to_string()),
            ("learning_rate".to_string(), self.learning_rate.to_string()),
            ("dropout_rate".to_string(), self.dropout_rate.to_string()),
            ("epochs".to_string(), self.epochs.to_string()),
            ("batch_size".to_string(), self.batch_size.to_string()),
            ("test_size".to_string(), self.test_size.to_string()),
            ("input_height".to_string(), self.input_height.to_string()),
            ("input_width".to_string(), self.input_width.to_string()),
            ("filters".to_string(), format!("[{}]", filters)),
            ("dense_units".to_string(), self.dense_units.to_string()),
            (
                "data_augmentation".to_string(),
                self.data_augmentation.to_string(),
            ),
        ];

        for (index, name) in &self.class_names {
            let name = name.trim();
            if !name.is_empty() {
                fields.push((format!("class_name_{}", index), name.to_string()));
            }
        }

        fields
    }
}

/// JSON body for training on synthetic data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestTrainingRequest {
    pub model_name: String,
    pub architecture: String,
    pub num_classes: u32,
    pub learning_rate: f64,
    pub dropout_rate: f64,
    pub epochs: u32,
    pub batch_size: u32,
    pub test_size: f64,
    pub input_height: u32,
    pub input_width: u32,
    pub filters: Vec<u32>,
    pub dense_units: u32,
    pub data_augmentation: bool,
    /// Only sent for the custom architecture; pretrained ones fix their own input size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_shape: Option<[u32; 3]>,
}

impl From<&CnnTrainingForm> for TestTrainingRequest {
    fn from(form: &CnnTrainingForm) -> Self {
        let input_shape = (form.architecture == cnn_defaults::ARCHITECTURE)
            .then_some([form.input_height, form.input_width, 3]);

        Self {
            model_name: form.model_name.trim().to_string(),
            architecture: form.architecture.clone(),
            num_classes: form.num_classes,
            learning_rate: form.learning_rate,
            dropout_rate: form.dropout_rate,
            epochs: form.epochs,
            batch_size: form.batch_size,
            test_size: form.test_size,
            input_height: form.input_height,
            input_width: form.input_width,
            filters: form.filters.clone(),
            dense_units: form.dense_units,
            data_augmentation: form.data_augmentation,
            input_shape,
        }
    }
}

/// Check if a filename is a spreadsheet the tabular endpoint reads.
pub fn is_tabular_file(filename: &str) -> bool {
    filename.rsplit_once('.').is_some_and(|(_, ext)| {
        TABULAR_FILE_EXTENSIONS
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext))
    })
}

/// Estimator trained by the tabular endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabularAlgorithm {
    #[default]
    RandomForest,
    Svm,
    Knn,
    LinearRegression,
}

impl TabularAlgorithm {
    /// Name the backend expects.
    pub fn as_str(&self) -> &'static str {
        match self {
            TabularAlgorithm::RandomForest => "random_forest",
            TabularAlgorithm::Svm => "svm",
            TabularAlgorithm::Knn => "knn",
            TabularAlgorithm::LinearRegression => "linear_regression",
        }
    }

    /// Hyperparameters this estimator understands.
    fn params(&self) -> &'static [&'static str] {
        match self {
            TabularAlgorithm::RandomForest => &["n_estimators", "max_depth", "min_samples_split"],
            TabularAlgorithm::Svm => &["kernel", "C", "gamma"],
            TabularAlgorithm::Knn => &["n_neighbors", "weights", "algorithm"],
            TabularAlgorithm::LinearRegression => &["model_type", "alpha"],
        }
    }
}

/// Kind of target the tabular model predicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemType {
    #[default]
    Classification,
    Regression,
}

impl ProblemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemType::Classification => "classification",
            ProblemType::Regression => "regression",
        }
    }
}

/// Values of the tabular training form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabularTrainingForm {
    pub model_name: String,
    pub target_column: String,
    pub features: Vec<String>,
    pub categorical_columns: Vec<String>,
    pub algorithm: TabularAlgorithm,
    pub problem_type: ProblemType,
    /// Hyperparameters; keys the algorithm does not use are not sent
    pub model_params: serde_json::Map<String, serde_json::Value>,
    pub test_size: f64,
}

impl Default for TabularTrainingForm {
    fn default() -> Self {
        Self {
            model_name: String::new(),
            target_column: String::new(),
            features: Vec::new(),
            categorical_columns: Vec::new(),
            algorithm: TabularAlgorithm::default(),
            problem_type: ProblemType::default(),
            model_params: serde_json::Map::new(),
            test_size: DEFAULT_TEST_SIZE,
        }
    }
}

impl TabularTrainingForm {
    pub fn new(model_name: impl Into<String>, target_column: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            target_column: target_column.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.model_name.trim().is_empty() {
            return Err(ValidationError::MissingModelName);
        }
        if self.target_column.trim().is_empty() {
            return Err(ValidationError::MissingTargetColumn);
        }
        if self.features.is_empty() {
            return Err(ValidationError::NoFeatures);
        }
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(ValidationError::TestSize);
        }
        Ok(())
    }

    /// Hyperparameters relevant to the selected algorithm.
    pub fn algorithm_params(&self) -> serde_json::Map<String, serde_json::Value> {
        let allowed = self.algorithm.params();
        self.model_params
            .iter()
            .filter(|(key, _)| allowed.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Multipart text fields; list and object values are JSON-encoded.
    pub fn to_multipart_fields(&self) -> Vec<(String, String)> {
        let json_list = |items: &[String]| serde_json::Value::from(items.to_vec()).to_string();

        vec![
            ("model_name".to_string(), self.model_name.trim().to_string()),
            ("target_column".to_string(), self.target_column.clone()),
            ("features".to_string(), json_list(&self.features)),
            (
                "categorical_columns".to_string(),
                json_list(&self.categorical_columns),
            ),
            ("algorithm".to_string(), self.algorithm.as_str().to_string()),
            (
                "problem_type".to_string(),
                self.problem_type.as_str().to_string(),
            ),
            (
                "model_params".to_string(),
                serde_json::Value::Object(self.algorithm_params()).to_string(),
            ),
            ("test_size".to_string(), self.test_size.to_string()),
        ]
    }
}

/// Image to classify with a stored CNN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionRequest {
    pub model_name: String,
    pub image: Option<FileUpload>,
}

impl PredictionRequest {
    /// Check the model choice and image, returning the image to send.
    pub fn validated_image(&self) -> Result<&FileUpload, ValidationError> {
        if self.model_name.trim().is_empty() {
            return Err(ValidationError::MissingModelName);
        }
        let image = self.image.as_ref().ok_or(ValidationError::MissingImage)?;
        if !is_image_file(&image.file_name) {
            return Err(ValidationError::NotImage {
                file_name: image.file_name.clone(),
            });
        }
        Ok(image)
    }
}

/// A user-selected file (archive, image or spreadsheet), already read into memory.
#[derive(Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub file_name: String,
    pub data: Vec<u8>,
}

impl FileUpload {
    pub fn new(file_name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            data,
        }
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileUpload")
            .field("file_name", &self.file_name)
            .field("len", &self.data.len())
            .finish()
    }
}
