//! Response bodies returned by the backend.

use serde::{Deserialize, Serialize};

/// Metrics of the trained model on the held-out split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub accuracy: f64,
    pub loss: f64,
    /// Hyperparameters echoed back by the server, if any
    #[serde(default)]
    pub model_params: Option<serde_json::Value>,
}

/// Per-epoch curves recorded during training.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    #[serde(default)]
    pub accuracy: Vec<f64>,
    #[serde(default)]
    pub loss: Vec<f64>,
    #[serde(default)]
    pub val_accuracy: Vec<f64>,
    #[serde(default)]
    pub val_loss: Vec<f64>,
}

/// Result of a training request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub model_name: String,
    #[serde(default)]
    pub model_path: Option<String>,
    pub evaluation: Evaluation,
    #[serde(default)]
    pub history: Option<TrainingHistory>,
}

impl TrainResponse {
    /// Accuracy formatted as a percentage with two decimals.
    pub fn accuracy_percent(&self) -> String {
        format!("{:.2}%", self.evaluation.accuracy * 100.0)
    }

    /// Architecture reported by the server, `"custom"` when absent.
    pub fn architecture(&self) -> &str {
        self.evaluation
            .model_params
            .as_ref()
            .and_then(|p| p.get("architecture"))
            .and_then(|a| a.as_str())
            .unwrap_or("custom")
    }

    /// Number of epochs actually run.
    pub fn epochs_run(&self) -> usize {
        self.history.as_ref().map_or(0, |h| h.accuracy.len())
    }
}

/// A stored model as listed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub id: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Body of the model listing endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelListResponse {
    #[serde(default)]
    pub models: Vec<ModelSummary>,
}

/// Body of the model deletion endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Result of a tabular training request.
///
/// Metrics depend on the problem type (accuracy and F1 for classification,
/// MSE and R² for regression), so they are kept as raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabularTrainResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub model_name: String,
    #[serde(default)]
    pub model_path: Option<String>,
    #[serde(default)]
    pub evaluation: serde_json::Value,
    #[serde(default)]
    pub feature_importance: Option<serde_json::Value>,
    #[serde(default)]
    pub feature_names: Vec<String>,
}

impl TabularTrainResponse {
    /// Headline metric for the success alert: accuracy, else R².
    pub fn headline_metric(&self) -> Option<(&'static str, f64)> {
        let metric = |key: &str| self.evaluation.get(key).and_then(|v| v.as_f64());
        metric("accuracy")
            .map(|v| ("accuracy", v))
            .or_else(|| metric("r2").map(|v| ("R²", v)))
    }
}

/// Most likely class for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(rename = "class")]
    pub class_index: usize,
    pub class_name: String,
    pub confidence: f64,
    #[serde(default)]
    pub probabilities: Vec<f64>,
}

/// Result of classifying an uploaded image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    #[serde(default)]
    pub success: bool,
    pub model_name: String,
    pub prediction: Prediction,
    /// Base64 copy of the uploaded image, for display
    #[serde(default)]
    pub image: Option<String>,
}

/// New access token issued by the refresh endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRAIN_BODY: &str = r#"{
        "success": true,
        "message": "Model trained successfully",
        "model_name": "flowers",
        "model_path": "models/cnn/flowers",
        "evaluation": {"accuracy": 0.8765, "loss": 0.4321, "model_params": {"architecture": "vgg16"}},
        "history": {"accuracy": [0.5, 0.7, 0.8], "loss": [1.0, 0.7, 0.5], "val_accuracy": [0.4, 0.6, 0.7]}
    }"#;

    #[test]
    fn test_train_response() {
        let resp: TrainResponse = serde_json::from_str(TRAIN_BODY).unwrap();
        assert_eq!(resp.model_name, "flowers");
        assert_eq!(resp.accuracy_percent(), "87.65%");
        assert_eq!(resp.architecture(), "vgg16");
        assert_eq!(resp.epochs_run(), 3);
        assert!(resp.history.unwrap().val_loss.is_empty());
    }

    #[test]
    fn test_minimal_train_response() {
        let resp: TrainResponse = serde_json::from_str(
            r#"{"model_name": "m", "evaluation": {"accuracy": 0.5, "loss": 1.0}}"#,
        )
        .unwrap();
        assert!(!resp.success);
        assert_eq!(resp.architecture(), "custom");
        assert_eq!(resp.epochs_run(), 0);
    }

    #[test]
    fn test_model_list() {
        let resp: ModelListResponse = serde_json::from_str(
            r#"{"success": true, "models": [
                {"id": "flowers", "path": "models/cnn/flowers", "created_at": "2024-05-01T10:00:00",
                 "metadata": {"accuracy": 0.9}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(resp.models.len(), 1);
        assert_eq!(resp.models[0].id, "flowers");
        assert_eq!(resp.models[0].metadata["accuracy"], 0.9);
    }

    #[test]
    fn test_tabular_train_response() {
        let resp: TabularTrainResponse = serde_json::from_str(
            r#"{"success": true, "model_name": "iris", "model_path": "models/tabular/iris",
                "evaluation": {"accuracy": 0.96, "f1": 0.95},
                "feature_names": ["sepal_length", "petal_width"]}"#,
        )
        .unwrap();
        assert_eq!(resp.headline_metric(), Some(("accuracy", 0.96)));
        assert_eq!(resp.feature_names.len(), 2);

        let regression: TabularTrainResponse = serde_json::from_str(
            r#"{"model_name": "house", "evaluation": {"mse": 3.2, "r2": 0.81}}"#,
        )
        .unwrap();
        assert_eq!(regression.headline_metric(), Some(("R²", 0.81)));
    }

    #[test]
    fn test_prediction_response() {
        let resp: PredictionResponse = serde_json::from_str(
            r#"{"success": true, "model_name": "pets",
                "prediction": {"class": 1, "class_name": "dogs", "confidence": 0.93,
                               "probabilities": [0.07, 0.93]},
                "image": "aGk=", "metadata": {"ignored": true}}"#,
        )
        .unwrap();
        assert_eq!(resp.prediction.class_index, 1);
        assert_eq!(resp.prediction.class_name, "dogs");
        assert_eq!(resp.image.as_deref(), Some("aGk="));
    }

    #[test]
    fn test_refresh_response() {
        let resp: RefreshResponse = serde_json::from_str(r#"{"access_token": "fresh"}"#).unwrap();
        assert_eq!(resp.access_token, "fresh");
    }
}
