//! API Models Module
//!
//! Request and response payloads for the REST surface, plus the server
//! configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use modelyard_core::models::store::ModelRecord;

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Version string reported by the service
    pub version: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Training request payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainRequest {
    /// Algorithm key: logistic_regression | random_forest
    pub model_key: String,
    pub dataset_id: String,
    #[serde(default = "default_target_column")]
    pub target_column: String,
    #[serde(default)]
    pub hyperparams: Option<HashMap<String, Value>>,
    #[serde(default = "default_test_size")]
    pub test_size: f64,
    #[serde(default = "default_shuffle")]
    pub shuffle: bool,
    #[serde(default = "default_random_state")]
    pub random_state: u64,
    /// When set, retrains the existing model id (overwrite)
    #[serde(default)]
    pub model_id: Option<String>,
}

fn default_target_column() -> String {
    "target".to_string()
}

fn default_test_size() -> f64 {
    0.2
}

fn default_shuffle() -> bool {
    true
}

fn default_random_state() -> u64 {
    42
}

/// Training response payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainResponse {
    pub model_id: String,
    pub model_key: String,
    pub metrics: HashMap<String, f64>,
}

/// Prediction request payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    pub model_id: String,
    /// One object per instance: {feature: value}
    pub instances: Vec<Value>,
}

/// Prediction response payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predictions: Vec<Value>,
    pub probabilities: Option<Vec<Vec<f64>>>,
}

/// Model listing entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_id: String,
    pub model_key: String,
    pub dataset_id: String,
    pub target_column: String,
    pub created_at: String,
    pub metrics: Option<HashMap<String, f64>>,
}

impl From<ModelRecord> for ModelInfo {
    fn from(record: ModelRecord) -> Self {
        Self {
            model_id: record.model_id,
            model_key: record.model_key,
            dataset_id: record.dataset_id,
            target_column: record.target_column,
            created_at: record.created_at.to_rfc3339(),
            metrics: Some(record.metrics),
        }
    }
}

/// Available algorithm keys
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelClassesResponse {
    pub classes: Vec<String>,
}

/// Error body returned with non-2xx statuses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_train_request_defaults() {
        let request: TrainRequest = serde_json::from_str(
            r#"{"model_key": "logistic_regression", "dataset_id": "d1"}"#,
        )
        .unwrap();

        assert_eq!(request.target_column, "target");
        assert_eq!(request.test_size, 0.2);
        assert!(request.shuffle);
        assert_eq!(request.random_state, 42);
        assert!(request.hyperparams.is_none());
        assert!(request.model_id.is_none());
    }

    #[test]
    fn test_model_info_from_record() {
        let record = ModelRecord {
            model_id: "m1".to_string(),
            model_key: "random_forest".to_string(),
            dataset_id: "d1".to_string(),
            target_column: "target".to_string(),
            features: vec!["a".to_string()],
            metrics: HashMap::from([("accuracy".to_string(), 0.9)]),
            hyperparams: HashMap::new(),
            test_size: 0.2,
            shuffle: true,
            random_state: 42,
            path: "artifacts/models/m1.model".to_string(),
            created_at: chrono::Utc::now(),
        };

        let info = ModelInfo::from(record);
        assert_eq!(info.model_id, "m1");
        assert_eq!(info.metrics.unwrap().get("accuracy"), Some(&0.9));
    }
}
