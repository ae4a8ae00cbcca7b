//! Core error surface
//!
//! Every fallible operation in the service layer returns one of these
//! variants. The REST and RPC layers map them onto HTTP status codes and
//! gRPC status codes respectively.

use std::io;

/// Service-layer errors
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Dataset not found")]
    DatasetNotFound,

    #[error("Failed to parse dataset: {0}")]
    DatasetParse(String),

    #[error("Failed to read dataset: {0}")]
    DatasetRead(String),

    #[error("Empty dataset")]
    EmptyDataset,

    #[error("Dataset is referenced by trained models: {model_ids:?}")]
    DatasetInUse { model_ids: Vec<String> },

    #[error("Model not found")]
    ModelNotFound,

    #[error("Unknown model_key: {0}")]
    UnknownModelKey(String),

    #[error("Target column {0} not found")]
    TargetColumnNotFound(String),

    #[error("No instances provided")]
    NoInstances,

    #[error("Instances are missing trained feature columns: {columns:?}")]
    SchemaMismatch { columns: Vec<String> },

    #[error("Training failed: {0}")]
    Training(String),

    #[error("Model artifact error: {0}")]
    Artifact(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Whether the error denotes a missing resource (the NotFound category).
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::DatasetNotFound | CoreError::ModelNotFound)
    }

    /// Whether the error was caused by the caller's input (the
    /// InvalidParameters / SchemaMismatch categories).
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            CoreError::DatasetParse(_)
                | CoreError::DatasetRead(_)
                | CoreError::EmptyDataset
                | CoreError::UnknownModelKey(_)
                | CoreError::TargetColumnNotFound(_)
                | CoreError::NoInstances
                | CoreError::SchemaMismatch { .. }
                | CoreError::Training(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert!(CoreError::ModelNotFound.is_not_found());
        assert!(CoreError::DatasetNotFound.is_not_found());
        assert!(!CoreError::EmptyDataset.is_not_found());

        assert!(CoreError::NoInstances.is_invalid_input());
        assert!(CoreError::UnknownModelKey("svm".to_string()).is_invalid_input());
        assert!(!CoreError::ModelNotFound.is_invalid_input());
    }

    #[test]
    fn test_error_messages() {
        let err = CoreError::TargetColumnNotFound("target".to_string());
        assert_eq!(err.to_string(), "Target column target not found");

        let err = CoreError::UnknownModelKey("perceptron".to_string());
        assert_eq!(err.to_string(), "Unknown model_key: perceptron");
    }
}
