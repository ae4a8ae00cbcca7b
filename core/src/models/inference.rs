//! Inference Service
//!
//! Loads a stored model artifact and applies it to JSON instances using
//! the feature schema fitted at training time. Instances missing trained
//! feature columns are rejected; explicit nulls are imputed.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::dataset::table::DataTable;
use crate::error::CoreError;
use crate::models::store::ModelStore;

/// Inference result
#[derive(Debug, Clone)]
pub struct Prediction {
    pub predictions: Vec<Value>,
    pub probabilities: Option<Vec<Vec<f64>>>,
}

/// Runs predictions against stored models
pub struct InferenceService {
    models: Arc<ModelStore>,
}

impl InferenceService {
    pub fn new(models: Arc<ModelStore>) -> Self {
        Self { models }
    }

    /// Predict labels (and probabilities where available) for a batch of
    /// instances.
    pub async fn predict(
        &self,
        model_id: &str,
        instances: &[Value],
    ) -> Result<Prediction, CoreError> {
        if instances.is_empty() {
            return Err(CoreError::NoInstances);
        }

        let (artifact, record) = self.models.load(model_id).await?;
        debug!(
            "running inference model_id={} instances={}",
            model_id,
            instances.len()
        );

        // Every trained feature column must be present in every instance;
        // a null value is allowed, an absent key is not.
        let feature_names = artifact.schema.feature_names();
        let mut missing: Vec<String> = Vec::new();
        for instance in instances {
            let object = instance.as_object().ok_or_else(|| {
                CoreError::DatasetParse(format!("expected a JSON object, got {}", instance))
            })?;
            for name in &feature_names {
                if !object.contains_key(name) && !missing.contains(name) {
                    missing.push(name.clone());
                }
            }
        }
        if !missing.is_empty() {
            missing.sort();
            return Err(CoreError::SchemaMismatch { columns: missing });
        }

        let table = DataTable::from_json_records(instances)?;
        let features = artifact.schema.transform(&table)?;

        let encoded = artifact.estimator.predict(&features);
        let predictions: Vec<Value> = encoded.iter().map(|&c| artifact.target.decode(c)).collect();

        let probabilities = artifact
            .estimator
            .predict_probabilities(&features)
            .map(|matrix| matrix.outer_iter().map(|row| row.to_vec()).collect());

        debug!(
            "inference complete model_id={} model_key={}",
            model_id, record.model_key
        );

        Ok(Prediction {
            predictions,
            probabilities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::dataset::store::DatasetStore;
    use crate::integrations::tracking::TrackingClient;
    use crate::models::registry::AlgorithmRegistry;
    use crate::models::training::{TrainSpec, TrainingService};
    use serde_json::json;
    use std::collections::HashMap;
    use tempfile::tempdir;

    async fn trained_model(dir: &std::path::Path) -> (InferenceService, String) {
        let datasets = Arc::new(DatasetStore::new(dir.join("datasets")).unwrap());
        let models = Arc::new(ModelStore::new(dir.join("models")).unwrap());
        let registry = Arc::new(AlgorithmRegistry::builtin());
        let tracking = Arc::new(TrackingClient::new(&Settings::default()));

        let mut csv = String::from("f_num,f_cat,target\n");
        for i in 0..20 {
            if i % 2 == 0 {
                csv.push_str(&format!("{}.0,A,yes\n", i));
            } else {
                csv.push_str(&format!("{}.0,B,no\n", 100 + i));
            }
        }
        let table = crate::dataset::table::DataTable::from_csv(&csv).unwrap();
        datasets.save("d1", &table, None).unwrap();

        let training =
            TrainingService::new(datasets, models.clone(), registry, tracking);
        let mut spec = TrainSpec::new("d1", "target", "logistic_regression");
        spec.hyperparams = HashMap::from([("max_iterations".to_string(), json!(100))]);
        let outcome = training.train(spec).await.unwrap();

        (InferenceService::new(models), outcome.model_id)
    }

    #[tokio::test]
    async fn test_predict_returns_one_result_per_instance() {
        let dir = tempdir().unwrap();
        let (inference, model_id) = trained_model(dir.path()).await;

        let instances = vec![
            json!({"f_num": 1.0, "f_cat": "A"}),
            json!({"f_num": 111.0, "f_cat": "B"}),
        ];
        let result = inference.predict(&model_id, &instances).await.unwrap();

        assert_eq!(result.predictions.len(), 2);
        assert_eq!(result.predictions[0], json!("yes"));
        assert_eq!(result.predictions[1], json!("no"));

        let probabilities = result.probabilities.unwrap();
        assert_eq!(probabilities.len(), 2);
        assert_eq!(probabilities[0].len(), 2);
    }

    #[tokio::test]
    async fn test_predict_unknown_model() {
        let dir = tempdir().unwrap();
        let (inference, _) = trained_model(dir.path()).await;

        let result = inference.predict("absent", &[json!({"f_num": 1.0})]).await;
        assert!(matches!(result, Err(CoreError::ModelNotFound)));
    }

    #[tokio::test]
    async fn test_predict_no_instances() {
        let dir = tempdir().unwrap();
        let (inference, model_id) = trained_model(dir.path()).await;

        let result = inference.predict(&model_id, &[]).await;
        assert!(matches!(result, Err(CoreError::NoInstances)));
    }

    #[tokio::test]
    async fn test_predict_missing_column_is_schema_mismatch() {
        let dir = tempdir().unwrap();
        let (inference, model_id) = trained_model(dir.path()).await;

        let result = inference
            .predict(&model_id, &[json!({"f_num": 1.0})])
            .await;
        match result {
            Err(CoreError::SchemaMismatch { columns }) => {
                assert_eq!(columns, vec!["f_cat".to_string()])
            }
            other => panic!("expected schema mismatch, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_predict_allows_null_values_and_extra_keys() {
        let dir = tempdir().unwrap();
        let (inference, model_id) = trained_model(dir.path()).await;

        let instances = vec![json!({"f_num": null, "f_cat": "A", "ignored": 5})];
        let result = inference.predict(&model_id, &instances).await.unwrap();
        assert_eq!(result.predictions.len(), 1);
    }
}
