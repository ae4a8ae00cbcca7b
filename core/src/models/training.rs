//! Training Service
//!
//! Orchestrates a training run: resolve the dataset, target column and
//! algorithm, split the rows, fit the feature schema and estimator on the
//! training partition, evaluate on the held-out partition, persist the
//! artifact and record, and publish the run to experiment tracking on a
//! best-effort basis.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rand::seq::SliceRandom;
use rand::{rngs::StdRng, SeedableRng};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::dataset::store::DatasetStore;
use crate::dataset::table::{Cell, DataTable};
use crate::error::CoreError;
use crate::integrations::tracking::{TrackingClient, TrainingRun};
use crate::models::estimator::Estimator;
use crate::models::metrics::classification_metrics;
use crate::models::preprocess::{FeatureSchema, TargetEncoder};
use crate::models::registry::AlgorithmRegistry;
use crate::models::store::{ModelArtifact, ModelRecord, ModelStore};

/// Inputs of a training run
#[derive(Debug, Clone)]
pub struct TrainSpec {
    pub dataset_id: String,
    pub target_column: String,
    pub model_key: String,
    pub hyperparams: HashMap<String, Value>,
    pub test_size: f64,
    pub shuffle: bool,
    pub random_state: u64,
    /// When set, retrains and overwrites the existing model id
    pub model_id: Option<String>,
}

impl TrainSpec {
    pub fn new(dataset_id: &str, target_column: &str, model_key: &str) -> Self {
        Self {
            dataset_id: dataset_id.to_string(),
            target_column: target_column.to_string(),
            model_key: model_key.to_string(),
            hyperparams: HashMap::new(),
            test_size: 0.2,
            shuffle: true,
            random_state: 42,
            model_id: None,
        }
    }
}

/// Result of a training run
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub model_id: String,
    pub metrics: HashMap<String, f64>,
}

/// Trains models and registers them in the model store
pub struct TrainingService {
    datasets: Arc<DatasetStore>,
    models: Arc<ModelStore>,
    registry: Arc<AlgorithmRegistry>,
    tracking: Arc<TrackingClient>,
}

impl TrainingService {
    pub fn new(
        datasets: Arc<DatasetStore>,
        models: Arc<ModelStore>,
        registry: Arc<AlgorithmRegistry>,
        tracking: Arc<TrackingClient>,
    ) -> Self {
        Self {
            datasets,
            models,
            registry,
            tracking,
        }
    }

    /// Run a training job and register the resulting model.
    pub async fn train(&self, spec: TrainSpec) -> Result<TrainOutcome, CoreError> {
        // Retraining requires the id to exist already.
        if let Some(model_id) = &spec.model_id {
            if !self.models.contains(model_id).await {
                return Err(CoreError::ModelNotFound);
            }
        }

        let hyperparams = self.registry.resolve(&spec.model_key, &spec.hyperparams)?;

        let mut table = self.datasets.load_table(&spec.dataset_id)?;
        let target_index = table
            .column_index(&spec.target_column)
            .ok_or_else(|| CoreError::TargetColumnNotFound(spec.target_column.clone()))?;
        let target_cells = table.take_column(target_index);

        if table.n_cols() == 0 {
            return Err(CoreError::Training(
                "dataset has no feature columns".to_string(),
            ));
        }

        let (train_indices, test_indices) = split_indices(
            table.n_rows(),
            spec.test_size,
            spec.shuffle,
            spec.random_state,
        )?;

        let train_table = select_rows(&table, &train_indices);
        let test_table = select_rows(&table, &test_indices);

        let schema = FeatureSchema::fit(&train_table);
        let encoder = TargetEncoder::fit(&target_cells)?;

        let x_train = schema.transform(&train_table)?;
        let y_train = encoder.encode(&select_cells(&target_cells, &train_indices))?;

        let estimator = Estimator::fit(
            &spec.model_key,
            &x_train,
            &y_train,
            encoder.n_classes(),
            &hyperparams,
        )?;

        let x_test = schema.transform(&test_table)?;
        let y_test = encoder.encode(&select_cells(&target_cells, &test_indices))?;
        let predictions = estimator.predict(&x_test);
        let metrics = classification_metrics(&predictions, &y_test, encoder.n_classes());

        let model_id = spec
            .model_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        let artifact_path = self.models.artifact_path(&model_id);

        let record = ModelRecord {
            model_id: model_id.clone(),
            model_key: spec.model_key.clone(),
            dataset_id: spec.dataset_id.clone(),
            target_column: spec.target_column.clone(),
            features: schema.feature_names(),
            metrics: metrics.clone(),
            hyperparams: hyperparams.clone(),
            test_size: spec.test_size,
            shuffle: spec.shuffle,
            random_state: spec.random_state,
            path: artifact_path.display().to_string(),
            created_at: Utc::now(),
        };

        let artifact = ModelArtifact {
            schema,
            target: encoder,
            estimator,
        };
        self.models.save(&model_id, &artifact, record).await?;

        // Best-effort: the tracking client logs and swallows its own
        // failures.
        self.tracking
            .publish_training(TrainingRun {
                name: format!("train/{}", spec.model_key),
                model_name: format!("{}-{}", spec.model_key, short_id(&model_id)),
                artifact_path: artifact_path.display().to_string(),
                params: run_params(&spec, &hyperparams),
                metrics: metrics.clone(),
            })
            .await;

        info!(
            "model trained id={} key={} metrics={:?}",
            model_id, spec.model_key, metrics
        );

        Ok(TrainOutcome { model_id, metrics })
    }
}

fn short_id(model_id: &str) -> &str {
    &model_id[..model_id.len().min(8)]
}

fn run_params(spec: &TrainSpec, hyperparams: &HashMap<String, Value>) -> HashMap<String, Value> {
    HashMap::from([
        ("model_key".to_string(), Value::String(spec.model_key.clone())),
        ("dataset_id".to_string(), Value::String(spec.dataset_id.clone())),
        (
            "target_column".to_string(),
            Value::String(spec.target_column.clone()),
        ),
        (
            "hyperparams".to_string(),
            Value::Object(hyperparams.clone().into_iter().collect()),
        ),
        ("test_size".to_string(), serde_json::json!(spec.test_size)),
        ("shuffle".to_string(), Value::Bool(spec.shuffle)),
        ("random_state".to_string(), serde_json::json!(spec.random_state)),
    ])
}

/// Split row indices into train and test partitions.
fn split_indices(
    n_rows: usize,
    test_size: f64,
    shuffle: bool,
    random_state: u64,
) -> Result<(Vec<usize>, Vec<usize>), CoreError> {
    if !(0.0..1.0).contains(&test_size) || test_size <= 0.0 {
        return Err(CoreError::Training(format!(
            "test_size must be between 0 and 1, got {}",
            test_size
        )));
    }

    let n_test = ((n_rows as f64 * test_size).ceil() as usize).max(1);
    if n_test >= n_rows {
        return Err(CoreError::Training(format!(
            "dataset with {} rows is too small for test_size {}",
            n_rows, test_size
        )));
    }

    let mut indices: Vec<usize> = (0..n_rows).collect();
    if shuffle {
        let mut rng = StdRng::seed_from_u64(random_state);
        indices.shuffle(&mut rng);
    }

    let test = indices.split_off(n_rows - n_test);
    Ok((indices, test))
}

fn select_rows(table: &DataTable, indices: &[usize]) -> DataTable {
    let rows = indices.iter().map(|&i| table.rows[i].clone()).collect();
    DataTable::from_rows(table.columns.clone(), rows)
}

fn select_cells(cells: &[Cell], indices: &[usize]) -> Vec<Cell> {
    indices.iter().map(|&i| cells[i].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use serde_json::json;
    use tempfile::tempdir;

    fn training_csv() -> DataTable {
        let mut csv = String::from("f_num,f_cat,target\n");
        for i in 0..20 {
            if i % 2 == 0 {
                csv.push_str(&format!("{}.0,A,yes\n", i));
            } else {
                csv.push_str(&format!("{}.0,B,no\n", 100 + i));
            }
        }
        DataTable::from_csv(&csv).unwrap()
    }

    fn service(dir: &std::path::Path) -> (TrainingService, Arc<ModelStore>, Arc<DatasetStore>) {
        let datasets = Arc::new(DatasetStore::new(dir.join("datasets")).unwrap());
        let models = Arc::new(ModelStore::new(dir.join("models")).unwrap());
        let registry = Arc::new(AlgorithmRegistry::builtin());
        let tracking = Arc::new(TrackingClient::new(&Settings::default()));
        (
            TrainingService::new(datasets.clone(), models.clone(), registry, tracking),
            models,
            datasets,
        )
    }

    #[tokio::test]
    async fn test_train_registers_model() {
        let dir = tempdir().unwrap();
        let (service, models, datasets) = service(dir.path());
        datasets.save("d1", &training_csv(), None).unwrap();

        let mut spec = TrainSpec::new("d1", "target", "logistic_regression");
        spec.hyperparams = HashMap::from([("max_iterations".to_string(), json!(100))]);
        let outcome = service.train(spec).await.unwrap();

        assert!(outcome.metrics.contains_key("accuracy"));
        let record = models.get(&outcome.model_id).await.unwrap();
        assert_eq!(record.model_key, "logistic_regression");
        assert_eq!(record.dataset_id, "d1");
        assert_eq!(record.features, vec!["f_num", "f_cat"]);
        assert!(models.artifact_path(&outcome.model_id).exists());
    }

    #[tokio::test]
    async fn test_train_missing_dataset() {
        let dir = tempdir().unwrap();
        let (service, _, _) = service(dir.path());

        let result = service.train(TrainSpec::new("absent", "target", "random_forest")).await;
        assert!(matches!(result, Err(CoreError::DatasetNotFound)));
    }

    #[tokio::test]
    async fn test_train_missing_target_column() {
        let dir = tempdir().unwrap();
        let (service, _, datasets) = service(dir.path());
        datasets.save("d1", &training_csv(), None).unwrap();

        let result = service.train(TrainSpec::new("d1", "label", "random_forest")).await;
        match result {
            Err(CoreError::TargetColumnNotFound(column)) => assert_eq!(column, "label"),
            other => panic!("expected target column error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_train_unknown_model_key() {
        let dir = tempdir().unwrap();
        let (service, _, datasets) = service(dir.path());
        datasets.save("d1", &training_csv(), None).unwrap();

        let result = service.train(TrainSpec::new("d1", "target", "svm")).await;
        assert!(matches!(result, Err(CoreError::UnknownModelKey(_))));
    }

    #[tokio::test]
    async fn test_retrain_requires_existing_id() {
        let dir = tempdir().unwrap();
        let (service, _, datasets) = service(dir.path());
        datasets.save("d1", &training_csv(), None).unwrap();

        let mut spec = TrainSpec::new("d1", "target", "random_forest");
        spec.model_id = Some("missing".to_string());
        assert!(matches!(
            service.train(spec).await,
            Err(CoreError::ModelNotFound)
        ));
    }

    #[tokio::test]
    async fn test_retrain_overwrites_artifact_in_place() {
        let dir = tempdir().unwrap();
        let (service, models, datasets) = service(dir.path());
        datasets.save("d1", &training_csv(), None).unwrap();

        let mut spec = TrainSpec::new("d1", "target", "random_forest");
        spec.hyperparams = HashMap::from([("n_trees".to_string(), json!(3))]);
        let first = service.train(spec.clone()).await.unwrap();

        spec.model_id = Some(first.model_id.clone());
        spec.hyperparams = HashMap::from([("n_trees".to_string(), json!(5))]);
        let second = service.train(spec).await.unwrap();

        assert_eq!(first.model_id, second.model_id);
        let record = models.get(&second.model_id).await.unwrap();
        assert_eq!(record.hyperparams.get("n_trees"), Some(&json!(5)));
        assert_eq!(models.list().await.len(), 1);
    }

    #[test]
    fn test_split_indices_seeded_and_sized() {
        let (train_a, test_a) = split_indices(10, 0.2, true, 42).unwrap();
        let (train_b, test_b) = split_indices(10, 0.2, true, 42).unwrap();
        assert_eq!(train_a, train_b);
        assert_eq!(test_a, test_b);
        assert_eq!(test_a.len(), 2);
        assert_eq!(train_a.len(), 8);
    }

    #[test]
    fn test_split_indices_without_shuffle_takes_tail() {
        let (train, test) = split_indices(5, 0.4, false, 0).unwrap();
        assert_eq!(train, vec![0, 1, 2]);
        assert_eq!(test, vec![3, 4]);
    }

    #[test]
    fn test_split_indices_rejects_bad_test_size() {
        assert!(split_indices(10, 0.0, true, 0).is_err());
        assert!(split_indices(10, 1.0, true, 0).is_err());
        assert!(split_indices(1, 0.5, true, 0).is_err());
    }
}
