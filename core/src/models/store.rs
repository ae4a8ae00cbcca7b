//! Model Store
//!
//! Bookkeeping for trained models: a JSON index of model records plus one
//! binary artifact file per model id. The index is held in memory behind
//! an async lock and persisted on every mutation, so records survive
//! restarts and saving under an existing id overwrites both the record
//! and the artifact.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::CoreError;
use crate::models::estimator::Estimator;
use crate::models::preprocess::{FeatureSchema, TargetEncoder};

const INDEX_FILE: &str = "index.json";

/// Serialized payload stored next to the index for each model
#[derive(Serialize, Deserialize)]
pub struct ModelArtifact {
    pub schema: FeatureSchema,
    pub target: TargetEncoder,
    pub estimator: Estimator,
}

/// Model registry entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRecord {
    pub model_id: String,
    pub model_key: String,
    pub dataset_id: String,
    pub target_column: String,
    /// Feature columns, in the order used at training time
    pub features: Vec<String>,
    pub metrics: HashMap<String, f64>,
    pub hyperparams: HashMap<String, Value>,
    pub test_size: f64,
    pub shuffle: bool,
    pub random_state: u64,
    /// Artifact file path
    pub path: String,
    pub created_at: DateTime<Utc>,
}

/// Filesystem-backed model registry
pub struct ModelStore {
    root: PathBuf,
    index_path: PathBuf,
    index: RwLock<HashMap<String, ModelRecord>>,
}

impl ModelStore {
    /// Open a store rooted at `root`, creating the directory and loading
    /// any existing index.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, CoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        let index_path = root.join(INDEX_FILE);
        let index = if index_path.exists() {
            let text = fs::read_to_string(&index_path)?;
            if text.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&text)?
            }
        } else {
            HashMap::new()
        };

        debug!(
            "Model store opened at {} with {} records",
            root.display(),
            index.len()
        );

        Ok(Self {
            root,
            index_path,
            index: RwLock::new(index),
        })
    }

    /// Artifact file path for an id.
    pub fn artifact_path(&self, model_id: &str) -> PathBuf {
        self.root.join(format!("{}.model", model_id))
    }

    /// Persist an artifact and its record under an id, overwriting any
    /// previous entry.
    pub async fn save(
        &self,
        model_id: &str,
        artifact: &ModelArtifact,
        record: ModelRecord,
    ) -> Result<(), CoreError> {
        let bytes =
            bincode::serialize(artifact).map_err(|e| CoreError::Artifact(e.to_string()))?;
        fs::write(self.artifact_path(model_id), bytes)?;

        let mut index = self.index.write().await;
        index.insert(model_id.to_string(), record);
        self.persist_index(&index)?;

        info!("Successfully registered model: {}", model_id);
        Ok(())
    }

    /// Load the artifact and record for an id.
    pub async fn load(&self, model_id: &str) -> Result<(ModelArtifact, ModelRecord), CoreError> {
        let record = {
            let index = self.index.read().await;
            index.get(model_id).cloned()
        }
        .ok_or(CoreError::ModelNotFound)?;

        let path = self.artifact_path(model_id);
        if !path.exists() {
            return Err(CoreError::Artifact(format!(
                "artifact file missing for model {}",
                model_id
            )));
        }
        let bytes = fs::read(&path)?;
        let artifact =
            bincode::deserialize(&bytes).map_err(|e| CoreError::Artifact(e.to_string()))?;
        Ok((artifact, record))
    }

    /// Record for an id, if present.
    pub async fn get(&self, model_id: &str) -> Option<ModelRecord> {
        let index = self.index.read().await;
        index.get(model_id).cloned()
    }

    pub async fn contains(&self, model_id: &str) -> bool {
        let index = self.index.read().await;
        index.contains_key(model_id)
    }

    /// All records in creation order.
    pub async fn list(&self) -> Vec<ModelRecord> {
        let index = self.index.read().await;
        let mut records: Vec<ModelRecord> = index.values().cloned().collect();
        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.model_id.cmp(&b.model_id))
        });
        records
    }

    /// Remove a model's record and artifact.
    pub async fn delete(&self, model_id: &str) -> Result<(), CoreError> {
        let mut existed = false;

        {
            let mut index = self.index.write().await;
            if index.remove(model_id).is_some() {
                existed = true;
                self.persist_index(&index)?;
            }
        }

        let path = self.artifact_path(model_id);
        if path.exists() {
            existed = true;
            fs::remove_file(&path)?;
        }

        if !existed {
            return Err(CoreError::ModelNotFound);
        }
        info!("model deleted id={}", model_id);
        Ok(())
    }

    /// Ids of models trained from a dataset.
    pub async fn references_dataset(&self, dataset_id: &str) -> Vec<String> {
        let index = self.index.read().await;
        let mut ids: Vec<String> = index
            .values()
            .filter(|r| r.dataset_id == dataset_id)
            .map(|r| r.model_id.clone())
            .collect();
        ids.sort();
        ids
    }

    fn persist_index(&self, index: &HashMap<String, ModelRecord>) -> Result<(), CoreError> {
        fs::write(&self.index_path, serde_json::to_string_pretty(index)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::table::DataTable;
    use ndarray::array;
    use tempfile::tempdir;

    fn sample_artifact() -> ModelArtifact {
        let table = DataTable::from_csv("a,b\n1,x\n2,y\n3,x\n4,y\n").unwrap();
        let schema = FeatureSchema::fit(&table);
        let target = TargetEncoder::fit(&table.rows.iter().map(|r| r[1].clone()).collect::<Vec<_>>())
            .unwrap();
        let features = array![[1.0, 1.0, 0.0], [2.0, 0.0, 1.0], [3.0, 1.0, 0.0], [4.0, 0.0, 1.0]];
        let targets = array![0, 1, 0, 1];
        let estimator = Estimator::fit(
            "random_forest",
            &features,
            &targets,
            2,
            &HashMap::from([("n_trees".to_string(), serde_json::json!(3))]),
        )
        .unwrap();
        ModelArtifact {
            schema,
            target,
            estimator,
        }
    }

    fn sample_record(model_id: &str, dataset_id: &str, path: &Path) -> ModelRecord {
        ModelRecord {
            model_id: model_id.to_string(),
            model_key: "random_forest".to_string(),
            dataset_id: dataset_id.to_string(),
            target_column: "b".to_string(),
            features: vec!["a".to_string()],
            metrics: HashMap::from([("accuracy".to_string(), 1.0)]),
            hyperparams: HashMap::new(),
            test_size: 0.2,
            shuffle: true,
            random_state: 42,
            path: path.display().to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_save_load_roundtrip() {
        let dir = tempdir().unwrap();
        let store = ModelStore::new(dir.path()).unwrap();

        let artifact = sample_artifact();
        let record = sample_record("m1", "d1", &store.artifact_path("m1"));
        store.save("m1", &artifact, record).await.unwrap();

        let (loaded, record) = store.load("m1").await.unwrap();
        assert_eq!(record.model_id, "m1");
        assert_eq!(loaded.target.n_classes(), 2);
        assert_eq!(loaded.schema.feature_names(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_load_missing_model() {
        let dir = tempdir().unwrap();
        let store = ModelStore::new(dir.path()).unwrap();
        assert!(matches!(
            store.load("absent").await,
            Err(CoreError::ModelNotFound)
        ));
    }

    #[tokio::test]
    async fn test_index_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = ModelStore::new(dir.path()).unwrap();
            let artifact = sample_artifact();
            let record = sample_record("m1", "d1", &store.artifact_path("m1"));
            store.save("m1", &artifact, record).await.unwrap();
        }

        let reopened = ModelStore::new(dir.path()).unwrap();
        assert!(reopened.contains("m1").await);
        let (_, record) = reopened.load("m1").await.unwrap();
        assert_eq!(record.dataset_id, "d1");
    }

    #[tokio::test]
    async fn test_list_creation_order() {
        let dir = tempdir().unwrap();
        let store = ModelStore::new(dir.path()).unwrap();
        let artifact = sample_artifact();

        let mut first = sample_record("m-b", "d1", &store.artifact_path("m-b"));
        first.created_at = Utc::now() - chrono::Duration::seconds(60);
        store.save("m-b", &artifact, first).await.unwrap();

        let second = sample_record("m-a", "d1", &store.artifact_path("m-a"));
        store.save("m-a", &artifact, second).await.unwrap();

        let listed = store.list().await;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].model_id, "m-b");
        assert_eq!(listed[1].model_id, "m-a");
    }

    #[tokio::test]
    async fn test_delete_removes_record_and_artifact() {
        let dir = tempdir().unwrap();
        let store = ModelStore::new(dir.path()).unwrap();
        let artifact = sample_artifact();
        let record = sample_record("m1", "d1", &store.artifact_path("m1"));
        store.save("m1", &artifact, record).await.unwrap();

        store.delete("m1").await.unwrap();
        assert!(!store.contains("m1").await);
        assert!(!store.artifact_path("m1").exists());
        assert!(matches!(
            store.delete("m1").await,
            Err(CoreError::ModelNotFound)
        ));
    }

    #[tokio::test]
    async fn test_references_dataset() {
        let dir = tempdir().unwrap();
        let store = ModelStore::new(dir.path()).unwrap();
        let artifact = sample_artifact();

        store
            .save("m1", &artifact, sample_record("m1", "d1", &store.artifact_path("m1")))
            .await
            .unwrap();
        store
            .save("m2", &artifact, sample_record("m2", "d2", &store.artifact_path("m2")))
            .await
            .unwrap();

        assert_eq!(store.references_dataset("d1").await, vec!["m1".to_string()]);
        assert!(store.references_dataset("d3").await.is_empty());
    }
}
