//! Dataset Service
//!
//! Upload, listing and deletion of tabular datasets. Parsing failures are
//! surfaced to the caller; version-control bookkeeping is a fire-and-forget
//! side effect handled by the DVC integration.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::dataset::store::{DatasetInfo, DatasetStore};
use crate::dataset::table::DataTable;
use crate::error::CoreError;
use crate::integrations::DvcClient;
use crate::models::ModelStore;

/// Upload result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetUpload {
    pub dataset_id: String,
    pub rows: usize,
    pub cols: usize,
    pub original_filename: Option<String>,
}

/// Dataset operations over the store, with version-control hooks
pub struct DatasetService {
    store: Arc<DatasetStore>,
    models: Arc<ModelStore>,
    dvc: Arc<DvcClient>,
}

impl DatasetService {
    pub fn new(store: Arc<DatasetStore>, models: Arc<ModelStore>, dvc: Arc<DvcClient>) -> Self {
        Self { store, models, dvc }
    }

    /// Parse an uploaded CSV/JSON payload, persist it, and track it in
    /// version control.
    pub async fn upload(
        &self,
        file_bytes: &[u8],
        filename: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<DatasetUpload, CoreError> {
        let text = std::str::from_utf8(file_bytes)
            .map_err(|e| CoreError::DatasetParse(e.to_string()))?;

        let is_json = content_type.map(|c| c.contains("json")).unwrap_or(false)
            || filename
                .map(|f| f.to_lowercase().ends_with(".json"))
                .unwrap_or(false);

        let table = if is_json {
            DataTable::from_json(text)?
        } else {
            DataTable::from_csv(text)?
        };

        if table.is_empty() {
            return Err(CoreError::EmptyDataset);
        }

        let dataset_id = Uuid::new_v4().simple().to_string();
        self.store.save(&dataset_id, &table, filename)?;

        // Best-effort: failures are logged inside the client.
        self.dvc.add_and_push(&self.store.dataset_path(&dataset_id)).await;

        info!(
            "dataset uploaded id={} rows={} cols={}",
            dataset_id,
            table.n_rows(),
            table.n_cols()
        );

        Ok(DatasetUpload {
            dataset_id,
            rows: table.n_rows(),
            cols: table.n_cols(),
            original_filename: filename.map(|s| s.to_string()),
        })
    }

    pub fn list(&self) -> Result<Vec<DatasetInfo>, CoreError> {
        self.store.list()
    }

    /// Delete a dataset. Deletion is blocked while trained models still
    /// reference the dataset id.
    pub async fn delete(&self, dataset_id: &str) -> Result<(), CoreError> {
        let referencing = self.models.references_dataset(dataset_id).await;
        if !referencing.is_empty() {
            return Err(CoreError::DatasetInUse {
                model_ids: referencing,
            });
        }

        if !self.store.exists(dataset_id) {
            return Err(CoreError::DatasetNotFound);
        }

        self.dvc.remove(&self.store.dataset_path(dataset_id)).await;

        if !self.store.delete(dataset_id)? {
            return Err(CoreError::DatasetNotFound);
        }
        info!("dataset deleted id={}", dataset_id);
        Ok(())
    }

    pub fn load_table(&self, dataset_id: &str) -> Result<DataTable, CoreError> {
        self.store.load_table(dataset_id)
    }
}
