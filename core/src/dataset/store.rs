//! Dataset Store
//!
//! On-disk storage for uploaded datasets: one normalized CSV per dataset
//! id plus a JSON sidecar carrying the original upload filename and the
//! upload timestamp.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dataset::table::DataTable;
use crate::error::CoreError;

/// Dataset listing entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub id: String,
    pub filename: String,
    pub size_bytes: u64,
    pub created_at: i64,
    pub original_filename: Option<String>,
}

/// Sidecar metadata persisted next to each dataset file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DatasetMeta {
    original_filename: Option<String>,
    created_at: i64,
}

/// Filesystem-backed dataset store
#[derive(Debug)]
pub struct DatasetStore {
    root: PathBuf,
}

impl DatasetStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, CoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Path of the dataset file for an id.
    pub fn dataset_path(&self, dataset_id: &str) -> PathBuf {
        self.root.join(format!("{}.csv", dataset_id))
    }

    fn meta_path(path: &Path) -> PathBuf {
        let mut s = path.as_os_str().to_os_string();
        s.push(".meta.json");
        PathBuf::from(s)
    }

    pub fn exists(&self, dataset_id: &str) -> bool {
        self.dataset_path(dataset_id).exists()
    }

    /// Persist a parsed table under an id, with its sidecar metadata.
    pub fn save(
        &self,
        dataset_id: &str,
        table: &DataTable,
        original_filename: Option<&str>,
    ) -> Result<(), CoreError> {
        let path = self.dataset_path(dataset_id);
        fs::write(&path, table.to_csv())?;

        let meta = DatasetMeta {
            original_filename: original_filename.map(|s| s.to_string()),
            created_at: chrono::Utc::now().timestamp(),
        };
        fs::write(Self::meta_path(&path), serde_json::to_string_pretty(&meta)?)?;

        debug!("Dataset persisted: {}", path.display());
        Ok(())
    }

    /// List stored datasets, sorted by file name.
    pub fn list(&self) -> Result<Vec<DatasetInfo>, CoreError> {
        let mut paths: Vec<PathBuf> = fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().map(|e| e == "csv").unwrap_or(false))
            .collect();
        paths.sort();

        let mut items = Vec::with_capacity(paths.len());
        for path in paths {
            let id = match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) => stem.to_string(),
                None => continue,
            };
            let filename = match path.file_name().and_then(|s| s.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };
            let metadata = fs::metadata(&path)?;
            let meta = self.read_meta(&path);

            let created_at = meta
                .as_ref()
                .map(|m| m.created_at)
                .unwrap_or_else(|| file_mtime_secs(&metadata));

            items.push(DatasetInfo {
                id,
                filename,
                size_bytes: metadata.len(),
                created_at,
                original_filename: meta.and_then(|m| m.original_filename),
            });
        }
        Ok(items)
    }

    /// Remove a dataset file and its sidecar. Returns whether anything
    /// existed.
    pub fn delete(&self, dataset_id: &str) -> Result<bool, CoreError> {
        let path = self.dataset_path(dataset_id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)?;

        let meta_path = Self::meta_path(&path);
        if meta_path.exists() {
            fs::remove_file(&meta_path)?;
        }
        Ok(true)
    }

    /// Load a stored dataset as a table.
    pub fn load_table(&self, dataset_id: &str) -> Result<DataTable, CoreError> {
        let path = self.dataset_path(dataset_id);
        if !path.exists() {
            return Err(CoreError::DatasetNotFound);
        }
        let text = fs::read_to_string(&path).map_err(|e| CoreError::DatasetRead(e.to_string()))?;
        match DataTable::from_csv(&text) {
            Ok(table) => Ok(table),
            Err(CoreError::EmptyDataset) => Err(CoreError::DatasetRead("empty file".to_string())),
            Err(CoreError::DatasetParse(msg)) => Err(CoreError::DatasetRead(msg)),
            Err(other) => Err(other),
        }
    }

    fn read_meta(&self, path: &Path) -> Option<DatasetMeta> {
        let meta_path = Self::meta_path(path);
        if !meta_path.exists() {
            return None;
        }
        match fs::read_to_string(&meta_path) {
            Ok(text) => serde_json::from_str(&text).ok(),
            Err(e) => {
                warn!("Failed to read dataset sidecar {}: {}", meta_path.display(), e);
                None
            }
        }
    }
}

fn file_mtime_secs(metadata: &fs::Metadata) -> i64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_table() -> DataTable {
        DataTable::from_csv("a,b\n1,x\n2,y\n").unwrap()
    }

    #[test]
    fn test_save_list_roundtrip() {
        let dir = tempdir().unwrap();
        let store = DatasetStore::new(dir.path()).unwrap();

        store.save("abc123", &sample_table(), Some("iris.csv")).unwrap();

        let items = store.list().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "abc123");
        assert_eq!(items[0].filename, "abc123.csv");
        assert_eq!(items[0].original_filename.as_deref(), Some("iris.csv"));
        assert!(items[0].size_bytes > 0);
        assert!(items[0].created_at > 0);
    }

    #[test]
    fn test_load_table() {
        let dir = tempdir().unwrap();
        let store = DatasetStore::new(dir.path()).unwrap();
        store.save("d1", &sample_table(), None).unwrap();

        let table = store.load_table("d1").unwrap();
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.columns, vec!["a", "b"]);
    }

    #[test]
    fn test_load_missing_dataset() {
        let dir = tempdir().unwrap();
        let store = DatasetStore::new(dir.path()).unwrap();
        assert!(matches!(
            store.load_table("nope"),
            Err(CoreError::DatasetNotFound)
        ));
    }

    #[test]
    fn test_delete_removes_file_and_sidecar() {
        let dir = tempdir().unwrap();
        let store = DatasetStore::new(dir.path()).unwrap();
        store.save("d1", &sample_table(), Some("x.csv")).unwrap();

        assert!(store.delete("d1").unwrap());
        assert!(!store.exists("d1"));
        assert!(store.list().unwrap().is_empty());
        assert!(!store.delete("d1").unwrap());
    }
}
