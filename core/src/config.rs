//! Configuration Management Module
//!
//! Runtime settings for the service: bind addresses, storage directories,
//! object-storage credentials for the version-control remote, and the
//! experiment-tracking endpoint. Settings come from defaults, an optional
//! TOML file, and environment-variable overrides, in that order.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Deployment environment name (dev, staging, prod)
    pub env: String,
    /// Log level filter for the tracing subscriber
    pub log_level: String,
    /// REST bind host
    pub http_host: String,
    /// REST bind port
    pub http_port: u16,
    /// RPC bind port
    pub grpc_port: u16,
    /// Directory for uploaded datasets
    pub datasets_dir: PathBuf,
    /// Directory for model artifacts and the model index
    pub models_dir: PathBuf,
    /// Object-storage endpoint used by the version-control remote
    pub s3_endpoint_url: String,
    /// Object-storage access key id
    pub s3_access_key_id: String,
    /// Object-storage secret access key
    pub s3_secret_access_key: String,
    /// Object-storage bucket
    pub s3_bucket: String,
    /// Version-control remote location (e.g. s3://bucket)
    pub dvc_remote: String,
    /// Experiment-tracking API host; empty disables tracking
    pub tracking_api_host: String,
    /// Experiment-tracking access key
    pub tracking_access_key: String,
    /// Experiment-tracking secret key
    pub tracking_secret_key: String,
    /// Experiment-tracking project name
    pub tracking_project: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            env: "dev".to_string(),
            log_level: "info".to_string(),
            http_host: "0.0.0.0".to_string(),
            http_port: 8000,
            grpc_port: 50051,
            datasets_dir: PathBuf::from("data/datasets"),
            models_dir: PathBuf::from("artifacts/models"),
            s3_endpoint_url: "http://minio:9000".to_string(),
            s3_access_key_id: String::new(),
            s3_secret_access_key: String::new(),
            s3_bucket: "modelyard".to_string(),
            dvc_remote: "s3://modelyard".to_string(),
            tracking_api_host: String::new(),
            tracking_access_key: String::new(),
            tracking_secret_key: String::new(),
            tracking_project: "modelyard".to_string(),
        }
    }
}

impl Settings {
    /// Load settings: defaults, then the optional TOML file, then
    /// environment-variable overrides.
    pub fn load() -> Result<Self> {
        let path = std::env::var("MODELYARD_CONFIG").unwrap_or_else(|_| "modelyard.toml".to_string());

        let mut settings = if Path::new(&path).exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };

        settings.apply_env_overrides();
        Ok(settings)
    }

    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow!("Failed to read config file {:?}: {}", path.as_ref(), e))?;

        let settings: Settings = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse TOML config: {}", e))?;

        info!("Loaded configuration from {:?}", path.as_ref());
        Ok(settings)
    }

    /// Apply environment-variable overrides.
    pub fn apply_env_overrides(&mut self) {
        override_string(&mut self.env, "ENV");
        override_string(&mut self.log_level, "LOG_LEVEL");
        override_string(&mut self.http_host, "HTTP_HOST");
        override_port(&mut self.http_port, "HTTP_PORT");
        override_port(&mut self.grpc_port, "GRPC_PORT");
        override_path(&mut self.datasets_dir, "DATASETS_DIR");
        override_path(&mut self.models_dir, "MODELS_DIR");
        override_string(&mut self.s3_endpoint_url, "S3_ENDPOINT_URL");
        override_string(&mut self.s3_access_key_id, "S3_ACCESS_KEY_ID");
        override_string(&mut self.s3_secret_access_key, "S3_SECRET_ACCESS_KEY");
        override_string(&mut self.s3_bucket, "S3_BUCKET");
        override_string(&mut self.dvc_remote, "DVC_REMOTE");
        override_string(&mut self.tracking_api_host, "TRACKING_API_HOST");
        override_string(&mut self.tracking_access_key, "TRACKING_ACCESS_KEY");
        override_string(&mut self.tracking_secret_key, "TRACKING_SECRET_KEY");
        override_string(&mut self.tracking_project, "TRACKING_PROJECT");
    }

    /// Whether the experiment-tracking integration is configured.
    pub fn tracking_enabled(&self) -> bool {
        !self.tracking_api_host.is_empty()
    }
}

fn override_string(field: &mut String, var: &str) {
    if let Ok(value) = std::env::var(var) {
        *field = value;
        debug!("Applied env override for {}", var);
    }
}

fn override_path(field: &mut PathBuf, var: &str) {
    if let Ok(value) = std::env::var(var) {
        *field = PathBuf::from(value);
        debug!("Applied env override for {}", var);
    }
}

fn override_port(field: &mut u16, var: &str) {
    if let Ok(value) = std::env::var(var) {
        if let Ok(port) = value.parse::<u16>() {
            *field = port;
            debug!("Applied env override for {}", var);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.http_port, 8000);
        assert_eq!(settings.grpc_port, 50051);
        assert_eq!(settings.datasets_dir, PathBuf::from("data/datasets"));
        assert!(!settings.tracking_enabled());
    }

    #[test]
    fn test_settings_from_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("modelyard.toml");

        let mut settings = Settings::default();
        settings.http_port = 9000;
        settings.dvc_remote = "s3://elsewhere".to_string();
        settings.tracking_api_host = "http://tracker:8008".to_string();
        fs::write(&config_path, toml::to_string_pretty(&settings).unwrap()).unwrap();

        let loaded = Settings::from_file(&config_path).unwrap();
        assert_eq!(loaded.http_port, 9000);
        assert_eq!(loaded.dvc_remote, "s3://elsewhere");
        assert!(loaded.tracking_enabled());
    }

    #[test]
    fn test_settings_from_file_rejects_garbage() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("modelyard.toml");
        fs::write(&config_path, "not = [valid").unwrap();

        assert!(Settings::from_file(&config_path).is_err());
    }
}
