//! Modelyard Core Module
//!
//! The core module provides the service logic behind the Modelyard API
//! surfaces: dataset storage, the algorithm registry, model training and
//! inference, artifact bookkeeping, and the best-effort external
//! integrations (dataset version control and experiment tracking).
//!
//! # Architecture
//!
//! - `config`: runtime settings loaded from TOML and environment variables
//! - `error`: typed error surface shared by the REST and RPC layers
//! - `dataset`: uploaded tabular data: parsing, on-disk store, service
//! - `models`: algorithm registry, preprocessing, estimators, model store,
//!   training and inference services
//! - `integrations`: version-control and experiment-tracking side effects

pub mod config;
pub mod dataset;
pub mod error;
pub mod integrations;
pub mod models;

pub use config::Settings;
pub use dataset::{DatasetInfo, DatasetService, DatasetStore, DatasetUpload};
pub use error::CoreError;
pub use integrations::{DvcClient, TrackingClient};
pub use models::{
    AlgorithmRegistry, InferenceService, ModelRecord, ModelStore, Prediction, TrainOutcome,
    TrainSpec, TrainingService,
};
