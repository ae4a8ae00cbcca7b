//! API Server Module
//!
//! This module contains the server setup functionality for the REST
//! surface.

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use modelyard_core::dataset::DatasetService;
use modelyard_core::models::{AlgorithmRegistry, InferenceService, ModelStore, TrainingService};

use crate::handlers::{
    delete_dataset, delete_model, health_check, list_datasets, list_models, model_classes,
    predict, train, upload_dataset, ApiState,
};
use crate::models::ApiConfig;

/// Uploads above this size are rejected by the extractor.
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Main API server
pub struct ApiServer {
    /// Server configuration
    config: ApiConfig,
    /// Shared state
    state: Arc<ApiState>,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(
        config: ApiConfig,
        datasets: Arc<DatasetService>,
        training: Arc<TrainingService>,
        inference: Arc<InferenceService>,
        models: Arc<ModelStore>,
        registry: Arc<AlgorithmRegistry>,
    ) -> Self {
        let state = Arc::new(ApiState {
            datasets,
            training,
            inference,
            models,
            registry,
        });

        Self { config, state }
    }

    /// Router over the shared state.
    pub fn router(&self) -> Router {
        Router::new()
            // System
            .route("/health", get(health_check))
            // Datasets
            .route("/datasets", get(list_datasets).post(upload_dataset))
            .route("/datasets/:dataset_id", delete(delete_dataset))
            // Models
            .route("/models/classes", get(model_classes))
            .route("/models", get(list_models))
            .route("/models/:model_id", delete(delete_model))
            // Training and inference
            .route("/train", post(train))
            .route("/predict", post(predict))
            .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Start the API server
    pub async fn start(&self) -> Result<()> {
        info!(
            "Starting Modelyard API server on {}:{}",
            self.config.host, self.config.port
        );

        let app = self.router();

        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid bind address: {}", e))?;
        info!("Modelyard API server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to start API server: {}", e))?;

        Ok(())
    }
}
