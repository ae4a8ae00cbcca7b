//! API Handlers Module
//!
//! This module contains the request handlers for the REST surface.

use axum::{
    debug_handler,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use modelyard_core::dataset::store::DatasetInfo;
use modelyard_core::dataset::DatasetService;
use modelyard_core::models::{
    AlgorithmRegistry, InferenceService, ModelStore, TrainSpec, TrainingService,
};
use modelyard_core::CoreError;

use crate::models::{
    ErrorBody, ModelClassesResponse, ModelInfo, PredictRequest, PredictResponse, TrainRequest,
    TrainResponse,
};

/// Represents the state of the API server
pub struct ApiState {
    /// Dataset upload/list/delete operations
    pub datasets: Arc<DatasetService>,
    /// Model training
    pub training: Arc<TrainingService>,
    /// Model inference
    pub inference: Arc<InferenceService>,
    /// Model records and artifacts
    pub models: Arc<ModelStore>,
    /// Supported algorithms
    pub registry: Arc<AlgorithmRegistry>,
}

/// Core error wrapped for HTTP responses
pub struct ApiError(CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("request failed: {}", self.0);
        }
        (
            status,
            Json(ErrorBody {
                detail: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// HTTP status for a core error.
pub fn status_for(err: &CoreError) -> StatusCode {
    if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else if matches!(err, CoreError::DatasetInUse { .. }) {
        StatusCode::CONFLICT
    } else if err.is_invalid_input() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// Health check endpoint
#[debug_handler]
pub async fn health_check() -> Json<HashMap<String, String>> {
    tracing::info!("health");
    let mut response = HashMap::new();
    response.insert("status".to_string(), "ok".to_string());
    response.insert("service".to_string(), "modelyard-api".to_string());
    Json(response)
}

/// List the trainable algorithm keys
#[debug_handler]
pub async fn model_classes(
    State(state): State<Arc<ApiState>>,
) -> Json<ModelClassesResponse> {
    Json(ModelClassesResponse {
        classes: state.registry.list_keys(),
    })
}

/// List uploaded datasets
#[debug_handler]
pub async fn list_datasets(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<Vec<DatasetInfo>>, ApiError> {
    Ok(Json(state.datasets.list()?))
}

/// Upload a dataset (multipart field `file`)
#[debug_handler]
pub async fn upload_dataset(
    State(state): State<Arc<ApiState>>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| CoreError::DatasetParse(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().map(|s| s.to_string());
        let content_type = field.content_type().map(|s| s.to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| CoreError::DatasetParse(e.to_string()))?;

        let result = state
            .datasets
            .upload(&bytes, filename.as_deref(), content_type.as_deref())
            .await?;
        return Ok(Json(serde_json::to_value(result).map_err(CoreError::from)?));
    }

    Err(CoreError::DatasetParse("missing 'file' form field".to_string()).into())
}

/// Delete a dataset
#[debug_handler]
pub async fn delete_dataset(
    State(state): State<Arc<ApiState>>,
    Path(dataset_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.datasets.delete(&dataset_id).await?;
    Ok(Json(json!({ "status": "deleted", "dataset_id": dataset_id })))
}

/// Train a model
#[debug_handler]
pub async fn train(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<TrainRequest>,
) -> Result<Json<TrainResponse>, ApiError> {
    let spec = TrainSpec {
        dataset_id: request.dataset_id,
        target_column: request.target_column,
        model_key: request.model_key.clone(),
        hyperparams: request.hyperparams.unwrap_or_default(),
        test_size: request.test_size,
        shuffle: request.shuffle,
        random_state: request.random_state,
        model_id: request.model_id,
    };

    let outcome = state.training.train(spec).await?;
    tracing::info!(
        "model trained id={} key={} metrics={:?}",
        outcome.model_id,
        request.model_key,
        outcome.metrics
    );

    Ok(Json(TrainResponse {
        model_id: outcome.model_id,
        model_key: request.model_key,
        metrics: outcome.metrics,
    }))
}

/// List trained models
#[debug_handler]
pub async fn list_models(
    State(state): State<Arc<ApiState>>,
) -> Json<Vec<ModelInfo>> {
    let records = state.models.list().await;
    Json(records.into_iter().map(ModelInfo::from).collect())
}

/// Run inference with a trained model
#[debug_handler]
pub async fn predict(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<PredictResponse>, ApiError> {
    let result = state
        .inference
        .predict(&request.model_id, &request.instances)
        .await?;

    Ok(Json(PredictResponse {
        predictions: result.predictions,
        probabilities: result.probabilities,
    }))
}

/// Delete a trained model
#[debug_handler]
pub async fn delete_model(
    State(state): State<Arc<ApiState>>,
    Path(model_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.models.delete(&model_id).await?;
    Ok(Json(json!({ "status": "deleted", "model_id": model_id })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&CoreError::ModelNotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&CoreError::DatasetNotFound),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&CoreError::EmptyDataset),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_for(&CoreError::NoInstances), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(&CoreError::SchemaMismatch {
                columns: vec!["f_cat".to_string()]
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&CoreError::DatasetInUse {
                model_ids: vec!["m1".to_string()]
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&CoreError::Artifact("corrupt".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
