//! gRPC Server Module
//!
//! Implements the generated service trait on top of the core services and
//! maps core errors onto gRPC status codes.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;
use tonic::{Request, Response, Status};
use tracing::info;

use modelyard_core::models::{InferenceService, ModelStore, TrainSpec, TrainingService};
use modelyard_core::CoreError;

use crate::proto::modelyard_server::{Modelyard, ModelyardServer};
use crate::proto::{
    DeleteModelReply, DeleteModelRequest, DoubleList, HealthReply, HealthRequest,
    ListModelsReply, ListModelsRequest, ModelInfo, PredictReply, PredictRequest, TrainReply,
    TrainRequest,
};

/// gRPC service over the core training/inference/model-store services
pub struct ModelyardService {
    training: Arc<TrainingService>,
    inference: Arc<InferenceService>,
    models: Arc<ModelStore>,
}

impl ModelyardService {
    pub fn new(
        training: Arc<TrainingService>,
        inference: Arc<InferenceService>,
        models: Arc<ModelStore>,
    ) -> Self {
        Self {
            training,
            inference,
            models,
        }
    }

    /// Wrap the service in the generated tonic server type.
    pub fn into_server(self) -> ModelyardServer<Self> {
        ModelyardServer::new(self)
    }

    /// Serve on the given address until shutdown.
    pub async fn serve(self, addr: SocketAddr) -> Result<()> {
        info!("gRPC server listening on {}", addr);
        tonic::transport::Server::builder()
            .add_service(self.into_server())
            .serve(addr)
            .await?;
        Ok(())
    }
}

/// gRPC status for a core error.
fn status_for(err: &CoreError) -> Status {
    if err.is_not_found() {
        Status::not_found(err.to_string())
    } else if matches!(err, CoreError::DatasetInUse { .. }) {
        Status::failed_precondition(err.to_string())
    } else if err.is_invalid_input() {
        Status::invalid_argument(err.to_string())
    } else {
        Status::internal(err.to_string())
    }
}

/// Wire form of a prediction label: strings stay bare, everything else
/// uses its JSON rendition.
fn prediction_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[tonic::async_trait]
impl Modelyard for ModelyardService {
    async fn health(
        &self,
        _request: Request<HealthRequest>,
    ) -> Result<Response<HealthReply>, Status> {
        info!("health");
        Ok(Response::new(HealthReply {
            status: "ok".to_string(),
        }))
    }

    async fn train(
        &self,
        request: Request<TrainRequest>,
    ) -> Result<Response<TrainReply>, Status> {
        let req = request.into_inner();

        let hyperparams: HashMap<String, Value> = if req.hyperparams_json.is_empty() {
            HashMap::new()
        } else {
            serde_json::from_str(&req.hyperparams_json)
                .map_err(|e| Status::invalid_argument(format!("Invalid hyperparams_json: {}", e)))?
        };

        let spec = TrainSpec {
            dataset_id: req.dataset_id,
            target_column: req.target_column,
            model_key: req.model_key.clone(),
            hyperparams,
            test_size: if req.test_size > 0.0 { req.test_size } else { 0.2 },
            shuffle: req.shuffle,
            random_state: if req.random_state != 0 { req.random_state } else { 42 },
            model_id: if req.model_id.is_empty() {
                None
            } else {
                Some(req.model_id)
            },
        };

        let outcome = self.training.train(spec).await.map_err(|e| status_for(&e))?;

        Ok(Response::new(TrainReply {
            model_id: outcome.model_id,
            model_key: req.model_key,
            metrics: outcome.metrics,
        }))
    }

    async fn predict(
        &self,
        request: Request<PredictRequest>,
    ) -> Result<Response<PredictReply>, Status> {
        let req = request.into_inner();

        let instances: Vec<Value> = if req.instances_json.is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&req.instances_json)
                .map_err(|e| Status::invalid_argument(format!("Invalid instances_json: {}", e)))?
        };

        let result = self
            .inference
            .predict(&req.model_id, &instances)
            .await
            .map_err(|e| status_for(&e))?;

        let predictions = result.predictions.iter().map(prediction_to_string).collect();
        let probabilities = result
            .probabilities
            .unwrap_or_default()
            .into_iter()
            .map(|values| DoubleList { values })
            .collect();

        Ok(Response::new(PredictReply {
            predictions,
            probabilities,
        }))
    }

    async fn list_models(
        &self,
        _request: Request<ListModelsRequest>,
    ) -> Result<Response<ListModelsReply>, Status> {
        let items = self
            .models
            .list()
            .await
            .into_iter()
            .map(|record| ModelInfo {
                model_id: record.model_id,
                model_key: record.model_key,
                dataset_id: record.dataset_id,
                target_column: record.target_column,
                created_at: record.created_at.to_rfc3339(),
            })
            .collect();

        Ok(Response::new(ListModelsReply { items }))
    }

    async fn delete_model(
        &self,
        request: Request<DeleteModelRequest>,
    ) -> Result<Response<DeleteModelReply>, Status> {
        let req = request.into_inner();
        self.models
            .delete(&req.model_id)
            .await
            .map_err(|e| status_for(&e))?;

        Ok(Response::new(DeleteModelReply { deleted: true }))
    }
}
