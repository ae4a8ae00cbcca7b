//! Experiment-tracking integration
//!
//! Publishes finished training runs to an experiment-tracking server over
//! its HTTP API: create a task, mark it started, report the metric
//! scalars, attach the artifact, mark it stopped. The whole publication is
//! best-effort: when the server is unreachable or unconfigured the run
//! is logged locally and the training request still succeeds.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::Settings;

/// A finished training run to publish
#[derive(Debug, Clone)]
pub struct TrainingRun {
    /// Task name, e.g. `train/logistic_regression`
    pub name: String,
    /// Registered artifact name, e.g. `logistic_regression-1a2b3c4d`
    pub model_name: String,
    /// Local artifact path
    pub artifact_path: String,
    /// Request parameters connected to the task
    pub params: HashMap<String, Value>,
    /// Metric scalars
    pub metrics: HashMap<String, f64>,
}

/// Client for the experiment-tracking server
pub struct TrackingClient {
    client: reqwest::Client,
    api_host: String,
    access_key: String,
    secret_key: String,
    project: String,
}

impl TrackingClient {
    pub fn new(settings: &Settings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            api_host: settings.tracking_api_host.trim_end_matches('/').to_string(),
            access_key: settings.tracking_access_key.clone(),
            secret_key: settings.tracking_secret_key.clone(),
            project: settings.tracking_project.clone(),
        }
    }

    pub fn enabled(&self) -> bool {
        !self.api_host.is_empty()
    }

    /// Publish a training run. Best-effort.
    pub async fn publish_training(&self, run: TrainingRun) {
        if !self.enabled() {
            debug!("experiment tracking is not configured; skipping publication");
            return;
        }

        match self.try_publish(&run).await {
            Ok(task_id) => info!(
                "tracking task published: {} / {} (id={})",
                self.project, run.name, task_id
            ),
            Err(e) => warn!("Failed to publish training run to tracking: {}", e),
        }
    }

    async fn try_publish(&self, run: &TrainingRun) -> Result<String> {
        let created = self
            .post(
                "tasks.create",
                json!({
                    "name": &run.name,
                    "project": &self.project,
                    "type": "training",
                }),
            )
            .await?;
        let task_id = created
            .pointer("/data/id")
            .and_then(Value::as_str)
            .context("tasks.create response had no task id")?
            .to_string();

        self.post(
            "tasks.edit",
            json!({
                "task": &task_id,
                "hyperparams": {"Args": &run.params},
            }),
        )
        .await?;
        self.post("tasks.started", json!({ "task": &task_id })).await?;

        let events: Vec<Value> = run
            .metrics
            .iter()
            .map(|(metric, value)| {
                json!({
                    "task": &task_id,
                    "type": "training_stats_scalar",
                    "metric": metric,
                    "variant": "value",
                    "value": value,
                    "iter": 0,
                })
            })
            .collect();
        self.post("events.add_batch", Value::Array(events)).await?;

        self.post(
            "tasks.add_or_update_artifacts",
            json!({
                "task": &task_id,
                "artifacts": [{
                    "key": &run.model_name,
                    "type": "model",
                    "uri": &run.artifact_path,
                }],
            }),
        )
        .await?;

        self.post("tasks.stopped", json!({ "task": &task_id })).await?;
        Ok(task_id)
    }

    async fn post(&self, endpoint: &str, body: Value) -> Result<Value> {
        let url = format!("{}/{}", self.api_host, endpoint);
        let mut request = self.client.post(&url).json(&body);
        if !self.access_key.is_empty() {
            request = request.basic_auth(&self.access_key, Some(&self.secret_key));
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("request to {} failed", endpoint))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("{} returned HTTP {}", endpoint, status);
        }

        response
            .json()
            .await
            .with_context(|| format!("invalid JSON from {}", endpoint))
    }
}
