//! REST API client
//!
//! Thin HTTP client for the Modelyard REST surface, used by the terminal
//! dashboard. Non-2xx responses are surfaced as `ApiError` values carrying
//! the status code and the server's `detail` message.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// API request failure
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Dataset entry as returned by `GET /datasets`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub id: String,
    pub filename: String,
    pub size_bytes: u64,
    pub created_at: i64,
    pub original_filename: Option<String>,
}

/// Model entry as returned by `GET /models`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSummary {
    pub model_id: String,
    pub model_key: String,
    pub dataset_id: String,
    pub target_column: String,
    pub created_at: String,
    pub metrics: Option<HashMap<String, f64>>,
}

/// Training request parameters
#[derive(Debug, Clone, Serialize)]
pub struct TrainParams {
    pub model_key: String,
    pub dataset_id: String,
    pub target_column: String,
    pub hyperparams: HashMap<String, Value>,
    pub test_size: f64,
    pub shuffle: bool,
    pub random_state: u64,
    pub model_id: Option<String>,
}

/// Thin HTTP client for the REST API
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    // System

    pub async fn health(&self) -> Result<Value, ApiError> {
        let response = self.client.get(self.url("/health")).send().await?;
        Self::parse(response).await
    }

    // Datasets

    pub async fn list_datasets(&self) -> Result<Vec<DatasetSummary>, ApiError> {
        let response = self.client.get(self.url("/datasets")).send().await?;
        Self::parse(response).await
    }

    pub async fn upload_dataset(
        &self,
        filename: &str,
        content: Vec<u8>,
    ) -> Result<Value, ApiError> {
        let part = reqwest::multipart::Part::bytes(content).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.url("/datasets"))
            .multipart(form)
            .send()
            .await?;
        Self::parse(response).await
    }

    pub async fn delete_dataset(&self, dataset_id: &str) -> Result<Value, ApiError> {
        let response = self
            .client
            .delete(self.url(&format!("/datasets/{}", dataset_id)))
            .send()
            .await?;
        Self::parse(response).await
    }

    // Models

    pub async fn list_model_classes(&self) -> Result<Vec<String>, ApiError> {
        let response = self.client.get(self.url("/models/classes")).send().await?;
        let body: Value = Self::parse(response).await?;
        Ok(body
            .get("classes")
            .and_then(Value::as_array)
            .map(|classes| {
                classes
                    .iter()
                    .filter_map(|c| c.as_str().map(|s| s.to_string()))
                    .collect()
            })
            .unwrap_or_default())
    }

    pub async fn list_models(&self) -> Result<Vec<ModelSummary>, ApiError> {
        let response = self.client.get(self.url("/models")).send().await?;
        Self::parse(response).await
    }

    pub async fn train(&self, params: &TrainParams) -> Result<Value, ApiError> {
        let response = self
            .client
            .post(self.url("/train"))
            .json(params)
            .send()
            .await?;
        Self::parse(response).await
    }

    pub async fn predict(
        &self,
        model_id: &str,
        instances: &[Value],
    ) -> Result<(Vec<Value>, Option<Vec<Vec<f64>>>), ApiError> {
        let response = self
            .client
            .post(self.url("/predict"))
            .json(&json!({ "model_id": model_id, "instances": instances }))
            .send()
            .await?;
        let body: Value = Self::parse(response).await?;

        let predictions = body
            .get("predictions")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let probabilities = body
            .get("probabilities")
            .and_then(Value::as_array)
            .map(|rows| {
                rows.iter()
                    .map(|row| {
                        row.as_array()
                            .map(|values| values.iter().filter_map(Value::as_f64).collect())
                            .unwrap_or_default()
                    })
                    .collect()
            });
        Ok((predictions, probabilities))
    }

    pub async fn delete_model(&self, model_id: &str) -> Result<Value, ApiError> {
        let response = self
            .client
            .delete(self.url(&format!("/models/{}", model_id)))
            .send()
            .await?;
        Self::parse(response).await
    }

    // Internals

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let detail = match response.json::<Value>().await {
            Ok(body) => body
                .get("detail")
                .and_then(Value::as_str)
                .map(|s| s.to_string())
                .unwrap_or_else(|| body.to_string()),
            Err(_) => status.to_string(),
        };
        Err(ApiError::Status {
            status: status.as_u16(),
            detail,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let client = ApiClient::new("http://localhost:8000/", Duration::from_secs(5));
        assert_eq!(client.url("/health"), "http://localhost:8000/health");
    }

    #[test]
    fn test_train_params_serialization() {
        let params = TrainParams {
            model_key: "logistic_regression".to_string(),
            dataset_id: "d1".to_string(),
            target_column: "target".to_string(),
            hyperparams: HashMap::new(),
            test_size: 0.2,
            shuffle: true,
            random_state: 42,
            model_id: None,
        };

        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value["model_key"], "logistic_regression");
        assert_eq!(value["test_size"], 0.2);
        assert!(value["model_id"].is_null());
    }
}
