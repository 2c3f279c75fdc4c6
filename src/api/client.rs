//! HTTP client for the task API

use super::error::{ApiError, ApiResult};
use super::models::{DeleteResponse, NewTask, Task, TaskUpdate};
use super::traits::TaskApi;
use crate::filters::TaskFilters;
use crate::ApiConfig;
use async_trait::async_trait;
use reqwest::{header, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// reqwest-backed implementation of [`TaskApi`].
///
/// Cheaply cloneable (shares the reqwest client internally).
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    /// Base URL joined with the base path, without trailing slash
    base: String,
    token: Option<String>,
}

impl ApiClient {
    /// Build a client from the API section of the configuration.
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        let base_url = url::Url::parse(&config.base_url)
            .map_err(|_| ApiError::InvalidUrl(config.base_url.clone()))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl(config.base_url.clone()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base: join_base(&config.base_url, &config.base_path),
            token: config.token.clone().filter(|t| !t.is_empty()),
        })
    }

    /// Full URL for an endpoint relative to the base path
    pub fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base, endpoint)
    }

    /// Send a request and decode the JSON response.
    ///
    /// Non-2xx statuses become [`ApiError::Status`] carrying the body text.
    /// A 204 never reads the body: the result is decoded from `{}` instead.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> ApiResult<T> {
        let url = self.url(endpoint);
        let mut req = self
            .client
            .request(method.clone(), url.as_str())
            .header(header::CONTENT_TYPE, "application/json");

        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }
        if let Some(ref body) = body {
            req = req.json(body);
        }

        let response = req.send().await?;
        let status = response.status();
        debug!(method = %method, url = %url, status = status.as_u16(), "API request");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(serde_json::from_value(Value::Object(Default::default()))?);
        }

        // Decoded by hand so malformed JSON is ApiError::Decode, not Transport
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Join base URL and base path, normalising the slashes between them
fn join_base(base_url: &str, base_path: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    let base_path = base_path.trim_matches('/');
    if base_path.is_empty() {
        base_url.to_string()
    } else {
        format!("{}/{}", base_url, base_path)
    }
}

#[async_trait]
impl TaskApi for ApiClient {
    async fn get_tasks(&self, filters: &TaskFilters) -> ApiResult<Vec<Task>> {
        let query = filters.to_query_params();
        self.request(Method::GET, &format!("/tasks/{}", query), None)
            .await
    }

    async fn get_task(&self, task_id: i64) -> ApiResult<Task> {
        self.request(Method::GET, &format!("/tasks/{}", task_id), None)
            .await
    }

    async fn create_task(&self, task: &NewTask) -> ApiResult<Task> {
        let body = serde_json::to_value(task)?;
        self.request(Method::POST, "/tasks/", Some(body)).await
    }

    async fn complete_task(&self, task_id: i64) -> ApiResult<Task> {
        self.request(Method::PATCH, &format!("/tasks/{}/done", task_id), None)
            .await
    }

    async fn uncomplete_task(&self, task_id: i64) -> ApiResult<Task> {
        self.request(Method::PATCH, &format!("/tasks/{}/undone", task_id), None)
            .await
    }

    async fn update_task(&self, task_id: i64, updates: &TaskUpdate) -> ApiResult<Task> {
        let body = serde_json::to_value(updates)?;
        self.request(Method::PATCH, &format!("/tasks/{}", task_id), Some(body))
            .await
    }

    async fn delete_task(&self, task_id: i64) -> ApiResult<DeleteResponse> {
        self.request(Method::DELETE, &format!("/tasks/{}", task_id), None)
            .await
    }
}
