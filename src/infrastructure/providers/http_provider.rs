// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::{Task, TaskParams, TaskType};
use crate::domain::services::generation_provider::{
    GenerationOutput, GenerationProvider, ProviderConfig, ProviderError,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;
use uuid::Uuid;

/// 发送给提供方的请求体
#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    model: Option<&'a str>,
    task_id: Uuid,
    task_type: TaskType,
    params: &'a TaskParams,
}

/// 提供方响应体
#[derive(Debug, Default, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    result_url: Option<String>,
    #[serde(default)]
    result_local_path: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP 生成提供方
///
/// 以 JSON 形式把任务参数投递到 `config.url`。整体耗时由执行器的
/// `timeout_seconds` 约束，客户端只设置连接超时。
pub struct HttpGenerationProvider {
    /// HTTP 客户端
    client: reqwest::Client,
}

impl HttpGenerationProvider {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("gentask/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self { client }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpGenerationProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationProvider for HttpGenerationProvider {
    async fn generate(
        &self,
        task: &Task,
        config: &ProviderConfig,
    ) -> Result<GenerationOutput, ProviderError> {
        let endpoint = Url::parse(&config.url)
            .map_err(|e| ProviderError::InvalidConfig(format!("{}: {}", config.url, e)))?;

        let body = GenerationRequest {
            model: config.model.as_deref(),
            task_id: task.id,
            task_type: task.task_type,
            params: &task.params,
        };

        let mut request = self.client.post(endpoint).json(&body);
        if let Some(api_key) = &config.api_key {
            request = request.bearer_auth(api_key);
        }

        debug!(
            "Dispatching {} task {} to provider {}",
            task.task_type,
            task.id,
            task.params.provider()
        );

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Rejected(format!(
                "HTTP {}: {}",
                status,
                text.trim()
            )));
        }

        let payload: GenerationResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        if let Some(error) = payload.error {
            return Err(ProviderError::Rejected(error));
        }
        if payload.result_url.is_none() && payload.result_local_path.is_none() {
            return Err(ProviderError::InvalidResponse(
                "response carries neither result_url nor result_local_path".to_string(),
            ));
        }

        Ok(GenerationOutput {
            result_url: payload.result_url,
            result_local_path: payload.result_local_path,
        })
    }
}

#[cfg(test)]
#[path = "http_provider_test.rs"]
mod tests;
