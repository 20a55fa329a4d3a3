// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::{Task, TaskType};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 生成提供方错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// 该类型没有可用的提供方配置
    #[error("No provider configured for {0} tasks")]
    NotConfigured(TaskType),
    /// 配置无效
    #[error("Invalid provider configuration: {0}")]
    InvalidConfig(String),
    /// 请求未能完成（网络、超时等）
    #[error("Provider request failed: {0}")]
    Request(String),
    /// 提供方返回了错误
    #[error("Provider rejected task: {0}")]
    Rejected(String),
    /// 响应无法解析
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

/// 提供方配置
///
/// 执行器在每次调用前读取，不在启动时缓存，因此凭据更新对下一个任务生效。
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

// 不在日志中输出密钥
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[SET]"))
            .field("model", &self.model)
            .finish()
    }
}

/// 生成结果
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GenerationOutput {
    pub result_url: Option<String>,
    pub result_local_path: Option<String>,
}

/// 外部生成提供方
///
/// 可能很慢、可能失败的远程调用。执行器把它放在独立的 tokio 任务中运行，
/// 超时时直接中止该任务。
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    async fn generate(
        &self,
        task: &Task,
        config: &ProviderConfig,
    ) -> Result<GenerationOutput, ProviderError>;
}

/// 提供方配置来源
pub trait ProviderConfigSource: Send + Sync {
    fn provider_config(&self, task_type: TaskType) -> Result<ProviderConfig, ProviderError>;
}
