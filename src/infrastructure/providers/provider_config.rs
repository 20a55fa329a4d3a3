// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::TaskType;
use crate::domain::services::generation_provider::{
    ProviderConfig, ProviderConfigSource, ProviderError,
};
use config::{Config, ConfigError, Environment, File};
use parking_lot::RwLock;
use std::collections::HashMap;

/// 分层配置来源
///
/// 每次调用都重新读取 `{path}.toml` 与 `{env_prefix}__<TYPE>__<FIELD>`
/// 环境变量，修改凭据后下一个被认领的任务即可生效，无需重启工作池。
#[derive(Debug, Clone)]
pub struct LayeredProviderConfigSource {
    path: String,
    env_prefix: String,
}

impl LayeredProviderConfigSource {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            env_prefix: "GENTASK_PROVIDERS".to_string(),
        }
    }

    pub fn with_env_prefix(mut self, env_prefix: impl Into<String>) -> Self {
        self.env_prefix = env_prefix.into();
        self
    }
}

impl ProviderConfigSource for LayeredProviderConfigSource {
    fn provider_config(&self, task_type: TaskType) -> Result<ProviderConfig, ProviderError> {
        let config = Config::builder()
            .add_source(File::with_name(&self.path).required(false))
            .add_source(Environment::with_prefix(&self.env_prefix).separator("__"))
            .build()
            .map_err(|e| ProviderError::InvalidConfig(e.to_string()))?;

        match config.get::<ProviderConfig>(task_type.as_str()) {
            Ok(provider) if provider.url.trim().is_empty() => {
                Err(ProviderError::NotConfigured(task_type))
            }
            Ok(provider) => Ok(provider),
            Err(ConfigError::NotFound(_)) => Err(ProviderError::NotConfigured(task_type)),
            Err(e) => Err(ProviderError::InvalidConfig(e.to_string())),
        }
    }
}

/// 内存配置来源
///
/// 可在运行时整体替换某个类型的配置，用于嵌入式场景与测试。
#[derive(Debug, Default)]
pub struct StaticProviderConfigSource {
    configs: RwLock<HashMap<TaskType, ProviderConfig>>,
}

impl StaticProviderConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, task_type: TaskType, config: ProviderConfig) -> Self {
        self.set(task_type, config);
        self
    }

    pub fn set(&self, task_type: TaskType, config: ProviderConfig) {
        self.configs.write().insert(task_type, config);
    }

    pub fn remove(&self, task_type: TaskType) {
        self.configs.write().remove(&task_type);
    }
}

impl ProviderConfigSource for StaticProviderConfigSource {
    fn provider_config(&self, task_type: TaskType) -> Result<ProviderConfig, ProviderError> {
        self.configs
            .read()
            .get(&task_type)
            .cloned()
            .ok_or(ProviderError::NotConfigured(task_type))
    }
}
