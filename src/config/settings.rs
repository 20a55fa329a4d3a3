// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::models::task::TaskType;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

/// 应用程序配置设置
///
/// 包含服务器、数据库、工作池、锁监控、指标与提供方等所有配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 服务器配置
    pub server: ServerSettings,
    /// 数据库配置
    pub database: DatabaseSettings,
    /// 执行器与锁监控的时间参数
    pub workers: WorkerSettings,
    /// 各类型工作池的并发数
    pub pools: PoolSettings,
    /// 指标配置
    pub metrics: MetricsSettings,
    /// 日志配置
    pub telemetry: TelemetrySettings,
    /// 提供方配置
    pub providers: ProviderSettings,
}

/// 服务器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// 服务器监听主机地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
}

/// 数据库配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// 数据库连接URL
    pub url: String,
    /// 最大连接数
    pub max_connections: Option<u32>,
    /// 最小连接数
    pub min_connections: Option<u32>,
    /// 连接超时时间（秒）
    pub connect_timeout: Option<u64>,
    /// 空闲连接超时时间（秒）
    pub idle_timeout: Option<u64>,
}

/// 执行器与锁监控配置
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerSettings {
    /// 空闲执行器的轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 心跳刷新间隔（秒）
    pub heartbeat_interval_secs: u64,
    /// 心跳超时阈值（秒）
    pub lock_timeout_secs: u64,
    /// 锁监控扫描间隔（秒）
    pub monitor_interval_secs: u64,
    /// 执行器存活检查间隔（秒）
    pub supervise_interval_secs: u64,
}

impl WorkerSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs)
    }

    pub fn supervise_interval(&self) -> Duration {
        Duration::from_secs(self.supervise_interval_secs)
    }
}

/// 单个工作池配置
#[derive(Debug, Clone, Deserialize)]
pub struct PoolEntry {
    /// 执行器数量，为 0 时不启动该工作池
    pub concurrency: usize,
}

/// 工作池配置
#[derive(Debug, Clone, Deserialize)]
pub struct PoolSettings {
    pub image: PoolEntry,
    pub video: PoolEntry,
    pub audio: PoolEntry,
}

impl PoolSettings {
    pub fn concurrency(&self, task_type: TaskType) -> usize {
        match task_type {
            TaskType::Image => self.image.concurrency,
            TaskType::Video => self.video.concurrency,
            TaskType::Audio => self.audio.concurrency,
        }
    }
}

/// 指标配置
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    /// 是否启动 Prometheus 导出
    pub enabled: bool,
    /// 导出端点监听地址
    pub listen: String,
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    /// 是否输出 JSON 格式日志
    pub json: bool,
}

/// 提供方配置
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    /// 提供方配置文件路径（不含扩展名），每次调用时重新读取
    pub config_path: String,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次叠加默认值、`config/default`、`config/{APP_ENVIRONMENT}`
    /// 与 `GENTASK__*` 环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败或取值不合法
    pub fn new() -> Result<Self, ConfigError> {
        Self::load("config", "GENTASK")
    }

    /// 从指定目录与环境变量前缀加载配置
    pub fn load(config_dir: &str, env_prefix: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Config::builder()
            // Start with default settings
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            // Default DB settings
            .set_default("database.url", "sqlite://gentask.db?mode=rwc")?
            .set_default("database.connect_timeout", 10)?
            .set_default("database.idle_timeout", 300)?
            // Default executor timings
            .set_default("workers.poll_interval_ms", 500)?
            .set_default("workers.heartbeat_interval_secs", 5)?
            .set_default("workers.lock_timeout_secs", 30)?
            .set_default("workers.monitor_interval_secs", 10)?
            .set_default("workers.supervise_interval_secs", 15)?
            // Default pool sizes
            .set_default("pools.image.concurrency", 2)?
            .set_default("pools.video.concurrency", 1)?
            .set_default("pools.audio.concurrency", 2)?
            // Default metrics / telemetry
            .set_default("metrics.enabled", false)?
            .set_default("metrics.listen", "0.0.0.0:9000")?
            .set_default("telemetry.json", false)?
            .set_default("providers.config_path", format!("{}/providers", config_dir))?
            .add_source(File::with_name(&format!("{}/default", config_dir)).required(false))
            .add_source(File::with_name(&format!("{}/{}", config_dir, env)).required(false))
            .add_source(Environment::with_prefix(env_prefix).separator("__"));

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// 校验配置之间的约束
    pub fn validate(&self) -> Result<(), ConfigError> {
        let workers = &self.workers;
        if workers.heartbeat_interval_secs == 0 {
            return Err(ConfigError::Message(
                "workers.heartbeat_interval_secs must be greater than 0".to_string(),
            ));
        }
        if workers.lock_timeout_secs <= workers.heartbeat_interval_secs {
            return Err(ConfigError::Message(format!(
                "workers.lock_timeout_secs ({}) must be greater than workers.heartbeat_interval_secs ({})",
                workers.lock_timeout_secs, workers.heartbeat_interval_secs
            )));
        }
        if workers.poll_interval_ms == 0
            || workers.monitor_interval_secs == 0
            || workers.supervise_interval_secs == 0
        {
            return Err(ConfigError::Message(
                "worker intervals must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
