// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::{PoolSettings, WorkerSettings};
use crate::domain::models::task::TaskType;
use crate::domain::repositories::task_repository::TaskRepository;
use crate::domain::services::generation_provider::{GenerationProvider, ProviderConfigSource};
use crate::queue::task_queue::{StoreTaskQueue, TaskQueue};
use crate::workers::executor::{ExecutionContext, ExecutorTimings};
use crate::workers::lock_monitor::LockMonitor;
use crate::workers::pool::WorkerPool;
use crate::workers::registry::ExecutorRegistry;
use crate::workers::Worker;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// 工作管理器
///
/// 持有所有工作池、锁监控与执行器巡检，负责统一启动与关闭。
pub struct WorkerManager {
    pools: Vec<Arc<WorkerPool>>,
    monitor: Arc<LockMonitor>,
    registry: ExecutorRegistry,
    supervise_interval: Duration,
    shutdown: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerManager {
    /// 根据配置创建工作管理器
    ///
    /// 并发数为 0 的类型不创建工作池。
    ///
    /// # 参数
    ///
    /// * `repository` - 任务仓库
    /// * `provider` - 生成提供方
    /// * `provider_config` - 提供方配置来源
    /// * `workers` - 执行器与锁监控时间参数
    /// * `pools` - 各类型并发数
    pub fn new(
        repository: Arc<dyn TaskRepository>,
        provider: Arc<dyn GenerationProvider>,
        provider_config: Arc<dyn ProviderConfigSource>,
        workers: &WorkerSettings,
        pools: &PoolSettings,
    ) -> Self {
        let shutdown = CancellationToken::new();
        let registry = ExecutorRegistry::new();
        let queue: Arc<dyn TaskQueue> = Arc::new(StoreTaskQueue::new(repository.clone()));
        let context = ExecutionContext {
            queue,
            provider,
            provider_config,
        };
        let timings = ExecutorTimings {
            poll_interval: workers.poll_interval(),
            heartbeat_interval: workers.heartbeat_interval(),
            lock_timeout: workers.lock_timeout(),
        };

        let pools = TaskType::ALL
            .iter()
            .filter(|task_type| pools.concurrency(**task_type) > 0)
            .map(|task_type| {
                Arc::new(WorkerPool::new(
                    *task_type,
                    pools.concurrency(*task_type),
                    context.clone(),
                    timings,
                    registry.clone(),
                    shutdown.child_token(),
                ))
            })
            .collect();

        let monitor = Arc::new(LockMonitor::new(
            repository,
            workers.lock_timeout(),
            workers.monitor_interval(),
            shutdown.child_token(),
        ));

        Self {
            pools,
            monitor,
            registry,
            supervise_interval: workers.supervise_interval(),
            shutdown,
            handles: Vec::new(),
        }
    }

    /// 执行器注册表，供状态查询使用
    pub fn registry(&self) -> ExecutorRegistry {
        self.registry.clone()
    }

    pub fn pools(&self) -> &[Arc<WorkerPool>] {
        &self.pools
    }

    /// 关闭信号，触发后 HTTP 服务也应退出
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// 启动所有工作池、锁监控与执行器巡检
    pub fn start(&mut self) {
        for pool in &self.pools {
            pool.start();
        }

        let monitor = self.monitor.clone();
        self.handles.push(tokio::spawn(async move {
            if let Err(e) = monitor.run().await {
                error!("Lock monitor exited with error: {}", e);
            }
        }));

        let pools = self.pools.clone();
        let shutdown = self.shutdown.clone();
        let period = self.supervise_interval;
        self.handles.push(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        for pool in &pools {
                            pool.supervise();
                        }
                    }
                }
            }
        }));

        info!("Worker manager started {} pools", self.pools.len());
    }

    /// 停止所有后台任务并等待退出
    pub async fn shutdown(&mut self) {
        info!("Shutting down workers...");
        self.shutdown.cancel();

        for pool in &self.pools {
            pool.shutdown().await;
        }
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                error!("Background worker terminated abnormally: {}", e);
            }
        }

        info!("Workers shut down successfully");
    }

    /// 等待关闭信号并关闭工作进程
    ///
    /// 监听 Ctrl-C 或关闭令牌，随后优雅地关闭所有工作进程
    pub async fn wait_for_shutdown(&mut self) {
        tokio::select! {
            result = signal::ctrl_c() => match result {
                Ok(()) => info!("Shutdown signal received"),
                Err(err) => error!("Unable to listen for shutdown signal: {}", err),
            },
            _ = self.shutdown.cancelled() => {}
        }

        self.shutdown().await;
    }
}
