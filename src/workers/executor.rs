// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::Task;
use crate::domain::services::generation_provider::{
    GenerationOutput, GenerationProvider, ProviderConfigSource,
};
use crate::infrastructure::metrics;
use crate::queue::task_queue::TaskQueue;
use crate::utils::errors::WorkerError;
use crate::workers::registry::{AliveGuard, ExecutorState};
use crate::workers::Worker;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, sleep, sleep_until, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// 提供方调用 panic 时写入任务的错误信息
pub const PROVIDER_PANIC_ERROR: &str = "provider panicked";
/// 读取提供方配置 panic 时写入任务的错误信息
pub const PROVIDER_CONFIG_PANIC_ERROR: &str = "provider config lookup panicked";
/// 执行器关闭时中断任务写入的错误信息
pub const EXECUTOR_SHUTDOWN_ERROR: &str = "executor shut down";

/// 执行器时间参数
#[derive(Debug, Clone, Copy)]
pub struct ExecutorTimings {
    /// 空闲时两次认领之间的间隔
    pub poll_interval: Duration,
    /// 心跳刷新间隔
    pub heartbeat_interval: Duration,
    /// 心跳超时阈值，仅用于状态展示
    pub lock_timeout: Duration,
}

impl Default for ExecutorTimings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            heartbeat_interval: Duration::from_secs(5),
            lock_timeout: Duration::from_secs(30),
        }
    }
}

/// 执行器依赖
#[derive(Clone)]
pub struct ExecutionContext {
    pub queue: Arc<dyn TaskQueue>,
    pub provider: Arc<dyn GenerationProvider>,
    pub provider_config: Arc<dyn ProviderConfigSource>,
}

/// 一次执行的结果
#[derive(Debug)]
enum ExecutionOutcome {
    Succeeded(GenerationOutput),
    Failed {
        error: String,
        label: &'static str,
    },
    /// 执行期间任务已被锁监控收走
    Lost,
}

/// 执行器
///
/// 循环认领某类型的任务并调用提供方。提供方调用运行在独立的 tokio
/// 任务中：它的 panic 只会让当前任务失败，执行循环本身继续运行。
pub struct Executor {
    state: Arc<ExecutorState>,
    context: ExecutionContext,
    timings: ExecutorTimings,
    shutdown: CancellationToken,
}

impl Executor {
    pub fn new(
        state: Arc<ExecutorState>,
        context: ExecutionContext,
        timings: ExecutorTimings,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            state,
            context,
            timings,
            shutdown,
        }
    }

    pub fn state(&self) -> &Arc<ExecutorState> {
        &self.state
    }

    /// 认领并执行一个任务
    ///
    /// # 返回值
    ///
    /// * `Ok(true)` - 执行了一个任务
    /// * `Ok(false)` - 没有可认领的任务
    pub async fn run_once(&self) -> Result<bool, WorkerError> {
        let task = self
            .context
            .queue
            .claim(self.state.task_type(), self.state.worker_id())
            .await?;

        match task {
            Some(task) => {
                self.execute(task).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn idle(&self) {
        tokio::select! {
            _ = self.shutdown.cancelled() => {}
            _ = sleep(self.timings.poll_interval) => {}
        }
    }

    #[instrument(
        skip(self, task),
        fields(
            task_id = %task.id,
            task_type = %task.task_type,
            worker_id = %self.state.worker_id()
        )
    )]
    async fn execute(&self, task: Task) {
        let started = std::time::Instant::now();
        let task_id = task.id;
        let task_type = task.task_type;
        let worker_id = self.state.worker_id();

        info!("Executing task {} ({})", task_id, task.params.provider());
        self.state.begin(task.clone());

        let outcome = self.drive(task).await;

        let (recorded, label, counted) = match outcome {
            ExecutionOutcome::Succeeded(output) => (
                self.context.queue.complete(task_id, worker_id, output).await,
                "success",
                true,
            ),
            ExecutionOutcome::Failed { error, label } => {
                warn!("Task {} failed: {}", task_id, error);
                (
                    self.context.queue.fail(task_id, worker_id, &error).await,
                    label,
                    false,
                )
            }
            ExecutionOutcome::Lost => {
                warn!(
                    "Executor {} lost ownership of task {}, dropping result",
                    worker_id, task_id
                );
                self.state.finish(None);
                metrics::record_finished(task_type, "lost", started.elapsed());
                return;
            }
        };

        let outcome = match recorded {
            Ok(true) => {
                info!("Task {} finished with {}", task_id, label);
                Some(counted)
            }
            Ok(false) => {
                warn!(
                    "Task {} left running before executor {} recorded its result",
                    task_id, worker_id
                );
                None
            }
            Err(e) => {
                error!("Failed to record result of task {}: {}", task_id, e);
                None
            }
        };

        self.state.finish(outcome);
        metrics::record_finished(task_type, label, started.elapsed());
    }

    async fn drive(&self, task: Task) -> ExecutionOutcome {
        // 配置来源可能读文件，放到阻塞线程池
        let source = self.context.provider_config.clone();
        let task_type = task.task_type;
        let lookup = tokio::task::spawn_blocking(move || source.provider_config(task_type));
        let config = match lookup.await {
            Ok(Ok(config)) => config,
            Ok(Err(e)) => {
                return ExecutionOutcome::Failed {
                    error: e.to_string(),
                    label: "failed",
                }
            }
            Err(e) => {
                error!("Provider config lookup for task {} aborted: {}", task.id, e);
                return ExecutionOutcome::Failed {
                    error: PROVIDER_CONFIG_PANIC_ERROR.to_string(),
                    label: "failed",
                };
            }
        };

        let timeout_secs = task.timeout_seconds.filter(|secs| *secs > 0);
        let task_id = task.id;
        let provider = self.context.provider.clone();
        let mut call = tokio::spawn(async move { provider.generate(&task, &config).await });

        let deadline = async {
            match timeout_secs {
                Some(secs) => sleep_until(Instant::now() + Duration::from_secs(secs as u64)).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline);

        let period = self.timings.heartbeat_interval;
        let mut heartbeat = interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                joined = &mut call => {
                    return match joined {
                        Ok(Ok(output)) => ExecutionOutcome::Succeeded(output),
                        Ok(Err(e)) => ExecutionOutcome::Failed {
                            error: e.to_string(),
                            label: "failed",
                        },
                        Err(e) if e.is_panic() => ExecutionOutcome::Failed {
                            error: PROVIDER_PANIC_ERROR.to_string(),
                            label: "failed",
                        },
                        Err(e) => ExecutionOutcome::Failed {
                            error: format!("provider call aborted: {}", e),
                            label: "failed",
                        },
                    };
                }
                _ = heartbeat.tick() => {
                    if !self.beat(task_id).await {
                        call.abort();
                        return ExecutionOutcome::Lost;
                    }
                }
                _ = &mut deadline => {
                    call.abort();
                    let secs = timeout_secs.unwrap_or_default();
                    return ExecutionOutcome::Failed {
                        error: format!("task timed out after {}s", secs),
                        label: "timeout",
                    };
                }
                _ = self.shutdown.cancelled() => {
                    call.abort();
                    return ExecutionOutcome::Failed {
                        error: EXECUTOR_SHUTDOWN_ERROR.to_string(),
                        label: "failed",
                    };
                }
            }
        }
    }

    /// 刷新心跳，返回是否仍持有任务
    ///
    /// 写入失败视为暂时性问题，继续执行；由锁监控判断是否超时。
    async fn beat(&self, task_id: uuid::Uuid) -> bool {
        match self
            .context
            .queue
            .heartbeat(task_id, self.state.worker_id())
            .await
        {
            Ok(true) => {
                debug!("Heartbeat for task {}", task_id);
                self.state.record_heartbeat(Utc::now());
                true
            }
            Ok(false) => false,
            Err(e) => {
                warn!("Failed to refresh heartbeat for task {}: {}", task_id, e);
                true
            }
        }
    }
}

#[async_trait]
impl Worker for Executor {
    async fn run(&self) -> Result<(), WorkerError> {
        let _alive = AliveGuard::new(self.state.clone());
        self.state.set_running(true);
        info!("Executor {} started", self.state.worker_id());

        while !self.shutdown.is_cancelled() {
            match self.run_once().await {
                Ok(true) => {}
                Ok(false) => self.idle().await,
                Err(e) => {
                    error!(
                        "Executor {} failed to claim a task: {}",
                        self.state.worker_id(),
                        e
                    );
                    self.idle().await;
                }
            }
        }

        self.state.set_running(false);
        info!("Executor {} stopped", self.state.worker_id());
        Ok(())
    }

    fn name(&self) -> &str {
        self.state.worker_id()
    }
}

#[cfg(test)]
#[path = "executor_test.rs"]
mod tests;
