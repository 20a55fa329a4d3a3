// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::executor::{ExecutorSnapshot, PoolSummary};
use crate::domain::models::task::TaskType;
use crate::workers::executor::{ExecutionContext, Executor, ExecutorTimings};
use crate::workers::registry::{ExecutorRegistry, ExecutorState};
use crate::workers::Worker;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

struct ExecutorHandle {
    state: Arc<ExecutorState>,
    handle: JoinHandle<()>,
}

/// 工作池
///
/// 为单一任务类型运行固定数量的执行器，执行器命名为 `<类型>-<序号>`。
pub struct WorkerPool {
    task_type: TaskType,
    concurrency: usize,
    context: ExecutionContext,
    timings: ExecutorTimings,
    registry: ExecutorRegistry,
    shutdown: CancellationToken,
    handles: Mutex<Vec<ExecutorHandle>>,
}

impl WorkerPool {
    /// 创建工作池
    ///
    /// # 参数
    ///
    /// * `task_type` - 工作池负责的任务类型
    /// * `concurrency` - 执行器数量，为 0 时工作池不做任何事
    /// * `context` - 执行器共享的队列与提供方
    /// * `timings` - 执行器时间参数
    /// * `registry` - 执行器注册表
    /// * `shutdown` - 关闭信号
    pub fn new(
        task_type: TaskType,
        concurrency: usize,
        context: ExecutionContext,
        timings: ExecutorTimings,
        registry: ExecutorRegistry,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            task_type,
            concurrency,
            context,
            timings,
            registry,
            shutdown,
            handles: Mutex::new(Vec::new()),
        }
    }

    pub fn task_type(&self) -> TaskType {
        self.task_type
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// 启动全部执行器，重复调用无效果
    pub fn start(&self) {
        let mut handles = self.handles.lock();
        if !handles.is_empty() || self.shutdown.is_cancelled() {
            return;
        }

        for index in 0..self.concurrency {
            let state = Arc::new(ExecutorState::new(
                format!("{}-{}", self.task_type, index),
                self.task_type,
                self.timings.heartbeat_interval,
                self.timings.lock_timeout,
            ));
            self.registry.register(state.clone());
            let handle = self.spawn_executor(state.clone());
            handles.push(ExecutorHandle { state, handle });
        }

        info!(
            "Started {} pool with {} executors",
            self.task_type, self.concurrency
        );
    }

    fn spawn_executor(&self, state: Arc<ExecutorState>) -> JoinHandle<()> {
        let executor = Executor::new(
            state,
            self.context.clone(),
            self.timings,
            self.shutdown.clone(),
        );

        tokio::spawn(async move {
            if let Err(e) = executor.run().await {
                error!("Executor {} exited with error: {}", executor.name(), e);
            }
        })
    }

    /// 重启意外退出的执行器
    ///
    /// # 返回值
    ///
    /// 返回本次重启的执行器数量
    pub fn supervise(&self) -> usize {
        if self.shutdown.is_cancelled() {
            return 0;
        }

        let mut respawned = 0;
        let mut handles = self.handles.lock();
        for entry in handles.iter_mut() {
            if entry.handle.is_finished() {
                warn!(
                    "Executor {} exited unexpectedly, respawning",
                    entry.state.worker_id()
                );
                entry.handle = self.spawn_executor(entry.state.clone());
                respawned += 1;
            }
        }
        respawned
    }

    /// 停止所有执行器并等待退出
    ///
    /// 正在执行的任务会被中断并记为失败。
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let handles: Vec<ExecutorHandle> = std::mem::take(&mut *self.handles.lock());

        for entry in handles {
            if let Err(e) = entry.handle.await {
                error!(
                    "Executor {} terminated abnormally: {}",
                    entry.state.worker_id(),
                    e
                );
            }
        }

        info!("{} pool shut down", self.task_type);
    }

    pub fn snapshots(&self) -> Vec<ExecutorSnapshot> {
        self.registry.snapshots_for(self.task_type)
    }

    pub fn summary(&self) -> PoolSummary {
        self.registry.pool_summary(self.task_type)
    }
}

#[cfg(test)]
#[path = "pool_test.rs"]
mod tests;
