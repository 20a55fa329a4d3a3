// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::TaskStatus;
use crate::domain::repositories::task_repository::{TaskRepository, TaskUpdate};
use crate::infrastructure::metrics;
use crate::utils::errors::WorkerError;
use crate::workers::Worker;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// 心跳超时的任务写入的错误信息
pub const HEARTBEAT_LOST_ERROR: &str = "executor lost heartbeat";

/// 锁监控
///
/// 定期扫描心跳超过 `lock_timeout` 的运行中任务，并把它们转为失败。
/// 从不把任务放回待执行队列，是否重试由用户决定。
pub struct LockMonitor {
    repository: Arc<dyn TaskRepository>,
    lock_timeout: Duration,
    scan_interval: Duration,
    shutdown: CancellationToken,
}

impl LockMonitor {
    pub fn new(
        repository: Arc<dyn TaskRepository>,
        lock_timeout: Duration,
        scan_interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            repository,
            lock_timeout,
            scan_interval,
            shutdown,
        }
    }

    /// 执行一次扫描
    ///
    /// # 返回值
    ///
    /// 返回本次被转为失败的任务数量
    pub async fn scan_once(&self) -> Result<usize, WorkerError> {
        let lock_timeout = chrono::Duration::from_std(self.lock_timeout)
            .map_err(|e| WorkerError::InternalError(e.to_string()))?;
        let threshold = Utc::now() - lock_timeout;

        let stale = self.repository.find_stale_running(threshold).await?;
        if stale.is_empty() {
            debug!("No stale running tasks");
            return Ok(0);
        }

        let mut reclaimed = 0;
        for task in stale {
            let mut update = TaskUpdate::fail(HEARTBEAT_LOST_ERROR);
            if let Some(owner) = task.worker_id.as_deref() {
                update = update.owned_by(owner);
            }

            match self
                .repository
                .transition(task.id, TaskStatus::Running, TaskStatus::Failed, update)
                .await
            {
                Ok(true) => {
                    warn!(
                        "Task {} ({}) lost its executor {:?}, marked as failed",
                        task.id, task.task_type, task.worker_id
                    );
                    metrics::record_heartbeat_lost(task.task_type);
                    reclaimed += 1;
                }
                // 扫描与完成之间执行器已经写入了结果
                Ok(false) => {}
                Err(e) => error!("Failed to reclaim task {}: {}", task.id, e),
            }
        }

        Ok(reclaimed)
    }
}

#[async_trait]
impl Worker for LockMonitor {
    async fn run(&self) -> Result<(), WorkerError> {
        info!(
            "Lock monitor started (timeout {}s, interval {}s)",
            self.lock_timeout.as_secs(),
            self.scan_interval.as_secs()
        );

        let mut ticker = interval(self.scan_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.scan_once().await {
                        error!("Lock monitor scan failed: {}", e);
                    }
                }
            }
        }

        info!("Lock monitor stopped");
        Ok(())
    }

    fn name(&self) -> &str {
        "lock-monitor"
    }
}
