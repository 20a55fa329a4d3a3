// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::{Task, TaskStatus, TaskType};
use crate::domain::repositories::task_repository::{RepositoryError, TaskRepository, TaskUpdate};
use crate::domain::services::generation_provider::GenerationOutput;
use crate::infrastructure::metrics;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// 单次认领中允许的最大 CAS 尝试次数
///
/// 竞争激烈时把控制权交还执行器的轮询周期，而不是原地自旋。
pub const MAX_CLAIM_ATTEMPTS: usize = 8;

/// 队列错误类型
#[derive(Error, Debug)]
pub enum QueueError {
    /// 仓库错误
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// 任务队列特质
///
/// 建立在任务仓库 CAS 原语之上的认领协议。
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// 入队任务
    async fn enqueue(&self, task: Task) -> Result<Task, QueueError>;

    /// 认领某类型下一个待执行任务
    ///
    /// # 参数
    ///
    /// * `task_type` - 工作池负责的任务类型
    /// * `worker_id` - 执行器标识
    ///
    /// # 返回值
    ///
    /// * `Ok(Some(Task))` - 已转为 `running` 并归属该执行器的任务
    /// * `Ok(None)` - 没有可认领的任务，或本轮竞争全部失败
    async fn claim(&self, task_type: TaskType, worker_id: &str)
        -> Result<Option<Task>, QueueError>;

    /// 刷新心跳，返回该执行器是否仍持有任务
    async fn heartbeat(&self, task_id: Uuid, worker_id: &str) -> Result<bool, QueueError>;

    /// 完成任务，返回 CAS 是否成功
    async fn complete(
        &self,
        task_id: Uuid,
        worker_id: &str,
        output: GenerationOutput,
    ) -> Result<bool, QueueError>;

    /// 失败任务，返回 CAS 是否成功
    async fn fail(&self, task_id: Uuid, worker_id: &str, error: &str)
        -> Result<bool, QueueError>;
}

/// 基于任务仓库的队列实现
pub struct StoreTaskQueue<R: TaskRepository + ?Sized> {
    /// 任务仓库
    repository: Arc<R>,
}

impl<R: TaskRepository + ?Sized> StoreTaskQueue<R> {
    /// 创建新的任务队列实例
    ///
    /// # 参数
    ///
    /// * `repository` - 任务仓库
    ///
    /// # 返回值
    ///
    /// 返回新的任务队列实例
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl<R: TaskRepository + ?Sized> TaskQueue for StoreTaskQueue<R> {
    async fn enqueue(&self, task: Task) -> Result<Task, QueueError> {
        let created = self.repository.create(&task).await?;
        metrics::record_enqueued(created.task_type);
        Ok(created)
    }

    async fn claim(
        &self,
        task_type: TaskType,
        worker_id: &str,
    ) -> Result<Option<Task>, QueueError> {
        for attempt in 0..MAX_CLAIM_ATTEMPTS {
            let Some(mut candidate) = self.repository.next_claimable(task_type).await? else {
                return Ok(None);
            };

            let update = TaskUpdate::claim(worker_id);
            let won = self
                .repository
                .transition(
                    candidate.id,
                    TaskStatus::Pending,
                    TaskStatus::Running,
                    update.clone(),
                )
                .await?;

            if !won {
                debug!(
                    "Worker {} lost claim race for task {} (attempt {})",
                    worker_id,
                    candidate.id,
                    attempt + 1
                );
                continue;
            }

            // CAS 成功后任务已归属本执行器，不再回读存储
            update.apply_to(&mut candidate, TaskStatus::Running);
            metrics::record_claimed(task_type);
            return Ok(Some(candidate));
        }

        Ok(None)
    }

    async fn heartbeat(&self, task_id: Uuid, worker_id: &str) -> Result<bool, QueueError> {
        Ok(self.repository.touch_heartbeat(task_id, worker_id).await?)
    }

    async fn complete(
        &self,
        task_id: Uuid,
        worker_id: &str,
        output: GenerationOutput,
    ) -> Result<bool, QueueError> {
        let changed = self
            .repository
            .transition(
                task_id,
                TaskStatus::Running,
                TaskStatus::Success,
                TaskUpdate::succeed(output).owned_by(worker_id),
            )
            .await?;
        Ok(changed)
    }

    async fn fail(
        &self,
        task_id: Uuid,
        worker_id: &str,
        error: &str,
    ) -> Result<bool, QueueError> {
        let changed = self
            .repository
            .transition(
                task_id,
                TaskStatus::Running,
                TaskStatus::Failed,
                TaskUpdate::fail(error).owned_by(worker_id),
            )
            .await?;
        Ok(changed)
    }
}

#[async_trait]
impl<T: TaskQueue + ?Sized> TaskQueue for Arc<T> {
    async fn enqueue(&self, task: Task) -> Result<Task, QueueError> {
        (**self).enqueue(task).await
    }

    async fn claim(
        &self,
        task_type: TaskType,
        worker_id: &str,
    ) -> Result<Option<Task>, QueueError> {
        (**self).claim(task_type, worker_id).await
    }

    async fn heartbeat(&self, task_id: Uuid, worker_id: &str) -> Result<bool, QueueError> {
        (**self).heartbeat(task_id, worker_id).await
    }

    async fn complete(
        &self,
        task_id: Uuid,
        worker_id: &str,
        output: GenerationOutput,
    ) -> Result<bool, QueueError> {
        (**self).complete(task_id, worker_id, output).await
    }

    async fn fail(
        &self,
        task_id: Uuid,
        worker_id: &str,
        error: &str,
    ) -> Result<bool, QueueError> {
        (**self).fail(task_id, worker_id, error).await
    }
}

#[cfg(test)]
#[path = "task_queue_test.rs"]
mod tests;
