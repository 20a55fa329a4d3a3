// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::application::dto::task_request::{EnqueueTaskRequestDto, ListTasksQuery};
use crate::domain::models::executor::ExecutorStatusReport;
use crate::domain::models::summary::TaskSummary;
use crate::domain::models::task::{DomainError, Task, TaskStatus, TaskType};
use crate::domain::repositories::task_repository::{
    RepositoryError, TaskQueryParams, TaskRepository, TaskUpdate,
};
use crate::queue::task_queue::{QueueError, TaskQueue};
use crate::workers::registry::ExecutorRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

/// 默认分页大小
pub const DEFAULT_PAGE_SIZE: u64 = 100;
/// 最大分页大小
pub const MAX_PAGE_SIZE: u64 = 1000;

/// 服务错误类型
#[derive(Error, Debug)]
pub enum ServiceError {
    /// 任务不存在，或与给定类型不符
    #[error("Task not found: {0}")]
    NotFound(String),

    /// 请求参数不合法
    #[error("Validation error: {0}")]
    Validation(String),

    /// 仓库错误
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<QueueError> for ServiceError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Repository(e) => ServiceError::Repository(e),
        }
    }
}

/// 单任务命令的结果
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutcome {
    /// 状态转换是否生效；任务处于不允许的状态时为 `false`
    pub success: bool,
    /// 命令执行后的任务
    pub task: Option<Task>,
}

/// 一页任务
#[derive(Debug, Clone, PartialEq)]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

/// 解析任务类型字符串
pub fn parse_task_type(value: &str) -> Result<TaskType, ServiceError> {
    value
        .parse()
        .map_err(|e: DomainError| ServiceError::Validation(e.to_string()))
}

/// 解析任务状态字符串
pub fn parse_status(value: &str) -> Result<TaskStatus, ServiceError> {
    value
        .parse()
        .map_err(|e: DomainError| ServiceError::Validation(e.to_string()))
}

/// 任务服务
///
/// 展示层唯一的入口。本身无状态：任务状态全部在任务仓库中，
/// 执行器状态来自注册表。非法状态下的命令返回 `success = false`，不报错。
#[derive(Clone)]
pub struct TaskService {
    repository: Arc<dyn TaskRepository>,
    queue: Arc<dyn TaskQueue>,
    registry: ExecutorRegistry,
}

impl TaskService {
    /// 创建新的任务服务
    ///
    /// # 参数
    ///
    /// * `repository` - 任务仓库
    /// * `queue` - 任务队列，用于入队
    /// * `registry` - 执行器注册表
    pub fn new(
        repository: Arc<dyn TaskRepository>,
        queue: Arc<dyn TaskQueue>,
        registry: ExecutorRegistry,
    ) -> Self {
        Self {
            repository,
            queue,
            registry,
        }
    }

    /// 创建待执行任务
    pub async fn enqueue_task(&self, request: EnqueueTaskRequestDto) -> Result<Task, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::Validation(e.to_string()))?;

        let task = self.queue.enqueue(request.into_task()).await?;
        info!(
            "Enqueued {} task {} with priority {}",
            task.task_type, task.id, task.priority
        );
        Ok(task)
    }

    /// 按ID获取任务
    pub async fn get_task(&self, task_id: Uuid) -> Result<Task, ServiceError> {
        self.repository
            .find_by_id(task_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(task_id.to_string()))
    }

    /// 分页列出任务，按创建时间倒序
    pub async fn list_tasks(&self, query: ListTasksQuery) -> Result<TaskPage, ServiceError> {
        query
            .validate()
            .map_err(|e| ServiceError::Validation(e.to_string()))?;

        let task_type = query.task_type.as_deref().map(parse_task_type).transpose()?;
        let status = query.status.as_deref().map(parse_status).transpose()?;
        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

        let (tasks, total) = self
            .repository
            .list(TaskQueryParams {
                task_type,
                status,
                offset,
                limit,
            })
            .await?;

        Ok(TaskPage {
            tasks,
            total,
            offset,
            limit,
        })
    }

    /// 按 类型 × 状态 汇总任务数量
    pub async fn get_task_summary(&self) -> Result<TaskSummary, ServiceError> {
        let counts = self.repository.count_by_type_and_status().await?;
        Ok(TaskSummary::from_counts(counts))
    }

    /// 批量按ID查询，未知ID被忽略
    pub async fn poll_tasks(&self, task_ids: &[Uuid]) -> Result<HashMap<Uuid, Task>, ServiceError> {
        let tasks = self.repository.find_by_ids(task_ids).await?;
        Ok(tasks.into_iter().map(|task| (task.id, task)).collect())
    }

    /// 暂停：pending → paused
    pub async fn pause_task(
        &self,
        task_type: TaskType,
        task_id: Uuid,
    ) -> Result<CommandOutcome, ServiceError> {
        self.command(
            task_type,
            task_id,
            &[TaskStatus::Pending],
            TaskStatus::Paused,
            TaskUpdate::none,
        )
        .await
    }

    /// 恢复：paused → pending
    pub async fn resume_task(
        &self,
        task_type: TaskType,
        task_id: Uuid,
    ) -> Result<CommandOutcome, ServiceError> {
        self.command(
            task_type,
            task_id,
            &[TaskStatus::Paused],
            TaskStatus::Pending,
            TaskUpdate::none,
        )
        .await
    }

    /// 取消：pending/paused → cancelled，运行中的任务不可取消
    pub async fn cancel_task(
        &self,
        task_type: TaskType,
        task_id: Uuid,
    ) -> Result<CommandOutcome, ServiceError> {
        self.command(
            task_type,
            task_id,
            &[TaskStatus::Pending, TaskStatus::Paused],
            TaskStatus::Cancelled,
            TaskUpdate::none,
        )
        .await
    }

    /// 手动重试：failed/cancelled → pending，不受 `max_retries` 限制
    pub async fn retry_task(
        &self,
        task_type: TaskType,
        task_id: Uuid,
    ) -> Result<CommandOutcome, ServiceError> {
        self.command(
            task_type,
            task_id,
            &[TaskStatus::Failed, TaskStatus::Cancelled],
            TaskStatus::Pending,
            TaskUpdate::requeue_for_retry,
        )
        .await
    }

    /// 暂停所有待执行任务，返回实际暂停的数量
    pub async fn pause_all_tasks(&self, task_type: Option<TaskType>) -> Result<u64, ServiceError> {
        self.bulk(task_type, TaskStatus::Pending, TaskStatus::Paused)
            .await
    }

    /// 恢复所有已暂停任务，返回实际恢复的数量
    pub async fn resume_all_tasks(&self, task_type: Option<TaskType>) -> Result<u64, ServiceError> {
        self.bulk(task_type, TaskStatus::Paused, TaskStatus::Pending)
            .await
    }

    /// 所有执行器的快照与各工作池汇总
    pub fn get_executor_status(&self) -> ExecutorStatusReport {
        self.registry.status_report()
    }

    async fn find_typed(&self, task_type: TaskType, task_id: Uuid) -> Result<Task, ServiceError> {
        match self.repository.find_by_id(task_id).await? {
            Some(task) if task.task_type == task_type => Ok(task),
            _ => Err(ServiceError::NotFound(format!("{} task {}", task_type, task_id))),
        }
    }

    async fn command(
        &self,
        task_type: TaskType,
        task_id: Uuid,
        allowed_from: &[TaskStatus],
        next: TaskStatus,
        update: fn() -> TaskUpdate,
    ) -> Result<CommandOutcome, ServiceError> {
        let task = self.find_typed(task_type, task_id).await?;

        if !allowed_from.contains(&task.status) {
            debug!(
                "Ignoring {} request for task {} in status {}",
                next, task_id, task.status
            );
            return Ok(CommandOutcome {
                success: false,
                task: Some(task),
            });
        }

        let success = self
            .repository
            .transition(task_id, task.status, next, update())
            .await?;

        if success {
            info!("Task {} moved from {} to {}", task_id, task.status, next);
        }

        let task = self.repository.find_by_id(task_id).await?;
        Ok(CommandOutcome { success, task })
    }

    async fn bulk(
        &self,
        task_type: Option<TaskType>,
        from: TaskStatus,
        to: TaskStatus,
    ) -> Result<u64, ServiceError> {
        let ids = self.repository.find_ids_by_status(task_type, from).await?;

        let mut affected = 0;
        for id in ids {
            // 每个任务独立 CAS，被执行器抢先认领的任务不计入
            if self
                .repository
                .transition(id, from, to, TaskUpdate::none())
                .await?
            {
                affected += 1;
            }
        }

        info!(
            "Bulk {} -> {} for {} affected {} tasks",
            from,
            to,
            task_type.map_or("all types", |t| t.as_str()),
            affected
        );
        Ok(affected)
    }
}

#[cfg(test)]
#[path = "task_service_test.rs"]
mod tests;
