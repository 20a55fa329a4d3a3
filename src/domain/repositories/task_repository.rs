// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::{Task, TaskStatus, TaskType};
use crate::domain::services::generation_provider::GenerationOutput;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    /// 记录未找到
    #[error("Record not found")]
    NotFound,
    /// 状态机中不存在的转换
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },
    /// 存储的数据无法还原为领域对象
    #[error("Corrupted task record: {0}")]
    Corrupted(String),
}

/// 任务查询参数
#[derive(Debug, Clone)]
pub struct TaskQueryParams {
    pub task_type: Option<TaskType>,
    pub status: Option<TaskStatus>,
    pub offset: u64,
    pub limit: u64,
}

impl Default for TaskQueryParams {
    fn default() -> Self {
        Self {
            task_type: None,
            status: None,
            offset: 0,
            limit: 100,
        }
    }
}

/// 与状态转换一同写入的字段
///
/// 外层 `Option` 表示是否修改该字段，内层 `Option` 为写入的值。
/// `owner` 不写入任何字段，而是作为额外的 CAS 条件：只有当前认领者
/// 与之相同时转换才会生效。
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub owner: Option<String>,
    pub worker_id: Option<Option<String>>,
    pub heartbeat_at: Option<Option<DateTime<Utc>>>,
    pub started_at: Option<Option<DateTime<Utc>>>,
    pub completed_at: Option<Option<DateTime<Utc>>>,
    pub result_url: Option<Option<String>>,
    pub result_local_path: Option<Option<String>>,
    pub error: Option<Option<String>>,
    pub increment_retry: bool,
}

impl TaskUpdate {
    /// 仅变更状态
    pub fn none() -> Self {
        Self::default()
    }

    /// 认领：绑定执行器并写入开始时间与首次心跳
    pub fn claim(worker_id: &str) -> Self {
        let now = Utc::now();
        Self {
            worker_id: Some(Some(worker_id.to_string())),
            heartbeat_at: Some(Some(now)),
            started_at: Some(Some(now)),
            ..Self::default()
        }
    }

    /// 成功：写入结果并释放认领
    pub fn succeed(output: GenerationOutput) -> Self {
        Self {
            worker_id: Some(None),
            completed_at: Some(Some(Utc::now())),
            result_url: Some(output.result_url),
            result_local_path: Some(output.result_local_path),
            error: Some(None),
            ..Self::default()
        }
    }

    /// 失败：写入错误并释放认领
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            worker_id: Some(None),
            completed_at: Some(Some(Utc::now())),
            error: Some(Some(error.into())),
            ..Self::default()
        }
    }

    /// 手动重试：重试计数加一并清空上一次执行留下的字段
    pub fn requeue_for_retry() -> Self {
        Self {
            worker_id: Some(None),
            heartbeat_at: Some(None),
            started_at: Some(None),
            completed_at: Some(None),
            result_url: Some(None),
            result_local_path: Some(None),
            error: Some(None),
            increment_retry: true,
            ..Self::default()
        }
    }

    /// 附加认领者条件
    pub fn owned_by(mut self, worker_id: &str) -> Self {
        self.owner = Some(worker_id.to_string());
        self
    }

    /// 在内存中的任务上重放一次成功的转换
    ///
    /// 与 [`TaskRepository::transition`] 写入的字段一致，`updated_at`
    /// 使用本地时间，可能与存储中的值相差几毫秒。
    pub fn apply_to(self, task: &mut Task, next: TaskStatus) {
        task.status = next;
        task.updated_at = Utc::now();
        if let Some(worker_id) = self.worker_id {
            task.worker_id = worker_id;
        }
        if let Some(heartbeat_at) = self.heartbeat_at {
            task.heartbeat_at = heartbeat_at;
        }
        if let Some(started_at) = self.started_at {
            task.started_at = started_at;
        }
        if let Some(completed_at) = self.completed_at {
            task.completed_at = completed_at;
        }
        if let Some(result_url) = self.result_url {
            task.result_url = result_url;
        }
        if let Some(result_local_path) = self.result_local_path {
            task.result_local_path = result_local_path;
        }
        if let Some(error) = self.error {
            task.error = error;
        }
        if self.increment_retry {
            task.retry_count += 1;
        }
    }
}

/// 任务仓库特质
///
/// 任务存在与状态的唯一事实来源。所有状态转换都经过 [`TaskRepository::transition`]。
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// 创建新任务
    async fn create(&self, task: &Task) -> Result<Task, RepositoryError>;
    /// 根据ID查找任务
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>, RepositoryError>;
    /// 批量按ID查找，未知ID被忽略
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Task>, RepositoryError>;
    /// 分页列出任务，按创建时间倒序，返回 (任务, 总数)
    async fn list(&self, params: TaskQueryParams) -> Result<(Vec<Task>, u64), RepositoryError>;
    /// 比较并交换状态
    ///
    /// 当存储的状态等于 `expected`（且满足 `update.owner`）时写入 `next`
    /// 与 `update` 中的字段并返回 `true`；否则不做任何修改并返回 `false`。
    /// 状态机之外的转换返回 [`RepositoryError::InvalidTransition`]。
    async fn transition(
        &self,
        id: Uuid,
        expected: TaskStatus,
        next: TaskStatus,
        update: TaskUpdate,
    ) -> Result<bool, RepositoryError>;
    /// 某类型下下一个可认领的任务：优先级最高，其次创建最早
    async fn next_claimable(&self, task_type: TaskType) -> Result<Option<Task>, RepositoryError>;
    /// 刷新心跳，仅当任务仍在运行且由该执行器持有时生效
    async fn touch_heartbeat(&self, id: Uuid, worker_id: &str) -> Result<bool, RepositoryError>;
    /// 心跳早于 `threshold` 的运行中任务
    async fn find_stale_running(
        &self,
        threshold: DateTime<Utc>,
    ) -> Result<Vec<Task>, RepositoryError>;
    /// 某状态下的任务ID，可按类型过滤
    async fn find_ids_by_status(
        &self,
        task_type: Option<TaskType>,
        status: TaskStatus,
    ) -> Result<Vec<Uuid>, RepositoryError>;
    /// 按 (类型, 状态) 分组计数，不读取任务内容
    async fn count_by_type_and_status(
        &self,
    ) -> Result<Vec<(TaskType, TaskStatus, u64)>, RepositoryError>;
}
