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

use crate::domain::models::task::{Task, TaskParams, TaskStatus, TaskTarget, TaskType};
use crate::domain::repositories::task_repository::{
    RepositoryError, TaskQueryParams, TaskRepository, TaskUpdate,
};
use crate::infrastructure::database::entities::task as task_entity;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;
use uuid::Uuid;

/// 任务仓库实现
///
/// 基于SeaORM实现的任务数据访问层。状态转换是一条带状态条件的
/// `UPDATE`，由数据库保证原子性，不需要显式事务或行锁。
#[derive(Clone)]
pub struct TaskRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl TaskRepositoryImpl {
    /// 创建新的任务仓库实例
    ///
    /// # 参数
    ///
    /// * `db` - 数据库连接
    ///
    /// # 返回值
    ///
    /// 返回新的任务仓库实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl TryFrom<task_entity::Model> for Task {
    type Error = RepositoryError;

    fn try_from(model: task_entity::Model) -> Result<Self, Self::Error> {
        let task_type: TaskType = model
            .task_type
            .parse()
            .map_err(|e| RepositoryError::Corrupted(format!("{}: {}", model.id, e)))?;
        let status: TaskStatus = model
            .status
            .parse()
            .map_err(|e| RepositoryError::Corrupted(format!("{}: {}", model.id, e)))?;
        let params: TaskParams = serde_json::from_value(model.params)
            .map_err(|e| RepositoryError::Corrupted(format!("{}: {}", model.id, e)))?;

        Ok(Self {
            id: model.id,
            task_type,
            params,
            status,
            priority: model.priority,
            retry_count: model.retry_count,
            max_retries: model.max_retries,
            timeout_seconds: model.timeout_seconds,
            target: TaskTarget {
                shot_id: model.shot_id,
                shot_sequence: model.shot_sequence,
                slot: model.slot,
                dialogue_index: model.dialogue_index,
            },
            worker_id: model.worker_id,
            heartbeat_at: model.heartbeat_at,
            result_url: model.result_url,
            result_local_path: model.result_local_path,
            error: model.error,
            created_at: model.created_at,
            started_at: model.started_at,
            completed_at: model.completed_at,
            updated_at: model.updated_at,
        })
    }
}

impl TryFrom<&Task> for task_entity::ActiveModel {
    type Error = RepositoryError;

    fn try_from(task: &Task) -> Result<Self, Self::Error> {
        let params = serde_json::to_value(&task.params)
            .map_err(|e| RepositoryError::Corrupted(format!("{}: {}", task.id, e)))?;

        Ok(Self {
            id: Set(task.id),
            task_type: Set(task.task_type.to_string()),
            status: Set(task.status.to_string()),
            priority: Set(task.priority),
            params: Set(params),
            retry_count: Set(task.retry_count),
            max_retries: Set(task.max_retries),
            timeout_seconds: Set(task.timeout_seconds),
            shot_id: Set(task.target.shot_id.clone()),
            shot_sequence: Set(task.target.shot_sequence),
            slot: Set(task.target.slot),
            dialogue_index: Set(task.target.dialogue_index),
            worker_id: Set(task.worker_id.clone()),
            heartbeat_at: Set(task.heartbeat_at),
            result_url: Set(task.result_url.clone()),
            result_local_path: Set(task.result_local_path.clone()),
            error: Set(task.error.clone()),
            created_at: Set(task.created_at),
            started_at: Set(task.started_at),
            completed_at: Set(task.completed_at),
            updated_at: Set(task.updated_at),
        })
    }
}

fn into_tasks(models: Vec<task_entity::Model>) -> Result<Vec<Task>, RepositoryError> {
    models.into_iter().map(Task::try_from).collect()
}

#[async_trait]
impl TaskRepository for TaskRepositoryImpl {
    async fn create(&self, task: &Task) -> Result<Task, RepositoryError> {
        let model = task_entity::ActiveModel::try_from(task)?;

        model.insert(self.db.as_ref()).await?;
        Ok(task.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>, RepositoryError> {
        let model = task_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?;

        model.map(Task::try_from).transpose()
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Task>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let models = task_entity::Entity::find()
            .filter(task_entity::Column::Id.is_in(ids.iter().copied()))
            .all(self.db.as_ref())
            .await?;

        into_tasks(models)
    }

    async fn list(&self, params: TaskQueryParams) -> Result<(Vec<Task>, u64), RepositoryError> {
        let mut select = task_entity::Entity::find();

        if let Some(task_type) = params.task_type {
            select = select.filter(task_entity::Column::TaskType.eq(task_type.to_string()));
        }
        if let Some(status) = params.status {
            select = select.filter(task_entity::Column::Status.eq(status.to_string()));
        }

        let total = select.clone().count(self.db.as_ref()).await?;

        let models = select
            .order_by_desc(task_entity::Column::CreatedAt)
            .order_by_desc(task_entity::Column::Id)
            .offset(params.offset)
            .limit(params.limit)
            .all(self.db.as_ref())
            .await?;

        Ok((into_tasks(models)?, total))
    }

    async fn transition(
        &self,
        id: Uuid,
        expected: TaskStatus,
        next: TaskStatus,
        update: TaskUpdate,
    ) -> Result<bool, RepositoryError> {
        if !expected.can_transition_to(next) {
            return Err(RepositoryError::InvalidTransition {
                from: expected,
                to: next,
            });
        }

        let mut query = task_entity::Entity::update_many()
            .col_expr(task_entity::Column::Status, Expr::value(next.to_string()))
            .col_expr(task_entity::Column::UpdatedAt, Expr::value(Utc::now()));

        if let Some(worker_id) = update.worker_id {
            query = query.col_expr(task_entity::Column::WorkerId, Expr::value(worker_id));
        }
        if let Some(heartbeat_at) = update.heartbeat_at {
            query = query.col_expr(task_entity::Column::HeartbeatAt, Expr::value(heartbeat_at));
        }
        if let Some(started_at) = update.started_at {
            query = query.col_expr(task_entity::Column::StartedAt, Expr::value(started_at));
        }
        if let Some(completed_at) = update.completed_at {
            query = query.col_expr(task_entity::Column::CompletedAt, Expr::value(completed_at));
        }
        if let Some(result_url) = update.result_url {
            query = query.col_expr(task_entity::Column::ResultUrl, Expr::value(result_url));
        }
        if let Some(result_local_path) = update.result_local_path {
            query = query.col_expr(
                task_entity::Column::ResultLocalPath,
                Expr::value(result_local_path),
            );
        }
        if let Some(error) = update.error {
            query = query.col_expr(task_entity::Column::Error, Expr::value(error));
        }
        if update.increment_retry {
            query = query.col_expr(
                task_entity::Column::RetryCount,
                Expr::col(task_entity::Column::RetryCount).add(1),
            );
        }

        query = query
            .filter(task_entity::Column::Id.eq(id))
            .filter(task_entity::Column::Status.eq(expected.to_string()));

        if let Some(owner) = update.owner {
            query = query.filter(task_entity::Column::WorkerId.eq(owner));
        }

        let result = query.exec(self.db.as_ref()).await?;
        Ok(result.rows_affected == 1)
    }

    async fn next_claimable(&self, task_type: TaskType) -> Result<Option<Task>, RepositoryError> {
        let model = task_entity::Entity::find()
            .filter(task_entity::Column::TaskType.eq(task_type.to_string()))
            .filter(task_entity::Column::Status.eq(TaskStatus::Pending.to_string()))
            .order_by_desc(task_entity::Column::Priority)
            .order_by_asc(task_entity::Column::CreatedAt)
            .order_by_asc(task_entity::Column::Id)
            .one(self.db.as_ref())
            .await?;

        model.map(Task::try_from).transpose()
    }

    async fn touch_heartbeat(&self, id: Uuid, worker_id: &str) -> Result<bool, RepositoryError> {
        let now = Utc::now();
        let result = task_entity::Entity::update_many()
            .col_expr(task_entity::Column::HeartbeatAt, Expr::value(now))
            .col_expr(task_entity::Column::UpdatedAt, Expr::value(now))
            .filter(task_entity::Column::Id.eq(id))
            .filter(task_entity::Column::Status.eq(TaskStatus::Running.to_string()))
            .filter(task_entity::Column::WorkerId.eq(worker_id))
            .exec(self.db.as_ref())
            .await?;

        Ok(result.rows_affected == 1)
    }

    async fn find_stale_running(
        &self,
        threshold: DateTime<Utc>,
    ) -> Result<Vec<Task>, RepositoryError> {
        // 运行中的任务数量受各工作池并发上限约束，在内存中比较时间戳即可
        let models = task_entity::Entity::find()
            .filter(task_entity::Column::Status.eq(TaskStatus::Running.to_string()))
            .all(self.db.as_ref())
            .await?;

        let stale = into_tasks(models)?
            .into_iter()
            .filter(|task| {
                task.heartbeat_at
                    .or(task.started_at)
                    .map_or(true, |beat| beat < threshold)
            })
            .collect();

        Ok(stale)
    }

    async fn find_ids_by_status(
        &self,
        task_type: Option<TaskType>,
        status: TaskStatus,
    ) -> Result<Vec<Uuid>, RepositoryError> {
        let mut select = task_entity::Entity::find()
            .select_only()
            .column(task_entity::Column::Id)
            .filter(task_entity::Column::Status.eq(status.to_string()));

        if let Some(task_type) = task_type {
            select = select.filter(task_entity::Column::TaskType.eq(task_type.to_string()));
        }

        let ids = select
            .order_by_asc(task_entity::Column::CreatedAt)
            .into_tuple::<Uuid>()
            .all(self.db.as_ref())
            .await?;

        Ok(ids)
    }

    async fn count_by_type_and_status(
        &self,
    ) -> Result<Vec<(TaskType, TaskStatus, u64)>, RepositoryError> {
        let rows: Vec<(String, String, i64)> = task_entity::Entity::find()
            .select_only()
            .column(task_entity::Column::TaskType)
            .column(task_entity::Column::Status)
            .column_as(Expr::col(task_entity::Column::Id).count(), "count")
            .group_by(task_entity::Column::TaskType)
            .group_by(task_entity::Column::Status)
            .into_tuple()
            .all(self.db.as_ref())
            .await?;

        rows.into_iter()
            .map(|(task_type, status, count)| {
                let task_type = task_type
                    .parse()
                    .map_err(|e| RepositoryError::Corrupted(format!("{}", e)))?;
                let status = status
                    .parse()
                    .map_err(|e| RepositoryError::Corrupted(format!("{}", e)))?;
                Ok((task_type, status, count.max(0) as u64))
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "task_repo_impl_test.rs"]
mod tests;
