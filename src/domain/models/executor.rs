// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::{Task, TaskType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// 执行器运行时快照
///
/// 执行器不持久化，快照仅反映查询瞬间的状态。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorSnapshot {
    /// 池内稳定标识，形如 `image-0`
    pub worker_id: String,
    pub task_type: TaskType,
    /// 执行循环是否处于运行中（未被要求停止）
    pub running: bool,
    /// 底层 tokio 任务是否存活
    pub thread_alive: bool,
    pub current_task_id: Option<Uuid>,
    pub current_task: Option<Task>,
    pub heartbeat_interval_secs: u64,
    pub lock_timeout_secs: u64,
    pub last_heartbeat_at: Option<DateTime<Utc>>,
    pub tasks_succeeded: u64,
    pub tasks_failed: u64,
}

impl ExecutorSnapshot {
    pub fn is_busy(&self) -> bool {
        self.current_task_id.is_some()
    }
}

/// 单个工作池的汇总
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSummary {
    pub total: usize,
    pub busy: usize,
}

/// 执行器状态报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorStatusReport {
    pub executors: Vec<ExecutorSnapshot>,
    pub summary: BTreeMap<TaskType, PoolSummary>,
}

impl ExecutorStatusReport {
    /// 由快照列表构建报告，没有执行器的类型也会出现在汇总中
    pub fn from_snapshots(mut executors: Vec<ExecutorSnapshot>) -> Self {
        executors.sort_by(|a, b| {
            a.task_type
                .cmp(&b.task_type)
                .then_with(|| a.worker_id.cmp(&b.worker_id))
        });

        let mut summary: BTreeMap<TaskType, PoolSummary> = TaskType::ALL
            .iter()
            .map(|t| (*t, PoolSummary::default()))
            .collect();

        for executor in &executors {
            let entry = summary.entry(executor.task_type).or_default();
            entry.total += 1;
            if executor.is_busy() {
                entry.busy += 1;
            }
        }

        Self { executors, summary }
    }
}
