// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::{TaskStatus, TaskType};
use serde::{Deserialize, Serialize};

/// 单一类型下各状态的任务数量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: u64,
    pub paused: u64,
    pub running: u64,
    pub success: u64,
    pub failed: u64,
    pub cancelled: u64,
}

impl StatusCounts {
    pub fn get(&self, status: TaskStatus) -> u64 {
        match status {
            TaskStatus::Pending => self.pending,
            TaskStatus::Paused => self.paused,
            TaskStatus::Running => self.running,
            TaskStatus::Success => self.success,
            TaskStatus::Failed => self.failed,
            TaskStatus::Cancelled => self.cancelled,
        }
    }

    pub fn add(&mut self, status: TaskStatus, count: u64) {
        let slot = match status {
            TaskStatus::Pending => &mut self.pending,
            TaskStatus::Paused => &mut self.paused,
            TaskStatus::Running => &mut self.running,
            TaskStatus::Success => &mut self.success,
            TaskStatus::Failed => &mut self.failed,
            TaskStatus::Cancelled => &mut self.cancelled,
        };
        *slot += count;
    }

    pub fn total(&self) -> u64 {
        TaskStatus::ALL.iter().map(|s| self.get(*s)).sum()
    }
}

/// 任务汇总
///
/// 按 类型 × 状态 统计的派生数据，每次请求时从任务仓库重新计算，
/// 从不作为事实来源。`total` 为三种类型之和。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub image: StatusCounts,
    pub video: StatusCounts,
    pub audio: StatusCounts,
    pub total: StatusCounts,
}

impl TaskSummary {
    /// 由 (类型, 状态, 数量) 分组结果构建汇总
    pub fn from_counts<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (TaskType, TaskStatus, u64)>,
    {
        let mut summary = Self::default();
        for (task_type, status, count) in rows {
            summary.for_type_mut(task_type).add(status, count);
            summary.total.add(status, count);
        }
        summary
    }

    pub fn for_type(&self, task_type: TaskType) -> &StatusCounts {
        match task_type {
            TaskType::Image => &self.image,
            TaskType::Video => &self.video,
            TaskType::Audio => &self.audio,
        }
    }

    fn for_type_mut(&mut self, task_type: TaskType) -> &mut StatusCounts {
        match task_type {
            TaskType::Image => &mut self.image,
            TaskType::Video => &mut self.video,
            TaskType::Audio => &mut self.audio,
        }
    }
}
