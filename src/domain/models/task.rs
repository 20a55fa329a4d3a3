// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// 默认最大重试次数（仅作参考，重试均由用户手动发起）
pub const DEFAULT_MAX_RETRIES: i32 = 3;

/// 生成任务实体
///
/// 表示一次图片、视频或音频生成工作。任务记录由任务仓库持有，
/// 状态只能通过仓库的比较并交换（CAS）原语变更；处于 `Running`
/// 状态时恰好被一个执行器认领。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// 任务唯一标识符
    pub id: Uuid,
    /// 任务类型，决定由哪个工作池认领
    pub task_type: TaskType,
    /// 类型相关的生成参数，对调度器不透明
    pub params: TaskParams,
    /// 任务状态
    pub status: TaskStatus,
    /// 任务优先级，数值越大越先执行
    pub priority: i32,
    /// 已手动重试次数
    pub retry_count: i32,
    /// 最大重试次数
    pub max_retries: i32,
    /// 运行阶段的超时时间（秒）
    pub timeout_seconds: Option<i64>,
    /// 任务服务的领域对象（镜头、台词等）
    #[serde(flatten)]
    pub target: TaskTarget,
    /// 当前认领该任务的执行器
    pub worker_id: Option<String>,
    /// 执行器最近一次心跳时间
    pub heartbeat_at: Option<DateTime<Utc>>,
    /// 生成结果的远程地址
    pub result_url: Option<String>,
    /// 生成结果的本地路径
    pub result_local_path: Option<String>,
    /// 失败原因
    pub error: Option<String>,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 开始执行时间，由执行器在认领时写入
    pub started_at: Option<DateTime<Utc>>,
    /// 完成时间，由执行器在结束时写入
    pub completed_at: Option<DateTime<Utc>>,
    /// 最后更新时间
    pub updated_at: DateTime<Utc>,
}

/// 任务类型枚举
///
/// 每种类型对应一个独立的工作池。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// 图片生成
    #[default]
    Image,
    /// 视频生成
    Video,
    /// 音频（语音合成）
    Audio,
}

impl TaskType {
    /// 所有任务类型，按固定顺序
    pub const ALL: [TaskType; 3] = [TaskType::Image, TaskType::Video, TaskType::Audio];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Image => "image",
            TaskType::Video => "video",
            TaskType::Audio => "audio",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(TaskType::Image),
            "video" => Ok(TaskType::Video),
            "audio" => Ok(TaskType::Audio),
            other => Err(DomainError::UnknownTaskType(other.to_string())),
        }
    }
}

/// 任务状态枚举
///
/// 状态转换遵循以下流程：
/// Pending ⇄ Paused，Pending/Paused → Cancelled，
/// Pending → Running → Success/Failed，Failed/Cancelled → Pending（手动重试）
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// 等待执行
    #[default]
    Pending,
    /// 已暂停，不会被认领
    Paused,
    /// 执行中，被某个执行器认领
    Running,
    /// 成功（终态）
    Success,
    /// 失败，可手动重试
    Failed,
    /// 已取消，可手动重试
    Cancelled,
}

impl TaskStatus {
    /// 所有任务状态，按固定顺序
    pub const ALL: [TaskStatus; 6] = [
        TaskStatus::Pending,
        TaskStatus::Paused,
        TaskStatus::Running,
        TaskStatus::Success,
        TaskStatus::Failed,
        TaskStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Paused => "paused",
            TaskStatus::Running => "running",
            TaskStatus::Success => "success",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// 判断状态机中是否存在 `self → next` 这条边
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Pending, Paused)
                | (Paused, Pending)
                | (Pending, Cancelled)
                | (Paused, Cancelled)
                | (Pending, Running)
                | (Running, Success)
                | (Running, Failed)
                | (Failed, Pending)
                | (Cancelled, Pending)
        )
    }

    /// 是否为终态（只能通过手动重试离开的状态也视为已结束）
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            TaskStatus::Success | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "paused" => Ok(TaskStatus::Paused),
            "running" => Ok(TaskStatus::Running),
            "success" => Ok(TaskStatus::Success),
            "failed" => Ok(TaskStatus::Failed),
            "cancelled" => Ok(TaskStatus::Cancelled),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

/// 类型相关的生成参数
///
/// 三种任务共享生命周期字段，但参数不同，用带标签的枚举表示。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskParams {
    Image(ImageParams),
    Video(VideoParams),
    Audio(AudioParams),
}

impl TaskParams {
    /// 参数对应的任务类型
    pub fn task_type(&self) -> TaskType {
        match self {
            TaskParams::Image(_) => TaskType::Image,
            TaskParams::Video(_) => TaskType::Video,
            TaskParams::Audio(_) => TaskType::Audio,
        }
    }

    /// 提供方名称
    pub fn provider(&self) -> &str {
        match self {
            TaskParams::Image(p) => &p.provider,
            TaskParams::Video(p) => &p.provider,
            TaskParams::Audio(p) => &p.provider,
        }
    }
}

/// 图片生成参数
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageParams {
    /// 子类型，如 text_to_image / image_to_image
    pub subtype: String,
    pub provider: String,
    pub prompt: String,
    pub aspect_ratio: Option<String>,
    #[serde(default)]
    pub reference_images: Vec<String>,
}

/// 视频生成参数
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VideoParams {
    /// 子类型，如 text_to_video / image_to_video
    pub subtype: String,
    pub provider: String,
    pub prompt: String,
    pub aspect_ratio: Option<String>,
    pub duration_seconds: Option<u32>,
    /// 首帧图片
    pub image_url: Option<String>,
}

/// 音频生成参数
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AudioParams {
    pub subtype: String,
    pub provider: String,
    /// 待合成文本
    pub text: String,
    pub voice: Option<String>,
    pub speed: Option<f32>,
    pub emotion: Option<String>,
}

/// 任务服务的领域对象引用
///
/// 仅用于展示和结果回填，调度器从不读取。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskTarget {
    pub shot_id: Option<String>,
    pub shot_sequence: Option<i32>,
    pub slot: Option<i32>,
    pub dialogue_index: Option<i32>,
}

/// 领域错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// 无效的状态转换，当转换不在状态机的边集合中时发生
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: TaskStatus, to: TaskStatus },

    /// 未知任务类型
    #[error("Unknown task type: {0}")]
    UnknownTaskType(String),

    /// 未知任务状态
    #[error("Unknown task status: {0}")]
    UnknownStatus(String),

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl Task {
    /// 创建一个新的待执行任务
    ///
    /// 任务类型由参数决定，保证 `task_type` 与 `params` 一致。
    pub fn new(params: TaskParams) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            task_type: params.task_type(),
            params,
            status: TaskStatus::Pending,
            priority: 0,
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout_seconds: None,
            target: TaskTarget::default(),
            worker_id: None,
            heartbeat_at: None,
            result_url: None,
            result_local_path: None,
            error: None,
            created_at: now,
            started_at: None,
            completed_at: None,
            updated_at: now,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_max_retries(mut self, max_retries: i32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_timeout(mut self, timeout_seconds: Option<i64>) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    pub fn with_target(mut self, target: TaskTarget) -> Self {
        self.target = target;
        self
    }

    /// 校验状态转换是否合法
    pub fn ensure_transition(&self, next: TaskStatus) -> Result<(), DomainError> {
        if self.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(DomainError::InvalidStateTransition {
                from: self.status,
                to: next,
            })
        }
    }

    /// 是否已超过建议的最大重试次数
    ///
    /// 仅供展示，手动重试不受此限制。
    pub fn retries_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }
}

#[cfg(test)]
#[path = "task_test.rs"]
mod tests;
