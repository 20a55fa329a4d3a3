// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::{Task, TaskParams, TaskTarget};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// 创建任务请求DTO
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct EnqueueTaskRequestDto {
    /// 生成参数，`kind` 字段决定任务类型
    #[validate(custom(function = "validate_params"))]
    pub params: TaskParams,

    /// 优先级，数值越大越先执行
    #[serde(default)]
    pub priority: Option<i32>,

    /// 建议的最大重试次数
    #[validate(range(min = 0, max = 100))]
    #[serde(default)]
    pub max_retries: Option<i32>,

    /// 运行阶段超时（秒）
    #[validate(range(min = 1, max = 86400))]
    #[serde(default)]
    pub timeout_seconds: Option<i64>,

    /// 任务服务的镜头、台词等
    #[serde(flatten)]
    pub target: TaskTarget,
}

fn validate_params(params: &TaskParams) -> Result<(), ValidationError> {
    let (subtype, provider, body, field) = match params {
        TaskParams::Image(p) => (&p.subtype, &p.provider, &p.prompt, "prompt"),
        TaskParams::Video(p) => (&p.subtype, &p.provider, &p.prompt, "prompt"),
        TaskParams::Audio(p) => (&p.subtype, &p.provider, &p.text, "text"),
    };

    if subtype.trim().is_empty() {
        return Err(ValidationError::new("subtype").with_message(Cow::from("subtype cannot be empty")));
    }
    if provider.trim().is_empty() {
        return Err(
            ValidationError::new("provider").with_message(Cow::from("provider cannot be empty"))
        );
    }
    if body.trim().is_empty() {
        return Err(ValidationError::new("content")
            .with_message(Cow::from(format!("{} cannot be empty", field))));
    }
    if let TaskParams::Audio(audio) = params {
        if let Some(speed) = audio.speed {
            if !(0.25..=4.0).contains(&speed) {
                return Err(ValidationError::new("speed")
                    .with_message(Cow::from("speed must be between 0.25 and 4.0")));
            }
        }
    }
    Ok(())
}

impl EnqueueTaskRequestDto {
    pub fn new(params: TaskParams) -> Self {
        Self {
            params,
            priority: None,
            max_retries: None,
            timeout_seconds: None,
            target: TaskTarget::default(),
        }
    }

    /// 转换为新的待执行任务
    pub fn into_task(self) -> Task {
        let mut task = Task::new(self.params)
            .with_timeout(self.timeout_seconds)
            .with_target(self.target);
        if let Some(priority) = self.priority {
            task = task.with_priority(priority);
        }
        if let Some(max_retries) = self.max_retries {
            task = task.with_max_retries(max_retries);
        }
        task
    }
}

/// 分页偏移上限，存储层以有符号 64 位整数绑定偏移量
pub const MAX_LIST_OFFSET: u64 = i64::MAX as u64;

/// 任务列表查询参数
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct ListTasksQuery {
    /// 任务类型过滤
    pub task_type: Option<String>,
    /// 任务状态过滤
    pub status: Option<String>,
    /// 分页偏移
    #[validate(range(max = MAX_LIST_OFFSET))]
    pub offset: Option<u64>,
    /// 分页大小
    #[validate(range(min = 1, max = 1000))]
    pub limit: Option<u64>,
}

/// 批量查询请求DTO
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct PollTasksRequestDto {
    #[validate(length(max = 1000, message = "at most 1000 task ids per poll"))]
    pub task_ids: Vec<Uuid>,
}

/// 批量暂停/恢复的类型过滤
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BulkControlQuery {
    pub task_type: Option<String>,
}

/// 单任务命令响应DTO
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommandResponseDto {
    /// 状态转换是否生效
    pub success: bool,
    /// 命令执行后的任务
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<Task>,
}

/// 批量命令响应DTO
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BulkResponseDto {
    pub success: bool,
    /// 实际发生状态转换的任务数量
    pub affected: u64,
}

/// 任务分页响应DTO
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TaskPageDto {
    pub tasks: Vec<Task>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
    pub has_more: bool,
}

/// 批量查询响应DTO，未知ID不出现在结果中
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollTasksResponseDto {
    pub tasks: HashMap<Uuid, Task>,
}
