// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::application::dto::task_request::{
    BulkControlQuery, BulkResponseDto, CommandResponseDto, EnqueueTaskRequestDto,
    ListTasksQuery, PollTasksRequestDto, PollTasksResponseDto, TaskPageDto,
};
use crate::application::services::task_service::{
    parse_task_type, CommandOutcome, ServiceError, TaskService,
};
use crate::domain::models::summary::TaskSummary;
use crate::domain::models::task::Task;
use crate::presentation::errors::AppError;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::{Extension, Json};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// 单任务命令
#[derive(Debug, Clone, Copy)]
enum Command {
    Pause,
    Resume,
    Cancel,
    Retry,
}

impl From<CommandOutcome> for CommandResponseDto {
    fn from(outcome: CommandOutcome) -> Self {
        Self {
            success: outcome.success,
            task: outcome.task,
        }
    }
}

/// 创建任务
pub async fn enqueue_task(
    Extension(service): Extension<Arc<TaskService>>,
    Json(request): Json<EnqueueTaskRequestDto>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    let task = service.enqueue_task(request).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// 获取单个任务
pub async fn get_task(
    Extension(service): Extension<Arc<TaskService>>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Task>, AppError> {
    let Path(task_id) = path?;
    Ok(Json(service.get_task(task_id).await?))
}

/// 分页列出任务
pub async fn list_tasks(
    Extension(service): Extension<Arc<TaskService>>,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<TaskPageDto>, AppError> {
    let page = service.list_tasks(query).await?;
    let has_more = page.offset.saturating_add(page.tasks.len() as u64) < page.total;

    Ok(Json(TaskPageDto {
        tasks: page.tasks,
        total: page.total,
        offset: page.offset,
        limit: page.limit,
        has_more,
    }))
}

/// 任务汇总
pub async fn get_task_summary(
    Extension(service): Extension<Arc<TaskService>>,
) -> Result<Json<TaskSummary>, AppError> {
    Ok(Json(service.get_task_summary().await?))
}

/// 批量按ID查询
pub async fn poll_tasks(
    Extension(service): Extension<Arc<TaskService>>,
    Json(request): Json<PollTasksRequestDto>,
) -> Result<Json<PollTasksResponseDto>, AppError> {
    request
        .validate()
        .map_err(|e| ServiceError::Validation(e.to_string()))?;

    let tasks = service.poll_tasks(&request.task_ids).await?;
    Ok(Json(PollTasksResponseDto { tasks }))
}

/// 命令路径参数：`{task_type}/{task_id}`
type CommandPath = Result<Path<(String, Uuid)>, PathRejection>;

async fn run_command(
    service: &TaskService,
    path: CommandPath,
    command: Command,
) -> Result<Json<CommandResponseDto>, AppError> {
    let Path((task_type, task_id)) = path?;
    let task_type = parse_task_type(&task_type)?;
    let outcome = match command {
        Command::Pause => service.pause_task(task_type, task_id).await?,
        Command::Resume => service.resume_task(task_type, task_id).await?,
        Command::Cancel => service.cancel_task(task_type, task_id).await?,
        Command::Retry => service.retry_task(task_type, task_id).await?,
    };
    Ok(Json(outcome.into()))
}

/// 暂停任务
pub async fn pause_task(
    Extension(service): Extension<Arc<TaskService>>,
    path: CommandPath,
) -> Result<Json<CommandResponseDto>, AppError> {
    run_command(&service, path, Command::Pause).await
}

/// 恢复任务
pub async fn resume_task(
    Extension(service): Extension<Arc<TaskService>>,
    path: CommandPath,
) -> Result<Json<CommandResponseDto>, AppError> {
    run_command(&service, path, Command::Resume).await
}

/// 取消任务
pub async fn cancel_task(
    Extension(service): Extension<Arc<TaskService>>,
    path: CommandPath,
) -> Result<Json<CommandResponseDto>, AppError> {
    run_command(&service, path, Command::Cancel).await
}

/// 重试任务
pub async fn retry_task(
    Extension(service): Extension<Arc<TaskService>>,
    path: CommandPath,
) -> Result<Json<CommandResponseDto>, AppError> {
    run_command(&service, path, Command::Retry).await
}

/// 暂停全部待执行任务
pub async fn pause_all_tasks(
    Extension(service): Extension<Arc<TaskService>>,
    Query(query): Query<BulkControlQuery>,
) -> Result<Json<BulkResponseDto>, AppError> {
    let task_type = query.task_type.as_deref().map(parse_task_type).transpose()?;
    let affected = service.pause_all_tasks(task_type).await?;
    Ok(Json(BulkResponseDto {
        success: true,
        affected,
    }))
}

/// 恢复全部已暂停任务
pub async fn resume_all_tasks(
    Extension(service): Extension<Arc<TaskService>>,
    Query(query): Query<BulkControlQuery>,
) -> Result<Json<BulkResponseDto>, AppError> {
    let task_type = query.task_type.as_deref().map(parse_task_type).transpose()?;
    let affected = service.resume_all_tasks(task_type).await?;
    Ok(Json(BulkResponseDto {
        success: true,
        affected,
    }))
}
