// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::application::services::task_service::TaskService;
use crate::domain::models::executor::ExecutorStatusReport;
use axum::{Extension, Json};
use std::sync::Arc;

/// 执行器状态
pub async fn get_executor_status(
    Extension(service): Extension<Arc<TaskService>>,
) -> Json<ExecutorStatusReport> {
    Json(service.get_executor_status())
}
