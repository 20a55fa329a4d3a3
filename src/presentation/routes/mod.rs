// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::application::services::task_service::TaskService;
use crate::presentation::handlers::{executor_handler, task_handler};
use axum::{
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// 创建应用路由
///
/// # 参数
///
/// * `service` - 任务服务，所有处理器共享
///
/// # 返回值
///
/// 返回配置好的路由
pub fn routes(service: Arc<TaskService>) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/v1/version", get(version));

    let task_routes = Router::new()
        .route(
            "/v1/tasks",
            post(task_handler::enqueue_task).get(task_handler::list_tasks),
        )
        .route("/v1/tasks/summary", get(task_handler::get_task_summary))
        .route("/v1/tasks/poll", post(task_handler::poll_tasks))
        .route("/v1/tasks/pause_all", post(task_handler::pause_all_tasks))
        .route("/v1/tasks/resume_all", post(task_handler::resume_all_tasks))
        .route("/v1/tasks/{id}", get(task_handler::get_task))
        .route(
            "/v1/tasks/{task_type}/{task_id}/pause",
            post(task_handler::pause_task),
        )
        .route(
            "/v1/tasks/{task_type}/{task_id}/resume",
            post(task_handler::resume_task),
        )
        .route(
            "/v1/tasks/{task_type}/{task_id}/cancel",
            post(task_handler::cancel_task),
        )
        .route(
            "/v1/tasks/{task_type}/{task_id}/retry",
            post(task_handler::retry_task),
        )
        .route("/v1/executors", get(executor_handler::get_executor_status));

    Router::new()
        .merge(public_routes)
        .merge(task_routes)
        .layer(Extension(service))
        .layer(TraceLayer::new_for_http())
}

/// 健康检查端点
///
/// # 返回值
///
/// 返回"OK"字符串
pub async fn health_check() -> &'static str {
    "OK"
}

/// 版本信息端点
///
/// # 返回值
///
/// 返回应用版本号
pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
