// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::integration::helpers::{
    audio_request, create_test_app_no_worker, enqueue, image_request, insert_task, video_request,
};
use axum::http::StatusCode;
use gentask::application::dto::task_request::{
    BulkResponseDto, CommandResponseDto, PollTasksResponseDto, TaskPageDto,
};
use gentask::domain::models::summary::TaskSummary;
use gentask::domain::models::task::{ImageParams, Task, TaskParams, TaskStatus, TaskType};
use serde_json::json;
use uuid::Uuid;

fn image_params(prompt: &str) -> TaskParams {
    TaskParams::Image(ImageParams {
        subtype: "text_to_image".to_string(),
        provider: "flux".to_string(),
        prompt: prompt.to_string(),
        ..Default::default()
    })
}

#[tokio::test]
async fn test_health_and_version() {
    let app = create_test_app_no_worker().await;

    let response = app.server.get("/health").await;
    response.assert_status_ok();
    response.assert_text("OK");

    let response = app.server.get("/v1/version").await;
    response.assert_status_ok();
    response.assert_text(env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_enqueue_creates_pending_task() {
    let app = create_test_app_no_worker().await;

    let mut body = audio_request("welcome back");
    body["priority"] = json!(7);
    body["timeout_seconds"] = json!(120);
    let task = enqueue(&app, body).await;

    assert_eq!(task.task_type, TaskType::Audio);
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.priority, 7);
    assert_eq!(task.timeout_seconds, Some(120));
    assert_eq!(task.target.shot_id.as_deref(), Some("shot-1"));
    assert_eq!(task.target.dialogue_index, Some(0));
    assert!(task.worker_id.is_none());

    let fetched = app
        .server
        .get(&format!("/v1/tasks/{}", task.id))
        .await
        .json::<Task>();
    assert_eq!(fetched, task);
}

#[tokio::test]
async fn test_enqueue_rejects_invalid_params() {
    let app = create_test_app_no_worker().await;

    let response = app.server.post("/v1/tasks").json(&image_request("")).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<serde_json::Value>();
    assert!(body["error"].as_str().unwrap().contains("prompt cannot be empty"));

    let mut body = audio_request("hello");
    body["params"]["speed"] = json!(9.0);
    app.server
        .post("/v1/tasks")
        .json(&body)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    // 未知的 kind 无法反序列化
    let response = app
        .server
        .post("/v1/tasks")
        .json(&json!({"params": {"kind": "music", "prompt": "jazz"}}))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_get_unknown_task_is_not_found() {
    let app = create_test_app_no_worker().await;

    app.server
        .get(&format!("/v1/tasks/{}", Uuid::new_v4()))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_filters_and_pages_newest_first() {
    let app = create_test_app_no_worker().await;

    let first = enqueue(&app, image_request("one")).await;
    let video = enqueue(&app, video_request("two")).await;
    let third = enqueue(&app, image_request("three")).await;

    let page = app.server.get("/v1/tasks").await.json::<TaskPageDto>();
    assert_eq!(page.total, 3);
    assert!(!page.has_more);
    let ids: Vec<Uuid> = page.tasks.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![third.id, video.id, first.id]);

    let page = app
        .server
        .get("/v1/tasks")
        .add_query_param("task_type", "image")
        .add_query_param("limit", 1)
        .await
        .json::<TaskPageDto>();
    assert_eq!(page.total, 2);
    assert_eq!(page.limit, 1);
    assert!(page.has_more);
    assert_eq!(page.tasks[0].id, third.id);

    let page = app
        .server
        .get("/v1/tasks")
        .add_query_param("task_type", "image")
        .add_query_param("offset", 1)
        .add_query_param("limit", 1)
        .await
        .json::<TaskPageDto>();
    assert!(!page.has_more);
    assert_eq!(page.tasks[0].id, first.id);

    let page = app
        .server
        .get("/v1/tasks")
        .add_query_param("status", "paused")
        .await
        .json::<TaskPageDto>();
    assert_eq!(page.total, 0);
    assert!(page.tasks.is_empty());
}

#[tokio::test]
async fn test_list_rejects_unknown_filters() {
    let app = create_test_app_no_worker().await;

    app.server
        .get("/v1/tasks")
        .add_query_param("status", "active")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    app.server
        .get("/v1/tasks")
        .add_query_param("task_type", "music")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    app.server
        .get("/v1/tasks")
        .add_query_param("limit", 0)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_offset_past_storage_range() {
    let app = create_test_app_no_worker().await;
    enqueue(&app, image_request("one")).await;

    let response = app
        .server
        .get("/v1/tasks")
        .add_query_param("offset", u64::MAX)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(response.json::<serde_json::Value>()["error"].is_string());

    let page = app
        .server
        .get("/v1/tasks")
        .add_query_param("offset", i64::MAX)
        .await
        .json::<TaskPageDto>();
    assert_eq!(page.total, 1);
    assert!(page.tasks.is_empty());
    assert!(!page.has_more);
}

#[tokio::test]
async fn test_malformed_task_id_is_json_error() {
    let app = create_test_app_no_worker().await;

    let response = app.server.get("/v1/tasks/not-a-uuid").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(response.json::<serde_json::Value>()["error"].is_string());

    let response = app.server.post("/v1/tasks/image/not-a-uuid/cancel").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(response.json::<serde_json::Value>()["error"].is_string());
}

#[tokio::test]
async fn test_summary_counts_by_type_and_status() {
    let app = create_test_app_no_worker().await;

    enqueue(&app, image_request("a")).await;
    enqueue(&app, image_request("b")).await;
    enqueue(&app, video_request("c")).await;
    insert_task(&app, image_params("d"), TaskStatus::Failed).await;

    let summary = app
        .server
        .get("/v1/tasks/summary")
        .await
        .json::<TaskSummary>();

    assert_eq!(summary.image.pending, 2);
    assert_eq!(summary.image.failed, 1);
    assert_eq!(summary.video.pending, 1);
    assert_eq!(summary.audio.total(), 0);
    assert_eq!(summary.total.pending, 3);
    assert_eq!(summary.total.total(), 4);
}

#[tokio::test]
async fn test_poll_returns_only_known_tasks() {
    let app = create_test_app_no_worker().await;

    let a = enqueue(&app, image_request("a")).await;
    let b = enqueue(&app, audio_request("b")).await;
    let missing = Uuid::new_v4();

    let response = app
        .server
        .post("/v1/tasks/poll")
        .json(&json!({"task_ids": [a.id, b.id, missing]}))
        .await;
    response.assert_status_ok();
    let polled = response.json::<PollTasksResponseDto>();

    assert_eq!(polled.tasks.len(), 2);
    assert_eq!(polled.tasks[&a.id].task_type, TaskType::Image);
    assert_eq!(polled.tasks[&b.id].task_type, TaskType::Audio);
    assert!(!polled.tasks.contains_key(&missing));

    let empty = app
        .server
        .post("/v1/tasks/poll")
        .json(&json!({"task_ids": []}))
        .await
        .json::<PollTasksResponseDto>();
    assert!(empty.tasks.is_empty());
}

#[tokio::test]
async fn test_pause_resume_cancel_retry_cycle() {
    let app = create_test_app_no_worker().await;
    let task = enqueue(&app, image_request("castle")).await;
    let base = format!("/v1/tasks/image/{}", task.id);

    let paused = app
        .server
        .post(&format!("{}/pause", base))
        .await
        .json::<CommandResponseDto>();
    assert!(paused.success);
    assert_eq!(paused.task.unwrap().status, TaskStatus::Paused);

    // 重复暂停不生效，但不是错误
    let again = app
        .server
        .post(&format!("{}/pause", base))
        .await
        .json::<CommandResponseDto>();
    assert!(!again.success);
    assert_eq!(again.task.unwrap().status, TaskStatus::Paused);

    let resumed = app
        .server
        .post(&format!("{}/resume", base))
        .await
        .json::<CommandResponseDto>();
    assert!(resumed.success);
    assert_eq!(resumed.task.unwrap().status, TaskStatus::Pending);

    let cancelled = app
        .server
        .post(&format!("{}/cancel", base))
        .await
        .json::<CommandResponseDto>();
    assert!(cancelled.success);
    let cancelled = cancelled.task.unwrap();
    assert_eq!(cancelled.status, TaskStatus::Cancelled);
    assert!(cancelled.completed_at.is_none());

    let retried = app
        .server
        .post(&format!("{}/retry", base))
        .await
        .json::<CommandResponseDto>();
    assert!(retried.success);
    let retried = retried.task.unwrap();
    assert_eq!(retried.status, TaskStatus::Pending);
    assert_eq!(retried.retry_count, 1);
    assert!(retried.completed_at.is_none());
}

#[tokio::test]
async fn test_running_task_cannot_be_paused_or_cancelled() {
    let app = create_test_app_no_worker().await;
    let task = insert_task(&app, image_params("busy"), TaskStatus::Running).await;
    let base = format!("/v1/tasks/image/{}", task.id);

    for command in ["pause", "cancel", "resume", "retry"] {
        let response = app
            .server
            .post(&format!("{}/{}", base, command))
            .await
            .json::<CommandResponseDto>();
        assert!(!response.success, "{} should not apply", command);
        assert_eq!(response.task.unwrap().status, TaskStatus::Running);
    }
}

#[tokio::test]
async fn test_commands_check_type_and_existence() {
    let app = create_test_app_no_worker().await;
    let task = enqueue(&app, image_request("castle")).await;

    // 类型不匹配视为不存在
    app.server
        .post(&format!("/v1/tasks/video/{}/pause", task.id))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    app.server
        .post(&format!("/v1/tasks/image/{}/pause", Uuid::new_v4()))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    app.server
        .post(&format!("/v1/tasks/music/{}/pause", task.id))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let stored = app
        .server
        .get(&format!("/v1/tasks/{}", task.id))
        .await
        .json::<Task>();
    assert_eq!(stored.status, TaskStatus::Pending);
}

#[tokio::test]
async fn test_pause_all_and_resume_all_by_type() {
    let app = create_test_app_no_worker().await;

    let image_a = enqueue(&app, image_request("a")).await;
    let image_b = enqueue(&app, image_request("b")).await;
    let video = enqueue(&app, video_request("c")).await;
    insert_task(&app, image_params("done"), TaskStatus::Success).await;

    let paused = app
        .server
        .post("/v1/tasks/pause_all")
        .add_query_param("task_type", "image")
        .await
        .json::<BulkResponseDto>();
    assert!(paused.success);
    assert_eq!(paused.affected, 2);

    let summary = app
        .server
        .get("/v1/tasks/summary")
        .await
        .json::<TaskSummary>();
    assert_eq!(summary.image.paused, 2);
    assert_eq!(summary.image.success, 1);
    assert_eq!(summary.video.pending, 1);

    let paused = app
        .server
        .post("/v1/tasks/pause_all")
        .await
        .json::<BulkResponseDto>();
    assert_eq!(paused.affected, 1);

    let resumed = app
        .server
        .post("/v1/tasks/resume_all")
        .await
        .json::<BulkResponseDto>();
    assert_eq!(resumed.affected, 3);

    for id in [image_a.id, image_b.id, video.id] {
        let task = app
            .server
            .get(&format!("/v1/tasks/{}", id))
            .await
            .json::<Task>();
        assert_eq!(task.status, TaskStatus::Pending);
    }

    app.server
        .post("/v1/tasks/pause_all")
        .add_query_param("task_type", "music")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}
