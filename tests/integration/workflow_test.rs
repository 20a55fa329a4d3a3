// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 启动真实工作池，通过 HTTP 接口驱动任务完整生命周期

use crate::integration::helpers::{
    audio_request, create_test_app, enqueue, image_request, insert_task, provider_config,
    video_request, wait_for_status,
};
use chrono::Utc;
use gentask::application::dto::task_request::{CommandResponseDto, PollTasksResponseDto};
use gentask::domain::models::executor::ExecutorStatusReport;
use gentask::domain::models::task::{ImageParams, Task, TaskParams, TaskStatus, TaskType};
use gentask::domain::repositories::task_repository::TaskRepository;
use gentask::workers::executor::EXECUTOR_SHUTDOWN_ERROR;
use gentask::workers::lock_monitor::HEARTBEAT_LOST_ERROR;
use serde_json::json;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_enqueued_task_runs_to_success() {
    let mut app = create_test_app().await;

    let task = enqueue(&app, image_request("a lighthouse")).await;
    let done = wait_for_status(&app, task.id, TaskStatus::Success, WAIT).await;

    assert_eq!(
        done.result_url,
        Some(format!("https://cdn.example.com/{}.bin", task.id))
    );
    assert!(done.worker_id.is_none());
    assert!(done.error.is_none());
    assert!(done.started_at.is_some());
    assert!(done.completed_at.is_some());

    let calls = app.provider.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0], (task.id, provider_config(TaskType::Image).url));

    // 结果可通过批量查询读取
    let polled = app
        .server
        .post("/v1/tasks/poll")
        .json(&json!({"task_ids": [task.id]}))
        .await
        .json::<PollTasksResponseDto>();
    assert_eq!(polled.tasks[&task.id].status, TaskStatus::Success);

    app.shutdown().await;
}

#[tokio::test]
async fn test_each_type_is_served_by_its_own_pool() {
    let mut app = create_test_app().await;

    let image = enqueue(&app, image_request("forest")).await;
    let video = enqueue(&app, video_request("river")).await;
    let audio = enqueue(&app, audio_request("hello there")).await;

    for task in [&image, &video, &audio] {
        wait_for_status(&app, task.id, TaskStatus::Success, WAIT).await;
    }

    let report = app
        .server
        .get("/v1/executors")
        .await
        .json::<ExecutorStatusReport>();
    let succeeded = |task_type: TaskType| -> u64 {
        report
            .executors
            .iter()
            .filter(|e| e.task_type == task_type)
            .map(|e| e.tasks_succeeded)
            .sum()
    };
    assert_eq!(succeeded(TaskType::Image), 1);
    assert_eq!(succeeded(TaskType::Video), 1);
    assert_eq!(succeeded(TaskType::Audio), 1);

    app.shutdown().await;
}

#[tokio::test]
async fn test_failed_task_is_retried_by_hand_only() {
    let mut app = create_test_app().await;

    let task = enqueue(&app, image_request("please fail")).await;
    let failed = wait_for_status(&app, task.id, TaskStatus::Failed, WAIT).await;
    assert!(failed.error.as_deref().unwrap().contains("content policy"));
    assert!(failed.worker_id.is_none());

    // 失败后不会自动重试
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(app.provider.calls().len(), 1);

    let retried = app
        .server
        .post(&format!("/v1/tasks/image/{}/retry", task.id))
        .await
        .json::<CommandResponseDto>();
    assert!(retried.success);

    let failed_again = wait_for_status(&app, task.id, TaskStatus::Failed, WAIT).await;
    assert_eq!(failed_again.retry_count, 1);
    assert_eq!(app.provider.calls().len(), 2);

    app.shutdown().await;
}

#[tokio::test]
async fn test_paused_task_waits_until_resumed() {
    let mut app = create_test_app().await;

    let params = TaskParams::Image(ImageParams {
        subtype: "text_to_image".to_string(),
        provider: "flux".to_string(),
        prompt: "on hold".to_string(),
        ..Default::default()
    });
    let task = insert_task(&app, params, TaskStatus::Paused).await;

    tokio::time::sleep(Duration::from_millis(300)).await;
    let still_paused = app
        .server
        .get(&format!("/v1/tasks/{}", task.id))
        .await
        .json::<Task>();
    assert_eq!(still_paused.status, TaskStatus::Paused);
    assert!(app.provider.calls().is_empty());

    let resumed = app
        .server
        .post(&format!("/v1/tasks/image/{}/resume", task.id))
        .await
        .json::<CommandResponseDto>();
    assert!(resumed.success);

    wait_for_status(&app, task.id, TaskStatus::Success, WAIT).await;

    app.shutdown().await;
}

#[tokio::test]
async fn test_task_exceeding_timeout_fails() {
    let mut app = create_test_app().await;

    let mut body = video_request("slow pan");
    body["timeout_seconds"] = json!(1);
    let task = enqueue(&app, body).await;

    let failed = wait_for_status(&app, task.id, TaskStatus::Failed, WAIT).await;
    assert_eq!(failed.error.as_deref(), Some("task timed out after 1s"));
    assert!(failed.result_url.is_none());

    app.shutdown().await;
}

#[tokio::test]
async fn test_provider_config_is_read_for_every_task() {
    let mut app = create_test_app().await;
    app.provider_config.remove(TaskType::Audio);

    let task = enqueue(&app, audio_request("line one")).await;
    let failed = wait_for_status(&app, task.id, TaskStatus::Failed, WAIT).await;
    assert_eq!(
        failed.error.as_deref(),
        Some("No provider configured for audio tasks")
    );
    assert!(app.provider.calls().is_empty());

    app.provider_config
        .set(TaskType::Audio, provider_config(TaskType::Audio));
    app.server
        .post(&format!("/v1/tasks/audio/{}/retry", task.id))
        .await
        .assert_status_ok();

    wait_for_status(&app, task.id, TaskStatus::Success, WAIT).await;
    assert_eq!(app.provider.calls().len(), 1);

    app.shutdown().await;
}

#[tokio::test]
async fn test_abandoned_running_task_is_failed_and_can_be_retried() {
    let mut app = create_test_app().await;

    // 模拟已退出的进程留下的运行中任务
    let mut task = Task::new(TaskParams::Image(ImageParams {
        subtype: "text_to_image".to_string(),
        provider: "flux".to_string(),
        prompt: "orphan".to_string(),
        ..Default::default()
    }));
    task.status = TaskStatus::Running;
    task.worker_id = Some("image-9".to_string());
    task.started_at = Some(Utc::now() - chrono::Duration::minutes(2));
    task.heartbeat_at = Some(Utc::now() - chrono::Duration::minutes(1));
    app.repository.create(&task).await.unwrap();

    let failed = wait_for_status(&app, task.id, TaskStatus::Failed, WAIT).await;
    assert_eq!(failed.error.as_deref(), Some(HEARTBEAT_LOST_ERROR));
    assert!(failed.worker_id.is_none());

    app.server
        .post(&format!("/v1/tasks/image/{}/retry", task.id))
        .await
        .assert_status_ok();
    let done = wait_for_status(&app, task.id, TaskStatus::Success, WAIT).await;
    assert_eq!(done.retry_count, 1);

    app.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_fails_in_flight_tasks() {
    let mut app = create_test_app().await;

    let task = enqueue(&app, image_request("slow render")).await;
    wait_for_status(&app, task.id, TaskStatus::Running, WAIT).await;

    app.shutdown().await;

    let stored = app.repository.find_by_id(task.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Failed);
    assert_eq!(stored.error.as_deref(), Some(EXECUTOR_SHUTDOWN_ERROR));

    let report = app
        .server
        .get("/v1/executors")
        .await
        .json::<ExecutorStatusReport>();
    assert!(report.executors.iter().all(|e| !e.thread_alive));
    assert!(report.executors.iter().all(|e| !e.running));
}
