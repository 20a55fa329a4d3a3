// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::integration::helpers::{create_test_app, create_test_app_no_worker};
use gentask::domain::models::executor::ExecutorStatusReport;
use gentask::domain::models::task::TaskType;
use std::time::Duration;

#[tokio::test]
async fn test_executor_status_without_pools() {
    let app = create_test_app_no_worker().await;

    let report = app
        .server
        .get("/v1/executors")
        .await
        .json::<ExecutorStatusReport>();

    assert!(report.executors.is_empty());
    for task_type in TaskType::ALL {
        assert_eq!(report.summary[&task_type].total, 0);
        assert_eq!(report.summary[&task_type].busy, 0);
    }
}

#[tokio::test]
async fn test_executor_status_lists_every_pool_member() {
    let mut app = create_test_app().await;

    // 执行循环在后台任务中启动
    let mut report = app
        .server
        .get("/v1/executors")
        .await
        .json::<ExecutorStatusReport>();
    for _ in 0..50 {
        if report.executors.iter().all(|e| e.running && e.thread_alive) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        report = app
            .server
            .get("/v1/executors")
            .await
            .json::<ExecutorStatusReport>();
    }

    let ids: Vec<&str> = report
        .executors
        .iter()
        .map(|e| e.worker_id.as_str())
        .collect();
    assert_eq!(ids, vec!["image-0", "image-1", "video-0", "audio-0"]);
    assert_eq!(report.summary[&TaskType::Image].total, 2);
    assert_eq!(report.summary[&TaskType::Video].total, 1);
    assert_eq!(report.summary[&TaskType::Audio].total, 1);

    for executor in &report.executors {
        assert_eq!(executor.heartbeat_interval_secs, 1);
        assert_eq!(executor.lock_timeout_secs, 3);
        assert!(executor.running);
        assert!(executor.thread_alive);
    }

    app.shutdown().await;
}
