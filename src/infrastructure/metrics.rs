// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::TaskType;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{info, warn};

/// 初始化指标导出
///
/// 安装 Prometheus 记录器并在 `listen` 上提供抓取端点。
/// 未调用时所有指标宏都是空操作。
pub fn init_metrics(listen: &str) {
    let addr: SocketAddr = match listen.parse() {
        Ok(addr) => addr,
        Err(e) => {
            warn!("Invalid metrics listen address {}: {}", listen, e);
            return;
        }
    };

    // 端口被占用时仅告警，不影响任务处理
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        warn!(
            "Failed to install Prometheus recorder: {}. This might happen if the port is already in use.",
            e
        );
        return;
    }

    describe_counter!("gentask_tasks_enqueued_total", "Tasks created through the command surface");
    describe_counter!("gentask_tasks_claimed_total", "Successful pending -> running claims");
    describe_counter!(
        "gentask_tasks_finished_total",
        "Tasks that left running, labelled by outcome"
    );
    describe_counter!(
        "gentask_heartbeat_lost_total",
        "Running tasks failed by the lock monitor"
    );
    describe_histogram!(
        "gentask_task_duration_seconds",
        "Wall-clock time of the provider call"
    );
    describe_gauge!("gentask_executors_busy", "Executors currently holding a claim");

    info!("Metrics exporter listening on {}", addr);
}

pub fn record_enqueued(task_type: TaskType) {
    counter!("gentask_tasks_enqueued_total", "task_type" => task_type.as_str()).increment(1);
}

pub fn record_claimed(task_type: TaskType) {
    counter!("gentask_tasks_claimed_total", "task_type" => task_type.as_str()).increment(1);
    gauge!("gentask_executors_busy", "task_type" => task_type.as_str()).increment(1.0);
}

/// 记录一次执行结束，`outcome` 为 success / failed / timeout / lost
pub fn record_finished(task_type: TaskType, outcome: &'static str, elapsed: Duration) {
    counter!(
        "gentask_tasks_finished_total",
        "task_type" => task_type.as_str(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("gentask_task_duration_seconds", "task_type" => task_type.as_str())
        .record(elapsed.as_secs_f64());
    gauge!("gentask_executors_busy", "task_type" => task_type.as_str()).decrement(1.0);
}

pub fn record_heartbeat_lost(task_type: TaskType) {
    counter!("gentask_heartbeat_lost_total", "task_type" => task_type.as_str()).increment(1);
}
