// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::executor::{ExecutorSnapshot, ExecutorStatusReport, PoolSummary};
use crate::domain::models::task::{Task, TaskType};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// 单个执行器的运行时状态
///
/// 由执行循环写入，由状态查询读取。执行器重启后沿用同一个实例，
/// 因此计数器在重启之间累积。
#[derive(Debug)]
pub struct ExecutorState {
    worker_id: String,
    task_type: TaskType,
    heartbeat_interval: Duration,
    lock_timeout: Duration,
    running: AtomicBool,
    alive: AtomicBool,
    current_task: RwLock<Option<Task>>,
    last_heartbeat_at: RwLock<Option<DateTime<Utc>>>,
    tasks_succeeded: AtomicU64,
    tasks_failed: AtomicU64,
}

impl ExecutorState {
    pub fn new(
        worker_id: impl Into<String>,
        task_type: TaskType,
        heartbeat_interval: Duration,
        lock_timeout: Duration,
    ) -> Self {
        Self {
            worker_id: worker_id.into(),
            task_type,
            heartbeat_interval,
            lock_timeout,
            running: AtomicBool::new(false),
            alive: AtomicBool::new(false),
            current_task: RwLock::new(None),
            last_heartbeat_at: RwLock::new(None),
            tasks_succeeded: AtomicU64::new(0),
            tasks_failed: AtomicU64::new(0),
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    pub fn task_type(&self) -> TaskType {
        self.task_type
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn current_task(&self) -> Option<Task> {
        self.current_task.read().clone()
    }

    /// 认领成功后记录当前任务
    pub fn begin(&self, task: Task) {
        *self.last_heartbeat_at.write() = task.heartbeat_at;
        *self.current_task.write() = Some(task);
    }

    pub fn record_heartbeat(&self, at: DateTime<Utc>) {
        *self.last_heartbeat_at.write() = Some(at);
        if let Some(task) = self.current_task.write().as_mut() {
            task.heartbeat_at = Some(at);
        }
    }

    /// 清空当前任务；`outcome` 为 `Some(true)` 计为成功，`Some(false)` 计为失败
    pub fn finish(&self, outcome: Option<bool>) {
        *self.current_task.write() = None;
        match outcome {
            Some(true) => {
                self.tasks_succeeded.fetch_add(1, Ordering::SeqCst);
            }
            Some(false) => {
                self.tasks_failed.fetch_add(1, Ordering::SeqCst);
            }
            None => {}
        }
    }

    pub fn snapshot(&self) -> ExecutorSnapshot {
        let current_task = self.current_task();
        ExecutorSnapshot {
            worker_id: self.worker_id.clone(),
            task_type: self.task_type,
            running: self.is_running(),
            thread_alive: self.is_alive(),
            current_task_id: current_task.as_ref().map(|t| t.id),
            current_task,
            heartbeat_interval_secs: self.heartbeat_interval.as_secs(),
            lock_timeout_secs: self.lock_timeout.as_secs(),
            last_heartbeat_at: *self.last_heartbeat_at.read(),
            tasks_succeeded: self.tasks_succeeded.load(Ordering::SeqCst),
            tasks_failed: self.tasks_failed.load(Ordering::SeqCst),
        }
    }
}

/// 存活标记
///
/// 执行循环持有期间标记为存活；循环返回或 panic 展开时自动清除，
/// 并丢弃当前任务的记录（由锁监控负责把任务收尾）。
pub struct AliveGuard {
    state: Arc<ExecutorState>,
}

impl AliveGuard {
    pub fn new(state: Arc<ExecutorState>) -> Self {
        state.alive.store(true, Ordering::SeqCst);
        Self { state }
    }
}

impl Drop for AliveGuard {
    fn drop(&mut self) {
        self.state.alive.store(false, Ordering::SeqCst);
        self.state.running.store(false, Ordering::SeqCst);
        *self.state.current_task.write() = None;
    }
}

/// 执行器注册表
///
/// 所有工作池共享，供状态查询使用。
#[derive(Debug, Clone, Default)]
pub struct ExecutorRegistry {
    executors: Arc<DashMap<String, Arc<ExecutorState>>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, state: Arc<ExecutorState>) {
        self.executors.insert(state.worker_id.clone(), state);
    }

    pub fn get(&self, worker_id: &str) -> Option<Arc<ExecutorState>> {
        self.executors.get(worker_id).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, worker_id: &str) {
        self.executors.remove(worker_id);
    }

    pub fn snapshots(&self) -> Vec<ExecutorSnapshot> {
        self.executors
            .iter()
            .map(|entry| entry.value().snapshot())
            .collect()
    }

    pub fn snapshots_for(&self, task_type: TaskType) -> Vec<ExecutorSnapshot> {
        self.executors
            .iter()
            .filter(|entry| entry.value().task_type == task_type)
            .map(|entry| entry.value().snapshot())
            .collect()
    }

    pub fn pool_summary(&self, task_type: TaskType) -> PoolSummary {
        let snapshots = self.snapshots_for(task_type);
        PoolSummary {
            total: snapshots.len(),
            busy: snapshots.iter().filter(|s| s.is_busy()).count(),
        }
    }

    pub fn status_report(&self) -> ExecutorStatusReport {
        ExecutorStatusReport::from_snapshots(self.snapshots())
    }
}
