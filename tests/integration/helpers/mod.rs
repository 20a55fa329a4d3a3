// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum_test::TestServer;
use gentask::application::services::task_service::TaskService;
use gentask::config::settings::{PoolEntry, PoolSettings, WorkerSettings};
use gentask::domain::models::task::{Task, TaskParams, TaskStatus, TaskType};
use gentask::domain::repositories::task_repository::TaskRepository;
use gentask::domain::services::generation_provider::ProviderConfig;
use gentask::infrastructure::providers::provider_config::StaticProviderConfigSource;
use gentask::infrastructure::repositories::task_repo_impl::TaskRepositoryImpl;
use gentask::presentation::routes;
use gentask::queue::task_queue::StoreTaskQueue;
use gentask::workers::manager::WorkerManager;
use gentask::workers::registry::ExecutorRegistry;
use migration::{Migrator, MigratorTrait};
use sea_orm::Database;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub mod mock_provider;

pub use mock_provider::ScriptedProvider;

#[allow(dead_code)]
pub struct TestApp {
    pub server: TestServer,
    pub repository: Arc<TaskRepositoryImpl>,
    pub provider: Arc<ScriptedProvider>,
    pub provider_config: Arc<StaticProviderConfigSource>,
    pub worker_manager: Option<WorkerManager>,
}

impl TestApp {
    /// 停止工作池并等待所有执行器退出
    pub async fn shutdown(&mut self) {
        if let Some(manager) = self.worker_manager.as_mut() {
            manager.shutdown().await;
        }
    }
}

pub fn worker_settings() -> WorkerSettings {
    WorkerSettings {
        poll_interval_ms: 20,
        heartbeat_interval_secs: 1,
        lock_timeout_secs: 3,
        monitor_interval_secs: 1,
        supervise_interval_secs: 1,
    }
}

pub fn pool_settings() -> PoolSettings {
    PoolSettings {
        image: PoolEntry { concurrency: 2 },
        video: PoolEntry { concurrency: 1 },
        audio: PoolEntry { concurrency: 1 },
    }
}

pub fn provider_config(task_type: TaskType) -> ProviderConfig {
    ProviderConfig {
        url: format!("https://{}.provider.test/generate", task_type),
        api_key: Some("test-key".to_string()),
        model: None,
    }
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with_options(true).await
}

pub async fn create_test_app_no_worker() -> TestApp {
    create_test_app_with_options(false).await
}

async fn create_test_app_with_options(start_worker: bool) -> TestApp {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    let repository = Arc::new(TaskRepositoryImpl::new(Arc::new(db)));
    let provider = Arc::new(ScriptedProvider::default());
    let provider_config = Arc::new(
        StaticProviderConfigSource::new()
            .with(TaskType::Image, provider_config(TaskType::Image))
            .with(TaskType::Video, provider_config(TaskType::Video))
            .with(TaskType::Audio, provider_config(TaskType::Audio)),
    );

    let (worker_manager, registry) = if start_worker {
        let mut manager = WorkerManager::new(
            repository.clone(),
            provider.clone(),
            provider_config.clone(),
            &worker_settings(),
            &pool_settings(),
        );
        manager.start();
        let registry = manager.registry();
        (Some(manager), registry)
    } else {
        (None, ExecutorRegistry::new())
    };

    let service = Arc::new(TaskService::new(
        repository.clone(),
        Arc::new(StoreTaskQueue::new(repository.clone())),
        registry,
    ));

    let server = TestServer::new(routes::routes(service)).expect("Failed to build test server");

    TestApp {
        server,
        repository,
        provider,
        provider_config,
        worker_manager,
    }
}

/// 图片任务请求体
pub fn image_request(prompt: &str) -> Value {
    json!({
        "params": {
            "kind": "image",
            "subtype": "text_to_image",
            "provider": "flux",
            "prompt": prompt,
            "aspect_ratio": "16:9"
        }
    })
}

/// 视频任务请求体
pub fn video_request(prompt: &str) -> Value {
    json!({
        "params": {
            "kind": "video",
            "subtype": "image_to_video",
            "provider": "kling",
            "prompt": prompt,
            "duration_seconds": 5
        }
    })
}

/// 音频任务请求体
pub fn audio_request(text: &str) -> Value {
    json!({
        "params": {
            "kind": "audio",
            "subtype": "tts",
            "provider": "voice",
            "text": text,
            "speed": 1.0
        },
        "shot_id": "shot-1",
        "dialogue_index": 0
    })
}

/// 通过接口创建任务并返回
pub async fn enqueue(app: &TestApp, body: Value) -> Task {
    let response = app.server.post("/v1/tasks").json(&body).await;
    response.assert_status(axum::http::StatusCode::CREATED);
    response.json::<Task>()
}

/// 直接写入仓库，用于构造接口无法直接产生的状态
pub async fn insert_task(app: &TestApp, params: TaskParams, status: TaskStatus) -> Task {
    let mut task = Task::new(params);
    task.status = status;
    app.repository
        .create(&task)
        .await
        .expect("Failed to insert task")
}

/// 轮询直到任务进入指定状态
pub async fn wait_for_status(
    app: &TestApp,
    task_id: Uuid,
    status: TaskStatus,
    timeout: Duration,
) -> Task {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let task = app
            .repository
            .find_by_id(task_id)
            .await
            .expect("Failed to read task")
            .expect("Task disappeared");
        if task.status == status {
            return task;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!(
                "task {} stayed in {} while waiting for {}",
                task_id, task.status, status
            );
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
