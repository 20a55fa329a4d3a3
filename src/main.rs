// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use gentask::application::services::task_service::TaskService;
use gentask::config::settings::Settings;
use gentask::domain::repositories::task_repository::TaskRepository;
use gentask::infrastructure::database::connection;
use gentask::infrastructure::metrics;
use gentask::infrastructure::providers::http_provider::HttpGenerationProvider;
use gentask::infrastructure::providers::provider_config::LayeredProviderConfigSource;
use gentask::infrastructure::repositories::task_repo_impl::TaskRepositoryImpl;
use gentask::presentation::routes;
use gentask::queue::task_queue::StoreTaskQueue;
use gentask::utils::telemetry;
use gentask::workers::manager::WorkerManager;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration
    let settings = Settings::new()?;

    // 2. Initialize logging
    telemetry::init_telemetry(settings.telemetry.json);
    info!("Starting gentask...");
    info!("Configuration loaded");

    // Initialize Prometheus Metrics
    if settings.metrics.enabled {
        metrics::init_metrics(&settings.metrics.listen);
    }

    // 3. Connect to database
    let db = Arc::new(connection::connect_and_migrate(&settings.database).await?);
    info!("Database connection established");

    // 4. Initialize Components
    let repository: Arc<dyn TaskRepository> = Arc::new(TaskRepositoryImpl::new(db));
    let provider = Arc::new(HttpGenerationProvider::new());
    let provider_config = Arc::new(LayeredProviderConfigSource::new(
        settings.providers.config_path.clone(),
    ));

    // 5. Start Workers
    let mut worker_manager = WorkerManager::new(
        repository.clone(),
        provider,
        provider_config,
        &settings.workers,
        &settings.pools,
    );
    worker_manager.start();

    let service = Arc::new(TaskService::new(
        repository.clone(),
        Arc::new(StoreTaskQueue::new(repository)),
        worker_manager.registry(),
    ));

    // 6. Start HTTP server
    let app = routes::routes(service);
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    let shutdown = worker_manager.shutdown_token();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
    });

    worker_manager.wait_for_shutdown().await;

    match server.await {
        Ok(Ok(())) => info!("Server stopped"),
        Ok(Err(e)) => error!("Server error: {}", e),
        Err(e) => error!("Server task failed: {}", e),
    }

    Ok(())
}
