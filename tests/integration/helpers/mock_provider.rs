// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use gentask::domain::models::task::{Task, TaskParams};
use gentask::domain::services::generation_provider::{
    GenerationOutput, GenerationProvider, ProviderConfig, ProviderError,
};
use parking_lot::Mutex;
use std::time::Duration;
use uuid::Uuid;

/// 按提示词决定行为的提供方
///
/// * 含 `fail`：返回提供方错误
/// * 含 `slow`：等待两秒后成功
/// * 其余：立即成功，结果地址包含任务ID
#[derive(Default)]
pub struct ScriptedProvider {
    calls: Mutex<Vec<(Uuid, String)>>,
}

impl ScriptedProvider {
    /// 已收到的调用：(任务ID, 配置中的地址)
    pub fn calls(&self) -> Vec<(Uuid, String)> {
        self.calls.lock().clone()
    }
}

fn prompt_of(task: &Task) -> &str {
    match &task.params {
        TaskParams::Image(p) => &p.prompt,
        TaskParams::Video(p) => &p.prompt,
        TaskParams::Audio(p) => &p.text,
    }
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    async fn generate(
        &self,
        task: &Task,
        config: &ProviderConfig,
    ) -> Result<GenerationOutput, ProviderError> {
        self.calls.lock().push((task.id, config.url.clone()));

        let prompt = prompt_of(task);
        if prompt.contains("fail") {
            return Err(ProviderError::Rejected("content policy".to_string()));
        }
        if prompt.contains("slow") {
            tokio::time::sleep(Duration::from_secs(2)).await;
        }

        Ok(GenerationOutput {
            result_url: Some(format!("https://cdn.example.com/{}.bin", task.id)),
            result_local_path: None,
        })
    }
}
