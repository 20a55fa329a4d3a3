// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 生成提供方模块
///
/// - HTTP 提供方（http_provider）：通过 reqwest 调用远程生成服务
/// - 配置来源（provider_config）：每次调用时读取的提供方凭据与模型
pub mod http_provider;
pub mod provider_config;
