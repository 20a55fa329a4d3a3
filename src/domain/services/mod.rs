// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 定义领域层依赖的外部服务抽象：生成提供方及其配置来源
pub mod generation_provider;
