// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// 该模块包含系统的技术实现细节，负责与外部系统交互：
/// - 数据库（database）：连接池、迁移与实体映射
/// - 指标（metrics）：Prometheus 指标导出
/// - 提供方（providers）：HTTP 生成提供方与实时配置来源
/// - 仓库实现（repositories）：领域仓库接口的 SeaORM 实现
///
/// 基础设施层依赖于领域层的抽象接口，领域层不感知具体技术。
pub mod database;
pub mod metrics;
pub mod providers;
pub mod repositories;
