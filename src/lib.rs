// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 应用程序模块
///
/// 任务服务与请求/响应 DTO
pub mod application;

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 任务实体、状态机、仓库与提供方接口
pub mod domain;

/// 基础设施模块
///
/// 数据库、指标与生成提供方的具体实现
pub mod infrastructure;

/// 表示层模块
///
/// 处理HTTP请求和响应，包括路由和处理器
pub mod presentation;

/// 队列模块
///
/// 基于任务仓库的入队与认领
pub mod queue;

/// 工具模块
pub mod utils;

/// 工作器模块
///
/// 工作池、执行器、锁监控与工作管理器
pub mod workers;
