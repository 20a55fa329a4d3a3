// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 应用服务模块
///
/// 任务命令门面：入队、查询、汇总、单任务与批量控制、执行器状态
pub mod task_service;
