// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 提供按任务类型划分的执行器池、心跳锁监控和工作器管理
/// 包括任务执行、工作器生命周期管理和并发控制
pub mod executor;
pub mod lock_monitor;
pub mod manager;
pub mod pool;
pub mod registry;
pub mod worker;

pub use worker::Worker;
