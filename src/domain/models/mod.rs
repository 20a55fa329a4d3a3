// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - 任务（task）：一次生成工作及其生命周期状态机
/// - 执行器（executor）：执行器运行时快照与工作池汇总
/// - 汇总（summary）：按类型和状态统计的派生计数
pub mod executor;
pub mod summary;
pub mod task;
