// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 队列模块
///
/// 在任务仓库的 CAS 原语之上实现认领协议：
/// 选出候选任务、条件转换为运行中、竞争失败则重新选择
pub mod task_queue;
