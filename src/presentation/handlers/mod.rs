// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// HTTP请求处理器模块
///
/// 包含各个API端点的具体处理逻辑
/// 每个处理器只做参数提取与响应组装，业务逻辑在任务服务中
pub mod executor_handler;
pub mod task_handler;
