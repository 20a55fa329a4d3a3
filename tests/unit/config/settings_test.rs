// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 配置测试模块
///
/// 验证仓库自带的配置文件可以被加载并通过校验

#[cfg(test)]
mod tests {
    use gentask::config::settings::Settings;
    use gentask::domain::models::task::TaskType;
    use std::time::Duration;

    const CONFIG_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/config");

    #[test]
    fn test_shipped_default_configuration_loads() {
        let settings = Settings::load(CONFIG_DIR, "GENTASK_UNIT_SHIPPED").unwrap();

        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.database.max_connections, Some(10));
        assert_eq!(settings.workers.heartbeat_interval(), Duration::from_secs(5));
        assert!(settings.workers.lock_timeout() > settings.workers.heartbeat_interval());
        assert_eq!(settings.pools.concurrency(TaskType::Image), 2);
        assert_eq!(settings.pools.concurrency(TaskType::Video), 1);
        assert_eq!(settings.providers.config_path, "config/providers");
    }

    #[test]
    fn test_environment_overrides_file() {
        std::env::set_var("GENTASK_UNIT_ENV__SERVER__PORT", "8088");
        std::env::set_var("GENTASK_UNIT_ENV__POOLS__VIDEO__CONCURRENCY", "0");

        let settings = Settings::load(CONFIG_DIR, "GENTASK_UNIT_ENV").unwrap();

        assert_eq!(settings.server.port, 8088);
        assert_eq!(settings.pools.concurrency(TaskType::Video), 0);
        assert_eq!(settings.pools.concurrency(TaskType::Audio), 2);
    }
}
