#[cfg(test)]
mod tests {
    use parking_lot::{Mutex, MutexGuard};
    use std::time::Duration;
    use tempfile::TempDir;
    use test_context::{test_context, TestContext};
    use trackvault::libs::config::{Config, MonitorConfig, ServerConfig, SyncConfig, TenantConfig};
    use trackvault::libs::data_storage::DataStorage;

    // Tests in this binary share the process environment.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    struct ConfigTestContext {
        _guard: MutexGuard<'static, ()>,
        temp_dir: TempDir,
    }

    impl TestContext for ConfigTestContext {
        fn setup() -> Self {
            let guard = ENV_LOCK.lock();
            let temp_dir = tempfile::tempdir().unwrap();
            std::env::set_var("HOME", temp_dir.path());
            std::env::set_var("LOCALAPPDATA", temp_dir.path());
            ConfigTestContext { _guard: guard, temp_dir }
        }
    }

    #[test_context(ConfigTestContext)]
    #[test]
    fn test_read_nonexistent_config(_ctx: &mut ConfigTestContext) {
        let config = Config::read().unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.monitor_or_default(), MonitorConfig::default());
        assert_eq!(config.sync_or_default().batch_size, 50);
        assert!(config.active_server().is_none());
    }

    #[test_context(ConfigTestContext)]
    #[test]
    fn test_save_and_read_config(ctx: &mut ConfigTestContext) {
        let config = Config {
            monitor: Some(MonitorConfig {
                poll_interval: 1000,
                afk_threshold: 120,
                flush_interval: 30,
            }),
            sync: Some(SyncConfig {
                backoff_base: 10,
                backoff_max: 600,
                batch_size: 20,
            }),
            server: Some(ServerConfig {
                api_url: "https://api.example.com".to_string(),
                auth_token: "token123".to_string(),
            }),
            tenant: Some(TenantConfig {
                tenant_id: "tenant-1".to_string(),
                organization_id: "org-1".to_string(),
                employee_id: "emp-1".to_string(),
                remote_user_id: "user-1".to_string(),
            }),
        };
        config.save().unwrap();

        let path = DataStorage::new().get_path("config.json").unwrap();
        assert!(path.starts_with(ctx.temp_dir.path()));
        assert!(path.exists());

        let loaded = Config::read().unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.monitor_or_default().poll_interval(), Duration::from_millis(1000));
        assert_eq!(loaded.monitor_or_default().afk_threshold(), Duration::from_secs(120));
        assert!(loaded.tenant_or_default().is_complete());
        assert_eq!(loaded.active_server().unwrap().api_url, "https://api.example.com");
    }

    #[test_context(ConfigTestContext)]
    #[test]
    fn test_partial_sections_fall_back_to_defaults(_ctx: &mut ConfigTestContext) {
        let path = DataStorage::new().get_path("config.json").unwrap();
        std::fs::write(&path, r#"{ "monitor": { "afk_threshold": 60 }, "server": { "api_url": " ", "auth_token": "" } }"#).unwrap();

        let config = Config::read().unwrap();
        let monitor = config.monitor_or_default();
        assert_eq!(monitor.afk_threshold, 60);
        assert_eq!(monitor.poll_interval, 5000);
        assert!(config.active_server().is_none());
        assert!(!config.tenant_or_default().is_complete());
    }

    #[test_context(ConfigTestContext)]
    #[test]
    fn test_malformed_config_is_an_error(_ctx: &mut ConfigTestContext) {
        let path = DataStorage::new().get_path("config.json").unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        assert!(Config::read().is_err());
    }
}
