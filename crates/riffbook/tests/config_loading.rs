//! Integration tests for configuration loading.
//!
//! Uses figment::Jail for sandboxed files and env vars.

use std::path::PathBuf;

use figment::Jail;
use riffbook::config::DEFAULT_APP_ID;
use riffbook::{Config, Error};

#[test]
fn loads_sections_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[storage]
database_path = "/data/riffbook/tracker.db"
poll_interval_ms = 500

[user]
id = "u-1"
email = "dime@example.com"

[export]
directory = "exports"
"#,
        )?;

        let config = Config::load_from(Some(PathBuf::from("config.toml"))).expect("config loads");
        assert_eq!(
            config.database_path(),
            PathBuf::from("/data/riffbook/tracker.db")
        );
        assert_eq!(config.storage.poll_interval_ms, 500);
        assert_eq!(config.storage.app_id, DEFAULT_APP_ID);
        assert_eq!(config.user.id, "u-1");
        assert_eq!(config.user.email, "dime@example.com");
        assert_eq!(config.export_dir(), PathBuf::from("exports"));
        Ok(())
    });
}

#[test]
fn env_overrides_file_values() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "[user]\nid = \"from-file\"\n")?;
        jail.set_env("RIFFBOOK_USER__ID", "from-env");
        jail.set_env("RIFFBOOK_STORAGE__APP_ID", "other-app");

        let config = Config::load_from(Some(PathBuf::from("config.toml"))).expect("config loads");
        assert_eq!(config.user.id, "from-env");
        assert_eq!(config.storage.app_id, "other-app");
        Ok(())
    });
}

#[test]
fn invalid_values_fail_validation() {
    Jail::expect_with(|jail| {
        jail.set_env("RIFFBOOK_STORAGE__POLL_INTERVAL_MS", "0");

        let result = Config::load_from(Some(PathBuf::from("missing.toml")));
        assert!(matches!(result, Err(Error::ConfigValidation { .. })));
        Ok(())
    });
}

#[test]
fn malformed_file_fails_to_load() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "[storage]\npoll_interval_ms = \"soon\"\n")?;

        let result = Config::load_from(Some(PathBuf::from("config.toml")));
        assert!(matches!(result, Err(Error::ConfigLoad(_))));
        Ok(())
    });
}
