//! Configuration loading from TOML with environment variable overrides.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. Every
//! section is optional and falls back to defaults. The page URL and check
//! interval may also come from the environment (`URL`, `INTERVAL_TIME` in
//! minutes), which take precedence over the file. Secrets (SMTP
//! credentials, bot tokens, webhook URLs) are referenced by env-var name
//! and resolved at runtime.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::extract::PageLayout;
use crate::storage::json::DEFAULT_STATE_FILE;
use crate::storage::sqlite::DEFAULT_DATABASE_URL;
use crate::types::ConfigError;

/// Hard ceiling on the page fetch timeout, so a hung fetch cannot stall
/// the scheduler.
pub const MAX_FETCH_TIMEOUT_SECS: u64 = 60;

/// Longest accepted check interval (one week).
pub const MAX_INTERVAL_MINS: u64 = 7 * 24 * 60;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub monitor: MonitorConfig,
    pub page: PageLayout,
    pub store: StoreConfig,
    pub notify: NotifyConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    /// Page to watch.
    pub url: String,
    /// Site name used in notification texts.
    pub site_name: String,
    pub fetch_timeout_secs: u64,
    /// Minutes between checks in `watch` mode.
    pub interval_mins: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            site_name: "EstrobBet".to_string(),
            fetch_timeout_secs: 30,
            interval_mins: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Json,
    Sqlite,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub json_path: String,
    pub sqlite_url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Json,
            json_path: DEFAULT_STATE_FILE.to_string(),
            sqlite_url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotifyBackend {
    #[default]
    Log,
    Email,
    Telegram,
    Webhook,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct NotifyConfig {
    pub backend: NotifyBackend,
    /// SMTP service name (`gmail`, `outlook`, ...) or relay host.
    pub email_service_env: String,
    /// SMTP login, also used as the sender address.
    pub email_user_env: String,
    pub email_password_env: String,
    /// Comma-separated recipient list.
    pub email_recipients_env: String,
    pub telegram_bot_token_env: String,
    pub telegram_chat_id_env: String,
    pub webhook_url_env: String,
    pub timeout_secs: u64,
    /// Send an error message when a fetch or extraction fails.
    pub alert_on_error: bool,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            backend: NotifyBackend::Log,
            email_service_env: "EMAIL_SERVICE".to_string(),
            email_user_env: "EMAIL_USER".to_string(),
            email_password_env: "EMAIL_PASSWORD".to_string(),
            email_recipients_env: "EMAIL_RECIPIENTS".to_string(),
            telegram_bot_token_env: "TELEGRAM_BOT_TOKEN".to_string(),
            telegram_chat_id_env: "TELEGRAM_CHAT_ID".to_string(),
            webhook_url_env: "NOTIFY_WEBHOOK_URL".to_string(),
            timeout_secs: 10,
            alert_on_error: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Load from `path` if it exists, otherwise start from defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            info!(path, "No config file found, using defaults and environment");
            Ok(Self::default())
        }
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Invalid TOML configuration")
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("URL").filter(|u| !u.trim().is_empty()) {
            self.monitor.url = url.trim().to_string();
        }
        if let Some(mins) = lookup("INTERVAL_TIME") {
            self.monitor.interval_mins =
                mins.trim().parse().map_err(|_| ConfigError::Invalid {
                    key: "INTERVAL_TIME".to_string(),
                    message: format!("expected whole minutes, got {mins:?}"),
                })?;
        }
        if let Some(path) = lookup("FREEBET_STORE_PATH").filter(|p| !p.trim().is_empty()) {
            self.store.json_path = path;
        }
        if let Some(url) = lookup("FREEBET_DATABASE_URL").filter(|u| !u.trim().is_empty()) {
            self.store.sqlite_url = url;
        }
        Ok(())
    }

    /// Check the settings every run depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.monitor.url.trim().is_empty() {
            return Err(ConfigError::Missing("monitor.url (or URL)".to_string()));
        }
        if !self.monitor.url.starts_with("http://") && !self.monitor.url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                key: "monitor.url".to_string(),
                message: format!("not an http(s) URL: {}", self.monitor.url),
            });
        }
        if self.monitor.fetch_timeout_secs == 0
            || self.monitor.fetch_timeout_secs > MAX_FETCH_TIMEOUT_SECS
        {
            return Err(ConfigError::Invalid {
                key: "monitor.fetch_timeout_secs".to_string(),
                message: format!("must be between 1 and {MAX_FETCH_TIMEOUT_SECS}"),
            });
        }
        if self.monitor.interval_mins == 0 || self.monitor.interval_mins > MAX_INTERVAL_MINS {
            return Err(ConfigError::Invalid {
                key: "monitor.interval_mins".to_string(),
                message: format!("must be between 1 and {MAX_INTERVAL_MINS}"),
            });
        }
        if self.notify.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "notify.timeout_secs".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.monitor.fetch_timeout_secs)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.monitor.interval_mins.saturating_mul(60))
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r##"
        [monitor]
        url = "https://tips.example.com/free-bet"
        fetch_timeout_secs = 20
        interval_mins = 15

        [page]
        v_tab = "#V-tab-2"

        [store]
        backend = "sqlite"
        sqlite_url = "sqlite://watch.db"

        [notify]
        backend = "telegram"
        alert_on_error = true
    "##;

    fn valid() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.monitor.url = "https://tips.example.com".to_string();
        cfg
    }

    #[test]
    fn test_parse_sample() {
        let cfg = AppConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(cfg.monitor.url, "https://tips.example.com/free-bet");
        assert_eq!(cfg.fetch_timeout(), Duration::from_secs(20));
        assert_eq!(cfg.check_interval(), Duration::from_secs(15 * 60));
        assert_eq!(cfg.page.v_tab, "#V-tab-2");
        assert_eq!(cfg.page.free_bet_tab, "#free-bet-of-the-day-tab");
        assert_eq!(cfg.store.backend, StoreBackend::Sqlite);
        assert_eq!(cfg.store.json_path, DEFAULT_STATE_FILE);
        assert_eq!(cfg.notify.backend, NotifyBackend::Telegram);
        assert!(cfg.notify.alert_on_error);
        assert_eq!(cfg.notify.telegram_bot_token_env, "TELEGRAM_BOT_TOKEN");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let cfg = AppConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.store.backend, StoreBackend::Json);
        assert_eq!(cfg.notify.backend, NotifyBackend::Log);
        assert_eq!(cfg.monitor.fetch_timeout_secs, 30);
    }

    #[test]
    fn test_email_backend_defaults() {
        let cfg = AppConfig::from_toml_str("[notify]\nbackend = \"email\"").unwrap();
        assert_eq!(cfg.notify.backend, NotifyBackend::Email);
        assert_eq!(cfg.notify.email_service_env, "EMAIL_SERVICE");
        assert_eq!(cfg.notify.email_user_env, "EMAIL_USER");
        assert_eq!(cfg.notify.email_password_env, "EMAIL_PASSWORD");
        assert_eq!(cfg.notify.email_recipients_env, "EMAIL_RECIPIENTS");
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let err = AppConfig::from_toml_str("[store]\nbackend = \"appwrite\"");
        assert!(err.is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("URL", " https://env.example.com "),
            ("INTERVAL_TIME", "5"),
            ("FREEBET_STORE_PATH", "/var/lib/freebet/state.json"),
        ]
        .into_iter()
        .collect();

        let mut cfg = AppConfig::from_toml_str(SAMPLE).unwrap();
        cfg.apply_overrides_from(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(cfg.monitor.url, "https://env.example.com");
        assert_eq!(cfg.monitor.interval_mins, 5);
        assert_eq!(cfg.store.json_path, "/var/lib/freebet/state.json");
        assert_eq!(cfg.store.sqlite_url, "sqlite://watch.db");
    }

    #[test]
    fn test_bad_interval_override() {
        let mut cfg = valid();
        let err = cfg
            .apply_overrides_from(|k| (k == "INTERVAL_TIME").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_missing_url_rejected() {
        let cfg = AppConfig::default();
        assert!(matches!(cfg.validate(), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn test_non_http_url_rejected() {
        let mut cfg = valid();
        cfg.monitor.url = "ftp://tips.example.com".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_timeout_bounds() {
        let mut cfg = valid();
        cfg.monitor.fetch_timeout_secs = 0;
        assert!(cfg.validate().is_err());
        cfg.monitor.fetch_timeout_secs = MAX_FETCH_TIMEOUT_SECS + 1;
        assert!(cfg.validate().is_err());
        cfg.monitor.fetch_timeout_secs = MAX_FETCH_TIMEOUT_SECS;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_interval_bounds() {
        let mut cfg = valid();
        cfg.monitor.interval_mins = 0;
        assert!(cfg.validate().is_err());
        cfg.monitor.interval_mins = MAX_INTERVAL_MINS;
        assert!(cfg.validate().is_ok());
        cfg.monitor.interval_mins = MAX_INTERVAL_MINS + 1;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_huge_interval_override_is_rejected_not_panicking() {
        let mut cfg = valid();
        cfg.apply_overrides_from(|k| {
            (k == "INTERVAL_TIME").then(|| "400000000000000000".to_string())
        })
        .unwrap();
        assert!(cfg.validate().is_err());
        assert_eq!(cfg.check_interval(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let cfg = AppConfig::load_or_default("/nonexistent/freebet/config.toml").unwrap();
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_load_config_file() {
        // Requires config.toml in the working directory; skipped otherwise.
        if let Ok(cfg) = AppConfig::load("config.toml") {
            assert!(cfg.monitor.fetch_timeout_secs <= MAX_FETCH_TIMEOUT_SECS);
            assert!(!cfg.page.free_bet_tab.is_empty());
        }
    }
}
