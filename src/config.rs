use crate::core::FeedOptions;
use crate::services::AppwriteStorage;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub feed: FeedSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub appwrite: Option<AppwriteSettings>,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedSettings {
    #[serde(default)]
    pub resolve_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default)]
    pub cancel_stale_tasks: bool,
    #[serde(default)]
    pub max_concurrent_resolutions: Option<usize>,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            resolve_retries: 0,
            retry_backoff_ms: default_retry_backoff_ms(),
            cancel_stale_tasks: false,
            max_concurrent_resolutions: None,
        }
    }
}

impl FeedSettings {
    pub fn options(&self) -> FeedOptions {
        FeedOptions {
            resolve_retries: self.resolve_retries,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
            cancel_stale_tasks: self.cancel_stale_tasks,
            max_concurrent_resolutions: self.max_concurrent_resolutions,
        }
    }
}

fn default_retry_backoff_ms() -> u64 { 250 }

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_l1_cache_size")]
    pub l1_cache_size: u64,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            l1_cache_size: default_l1_cache_size(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

fn default_true() -> bool { true }
fn default_l1_cache_size() -> u64 { 1000 }
fn default_ttl_secs() -> u64 { 300 }

#[derive(Debug, Clone, Deserialize)]
pub struct AppwriteSettings {
    pub endpoint: String,
    pub api_key: String,
    pub project_id: String,
    pub bucket_id: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 { 30 }

impl AppwriteSettings {
    pub fn storage(&self) -> AppwriteStorage {
        AppwriteStorage {
            endpoint: self.endpoint.clone(),
            api_key: self.api_key.clone(),
            project_id: self.project_id.clone(),
            bucket_id: self.bucket_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with LUME__)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., LUME__FEED__RESOLVE_RETRIES -> feed.resolve_retries
            .add_source(
                Environment::with_prefix("LUME")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = substitute_env_vars(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("LUME")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

/// Apply Appwrite credentials from `LUME_APPWRITE__*` variables
///
/// Keeps API keys out of config files; a variable only overrides the matching
/// key when it is set.
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let overrides = [
        ("LUME_APPWRITE__ENDPOINT", "appwrite.endpoint"),
        ("LUME_APPWRITE__API_KEY", "appwrite.api_key"),
        ("LUME_APPWRITE__PROJECT_ID", "appwrite.project_id"),
        ("LUME_APPWRITE__BUCKET_ID", "appwrite.bucket_id"),
    ];

    let mut builder = Config::builder().add_source(settings);
    for (var, key) in overrides {
        if let Ok(value) = env::var(var) {
            builder = builder.set_override(key, value)?;
        }
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_feed_settings() {
        let options = FeedSettings::default().options();
        assert_eq!(options.resolve_retries, 0);
        assert_eq!(options.retry_backoff, Duration::from_millis(250));
        assert!(!options.cancel_stale_tasks);
        assert!(options.max_concurrent_resolutions.is_none());
    }

    #[test]
    fn test_default_logging() {
        let level = default_log_level();
        let format = default_log_format();
        assert_eq!(level, "info");
        assert_eq!(format, "json");
    }

    #[test]
    fn test_empty_document_is_valid() {
        let settings: Settings = toml::from_str("").unwrap();
        assert!(settings.cache.enabled);
        assert_eq!(settings.cache.l1_cache_size, 1000);
        assert!(settings.appwrite.is_none());
    }

    #[test]
    fn test_shipped_defaults_do_not_retry() {
        let settings: Settings = toml::from_str(include_str!("../config/default.toml")).unwrap();
        assert_eq!(settings.feed.resolve_retries, 0);
        assert!(!settings.feed.cancel_stale_tasks);
        assert_eq!(settings.logging.format, "pretty");
    }

    #[test]
    fn test_partial_document() {
        let settings: Settings = toml::from_str(
            r#"
            [feed]
            resolve_retries = 3
            max_concurrent_resolutions = 4

            [appwrite]
            endpoint = "https://appwrite.test/v1"
            api_key = "key"
            project_id = "lume"
            bucket_id = "pictures"
            "#,
        )
        .unwrap();

        assert_eq!(settings.feed.resolve_retries, 3);
        assert_eq!(settings.feed.retry_backoff_ms, 250);
        assert_eq!(settings.feed.max_concurrent_resolutions, Some(4));
        let appwrite = settings.appwrite.unwrap();
        assert_eq!(appwrite.timeout_secs, 30);
        assert_eq!(appwrite.storage().bucket_id, "pictures");
    }
}
