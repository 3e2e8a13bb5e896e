use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::core::MatchmakerConfig;
use crate::models::{MatchPolicy, ProgrammingLanguage};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub publisher: PublisherSettings,
    #[serde(default)]
    pub notifier: NotifierSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseSettings {
    /// Requests are kept in memory when unset
    pub url: Option<String>,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublisherSettings {
    /// Matches are only logged when unset
    pub redis_url: Option<String>,
    #[serde(default = "default_channel")]
    pub channel: String,
}

impl Default for PublisherSettings {
    fn default() -> Self {
        Self {
            redis_url: None,
            channel: default_channel(),
        }
    }
}

fn default_channel() -> String { "match.results".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct NotifierSettings {
    /// Notifications are only logged when unset
    pub endpoint: Option<String>,
    #[serde(default = "default_notifier_timeout")]
    pub timeout_secs: u64,
}

impl Default for NotifierSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: default_notifier_timeout(),
        }
    }
}

fn default_notifier_timeout() -> u64 { 5 }

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub fallback_language: ProgrammingLanguage,
    #[serde(default)]
    pub require_difficulty_overlap: bool,
    #[serde(default)]
    pub require_category_overlap: bool,
    #[serde(default = "default_resolved_ttl_secs")]
    pub resolved_ttl_secs: u64,
    #[serde(default = "default_resolved_capacity")]
    pub resolved_capacity: u64,
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            fallback_language: ProgrammingLanguage::default(),
            require_difficulty_overlap: false,
            require_category_overlap: false,
            resolved_ttl_secs: default_resolved_ttl_secs(),
            resolved_capacity: default_resolved_capacity(),
            stale_after_secs: default_stale_after_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 { 30 }
fn default_resolved_ttl_secs() -> u64 { 600 }
fn default_resolved_capacity() -> u64 { 100_000 }
fn default_stale_after_secs() -> u64 { 3600 }

impl MatchingSettings {
    pub fn policy(&self) -> MatchPolicy {
        MatchPolicy {
            fallback_language: self.fallback_language,
            require_difficulty_overlap: self.require_difficulty_overlap,
            require_category_overlap: self.require_category_overlap,
        }
    }

    pub fn matchmaker_config(&self) -> MatchmakerConfig {
        MatchmakerConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            policy: self.policy(),
            resolved_ttl: Duration::from_secs(self.resolved_ttl_secs),
            resolved_capacity: self.resolved_capacity,
            stale_after: Duration::from_secs(self.stale_after_secs),
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
    /// 4. Environment variables (prefixed with PAIRUP__)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., PAIRUP__MATCHING__TIMEOUT_SECS -> matching.timeout_secs
            .add_source(
                Environment::with_prefix("PAIRUP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = apply_url_overrides(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("PAIRUP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

/// Conventional connection URL variables win over file values
fn apply_url_overrides(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    if let Ok(database_url) = env::var("DATABASE_URL") {
        builder = builder.set_override("database.url", database_url)?;
    }
    if let Ok(redis_url) = env::var("REDIS_URL") {
        builder = builder.set_override("publisher.redis_url", redis_url)?;
    }

    builder.build()
}
