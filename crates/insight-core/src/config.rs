//! Configuration management for Insight services.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`INSIGHT__` prefix, `__` between sections,
//!    e.g. `INSIGHT__NEO4J__URI`)
//! 2. Config file (`insight.toml`, or the prefix passed to [`InsightConfig::load`])
//! 3. Defaults

use std::time::Duration;

use serde::Deserialize;

use crate::error::InsightError;
use crate::types::{EntityKind, HopLimit};

/// Top-level Insight configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct InsightConfig {
    #[serde(default)]
    pub neo4j: GraphConfig,

    #[serde(default)]
    pub lifecycle: LifecycleSettings,

    #[serde(default)]
    pub paths: PathSettings,

    /// Fallback log filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Configuration for connecting to Neo4j.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_uri")]
    pub uri: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_password")]
    pub password: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
}

/// Startup retry and health-check settings for the connection manager.
#[derive(Debug, Clone, Deserialize)]
pub struct LifecycleSettings {
    /// Connection attempts before giving up (fixed delay between attempts).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    #[serde(default = "default_health_check_timeout_secs")]
    pub health_check_timeout_secs: u64,
}

/// Path search defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct PathSettings {
    #[serde(default)]
    pub default_max_hops: HopLimit,

    /// Label of the nodes a domain contains, used as cross-product members.
    #[serde(default = "default_member_kind")]
    pub member_kind: EntityKind,

    /// Label the pairwise path search matches member names against.
    #[serde(default = "default_path_kind")]
    pub path_kind: EntityKind,

    /// Maximum pairwise path queries in flight during domain aggregation.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl InsightConfig {
    /// Load configuration from `<file_prefix>.{toml,yaml,json}` (optional)
    /// overlaid with `INSIGHT__` environment variables.
    pub fn load(file_prefix: &str) -> Result<Self, InsightError> {
        let cfg = ::config::Config::builder()
            .add_source(::config::File::with_name(file_prefix).required(false))
            .add_source(
                ::config::Environment::with_prefix("INSIGHT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let loaded: InsightConfig = cfg.try_deserialize()?;
        loaded.validate()?;
        tracing::debug!(uri = %loaded.neo4j.uri, "Configuration loaded");
        Ok(loaded)
    }

    fn validate(&self) -> Result<(), InsightError> {
        if self.lifecycle.max_attempts == 0 {
            return Err(InsightError::InvalidConfig(
                "lifecycle.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.paths.max_concurrency == 0 {
            return Err(InsightError::InvalidConfig(
                "paths.max_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl LifecycleSettings {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_secs(self.health_check_timeout_secs)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_user() -> String {
    "neo4j".to_string()
}

fn default_password() -> String {
    "password".to_string()
}

fn default_max_connections() -> u32 {
    16
}

fn default_fetch_size() -> usize {
    256
}

fn default_max_attempts() -> u32 {
    5
}

fn default_retry_delay_secs() -> u64 {
    5
}

fn default_health_check_timeout_secs() -> u64 {
    5
}

fn default_member_kind() -> EntityKind {
    EntityKind::Metric
}

fn default_path_kind() -> EntityKind {
    EntityKind::Dashboard
}

fn default_max_concurrency() -> usize {
    8
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            neo4j: GraphConfig::default(),
            lifecycle: LifecycleSettings::default(),
            paths: PathSettings::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            user: default_user(),
            password: default_password(),
            max_connections: default_max_connections(),
            fetch_size: default_fetch_size(),
        }
    }
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
            health_check_timeout_secs: default_health_check_timeout_secs(),
        }
    }
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            default_max_hops: HopLimit::DEFAULT,
            member_kind: default_member_kind(),
            path_kind: default_path_kind(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_from(contents: &str) -> Result<InsightConfig, InsightError> {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("insight.toml"), contents).unwrap();
        let prefix = dir.path().join("insight");
        InsightConfig::load(prefix.to_str().unwrap())
    }

    #[test]
    fn test_default_config() {
        let config = InsightConfig::default();
        assert_eq!(config.neo4j.uri, "bolt://localhost:7687");
        assert_eq!(config.lifecycle.max_attempts, 5);
        assert_eq!(config.lifecycle.retry_delay(), Duration::from_secs(5));
        assert_eq!(config.paths.default_max_hops.get(), 5);
        assert_eq!(config.paths.member_kind, EntityKind::Metric);
        assert_eq!(config.paths.path_kind, EntityKind::Dashboard);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let config = load_from(
            r#"
            log_level = "debug"

            [neo4j]
            uri = "bolt://graph.internal:7687"

            [paths]
            default_max_hops = 3
            path_kind = "metric"
            "#,
        )
        .unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.neo4j.uri, "bolt://graph.internal:7687");
        assert_eq!(config.neo4j.user, "neo4j");
        assert_eq!(config.paths.default_max_hops.get(), 3);
        assert_eq!(config.paths.path_kind, EntityKind::Metric);
        assert_eq!(config.lifecycle.max_attempts, 5);
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let err = load_from("[lifecycle]\nmax_attempts = 0\n").unwrap_err();
        assert!(matches!(err, InsightError::InvalidConfig(_)));
    }

    #[test]
    fn test_hop_limit_out_of_range_rejected() {
        assert!(load_from("[paths]\ndefault_max_hops = 40\n").is_err());
    }
}
