//! dbtctx Configuration Management
//!
//! Provides configuration loading with support for:
//! - Global config: `~/.dbtctx/config.toml`
//! - Local config: `.dbtctx/config.toml` (in the dbt project root)
//! - CLI overrides via `ConfigOverrides`
//!
//! Configuration is merged in order: global → local → CLI overrides.
//!
//! # Example TOML
//!
//! ```toml
//! [cache]
//! max_size = 500
//! ttl_minutes = 30
//!
//! [project]
//! schema_patterns = ["models/**/*.yml", "snapshots/*.yml"]
//! warehouse = "snowflake"
//!
//! [logging]
//! level = "debug"
//! format = "json"
//! ```

mod error;
mod loader;

pub use error::{ConfigError, FileOp};
pub use loader::ConfigLoader;

use dbtctx_core::WarehouseKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Log levels accepted by `logging.level`
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Root configuration for dbtctx.
///
/// Represents the fully merged configuration from all sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DbtCtxConfig {
    /// Parse cache configuration
    pub cache: CacheConfig,

    /// dbt project layout
    pub project: ProjectSettings,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Parse cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached documents
    pub max_size: usize,

    /// Entry lifetime in minutes
    pub ttl_minutes: u64,

    /// Minimum seconds between passive sweeps of expired entries
    pub cleanup_interval_secs: u64,

    /// Use the process-wide document cache
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 1000,
            ttl_minutes: 60,
            cleanup_interval_secs: 300,
            enabled: true,
        }
    }
}

/// Where the dbt project's documents live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSettings {
    /// Project document, relative to the project root
    pub project_path: PathBuf,

    /// Schema document patterns, relative to the project root.
    ///
    /// `**` matches any depth of directories, `*` matches within one path
    /// segment.
    pub schema_patterns: Vec<String>,

    /// Explicit warehouse kind, skipping inference
    pub warehouse: Option<String>,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            project_path: PathBuf::from("dbt_project.yml"),
            schema_patterns: vec!["models/**/*.yml".to_string()],
            warehouse: None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON structured logging
    Json,
}

/// CLI overrides for configuration values.
///
/// Used to apply command-line arguments over file-based config.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override warehouse kind
    pub warehouse: Option<String>,

    /// Override log level
    pub log_level: Option<String>,

    /// Override cache size
    pub cache_max_size: Option<usize>,

    /// Disable the document cache
    pub no_cache: bool,
}

impl DbtCtxConfig {
    /// Apply CLI overrides to this configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref warehouse) = overrides.warehouse {
            self.project.warehouse = Some(warehouse.clone());
        }

        if let Some(ref level) = overrides.log_level {
            self.logging.level = level.clone();
        }

        if let Some(max_size) = overrides.cache_max_size {
            self.cache.max_size = max_size;
        }

        if overrides.no_cache {
            self.cache.enabled = false;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.max_size == 0 {
            return Err(ConfigError::BelowMinimum {
                key: "cache.max_size",
                minimum: 1,
                found: 0,
            });
        }
        if self.cache.ttl_minutes == 0 {
            return Err(ConfigError::BelowMinimum {
                key: "cache.ttl_minutes",
                minimum: 1,
                found: 0,
            });
        }
        if self.project.schema_patterns.is_empty() {
            return Err(ConfigError::NoSchemaPatterns);
        }
        if let Some(ref warehouse) = self.project.warehouse {
            warehouse
                .parse::<WarehouseKind>()
                .map_err(|source| ConfigError::UnknownWarehouse {
                    value: warehouse.clone(),
                    source,
                })?;
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::UnknownLogLevel {
                level: self.logging.level.clone(),
            });
        }
        Ok(())
    }

    /// Explicit warehouse kind, if one is configured and recognized
    pub fn warehouse_kind(&self) -> Option<WarehouseKind> {
        self.project
            .warehouse
            .as_deref()
            .and_then(|w| w.parse().ok())
    }

    /// Get the project document path for a project root.
    pub fn project_file(&self, project_root: &Path) -> PathBuf {
        if self.project.project_path.is_absolute() {
            self.project.project_path.clone()
        } else {
            project_root.join(&self.project.project_path)
        }
    }
}
