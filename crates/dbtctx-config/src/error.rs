//! Errors raised while reading, writing and checking dbtctx configuration.

use std::fmt;
use std::path::PathBuf;

use dbtctx_core::ParseError;
use thiserror::Error;

use crate::LOG_LEVELS;

/// Filesystem step that failed on a config path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOp {
    Read,
    Write,
    CreateDir,
}

impl fmt::Display for FileOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FileOp::Read => "read",
            FileOp::Write => "write",
            FileOp::CreateDir => "create directory",
        })
    }
}

/// Configuration errors.
///
/// File errors carry the path involved. Validation errors name the
/// dotted config key they reject, see [`ConfigError::key`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not {op} '{path}': {source}")]
    Io {
        op: FileOp,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{path}' is not a valid dbtctx config: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// No home directory, so there is no global config location
    #[error("could not determine home directory")]
    NoHomeDir,

    /// A numeric setting below its floor (`cache.max_size`, `cache.ttl_minutes`)
    #[error("{key} must be at least {minimum}, got {found}")]
    BelowMinimum {
        key: &'static str,
        minimum: u64,
        found: u64,
    },

    #[error("project.schema_patterns is empty, so no schema documents would load")]
    NoSchemaPatterns,

    #[error("project.warehouse '{value}' is not a supported warehouse")]
    UnknownWarehouse {
        value: String,
        #[source]
        source: ParseError,
    },

    #[error("logging.level '{level}' is not one of: {}", LOG_LEVELS.join(", "))]
    UnknownLogLevel { level: String },
}

impl ConfigError {
    pub fn io(op: FileOp, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    pub fn toml(path: impl Into<PathBuf>, source: toml::de::Error) -> Self {
        Self::Toml {
            path: path.into(),
            source,
        }
    }

    /// Dotted config key a validation error rejects
    pub fn key(&self) -> Option<&'static str> {
        match self {
            Self::BelowMinimum { key, .. } => Some(*key),
            Self::NoSchemaPatterns => Some("project.schema_patterns"),
            Self::UnknownWarehouse { .. } => Some("project.warehouse"),
            Self::UnknownLogLevel { .. } => Some("logging.level"),
            Self::Io { .. } | Self::Toml { .. } | Self::Serialize(_) | Self::NoHomeDir => None,
        }
    }
}
