//! Configuration loader with inheritance support.
//!
//! Loads configuration from multiple sources and merges them:
//! 1. Global config: `~/.dbtctx/config.toml`
//! 2. Local config: `.dbtctx/config.toml` (in the project root)
//! 3. CLI overrides
//!
//! Later sources override earlier ones.

use crate::error::{ConfigError, FileOp};
use crate::{CacheConfig, ConfigOverrides, DbtCtxConfig, LoggingConfig, ProjectSettings};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Global and local configuration directory name.
const CONFIG_DIR: &str = ".dbtctx";

/// Configuration loader with caching and inheritance support.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Global config directory (e.g., `~/.dbtctx`)
    global_config_dir: Option<PathBuf>,

    /// Cached global config
    global_config: Option<DbtCtxConfig>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    ///
    /// Automatically detects the global config directory (`~/.dbtctx`).
    pub fn new() -> Self {
        Self {
            global_config_dir: dirs::home_dir().map(|h| h.join(CONFIG_DIR)),
            global_config: None,
        }
    }

    /// Create a loader with a custom global config directory.
    pub fn with_global_dir(global_dir: impl Into<PathBuf>) -> Self {
        Self {
            global_config_dir: Some(global_dir.into()),
            global_config: None,
        }
    }

    /// Get the global config file path.
    pub fn global_config_path(&self) -> Option<PathBuf> {
        self.global_config_dir
            .as_ref()
            .map(|d| d.join(CONFIG_FILE_NAME))
    }

    /// Get the local config file path for a project.
    pub fn local_config_path(&self, project_root: &Path) -> PathBuf {
        project_root.join(CONFIG_DIR).join(CONFIG_FILE_NAME)
    }

    /// Load configuration for a project with optional CLI overrides.
    ///
    /// Merges config in order: global → local → overrides.
    pub fn load(
        &mut self,
        project_root: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<DbtCtxConfig, ConfigError> {
        let mut config = DbtCtxConfig::default();

        if let Some(global_config) = self.load_global()? {
            config = merge_configs(config, global_config);
        }

        if let Some(local_config) = self.load_local(project_root)? {
            config = merge_configs(config, local_config);
        }

        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }

        Ok(config)
    }

    /// Load a single explicit configuration file, then apply overrides.
    pub fn load_file(
        &self,
        path: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<DbtCtxConfig, ConfigError> {
        debug!("Loading config from {:?}", path);
        let mut config = merge_configs(DbtCtxConfig::default(), load_config_file(path)?);
        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }
        Ok(config)
    }

    /// Load only the global configuration.
    pub fn load_global(&mut self) -> Result<Option<DbtCtxConfig>, ConfigError> {
        if let Some(ref config) = self.global_config {
            return Ok(Some(config.clone()));
        }

        let Some(global_path) = self.global_config_path() else {
            debug!("No home directory found, skipping global config");
            return Ok(None);
        };

        if !global_path.exists() {
            trace!("Global config not found at {:?}", global_path);
            return Ok(None);
        }

        debug!("Loading global config from {:?}", global_path);
        let config = load_config_file(&global_path)?;
        self.global_config = Some(config.clone());

        Ok(Some(config))
    }

    /// Load only the local configuration for a project.
    pub fn load_local(&self, project_root: &Path) -> Result<Option<DbtCtxConfig>, ConfigError> {
        let local_path = self.local_config_path(project_root);

        if !local_path.exists() {
            trace!("Local config not found at {:?}", local_path);
            return Ok(None);
        }

        debug!("Loading local config from {:?}", local_path);
        load_config_file(&local_path).map(Some)
    }

    /// Save configuration to the global config file.
    pub fn save_global(&self, config: &DbtCtxConfig) -> Result<(), ConfigError> {
        let Some(global_path) = self.global_config_path() else {
            return Err(ConfigError::NoHomeDir);
        };
        save_config_file(&global_path, config)
    }

    /// Save configuration to the local config file for a project.
    pub fn save_local(
        &self,
        project_root: &Path,
        config: &DbtCtxConfig,
    ) -> Result<(), ConfigError> {
        save_config_file(&self.local_config_path(project_root), config)
    }

    /// Create `~/.dbtctx/config.toml` with defaults unless it exists.
    pub fn init_global(&self) -> Result<PathBuf, ConfigError> {
        let Some(config_path) = self.global_config_path() else {
            return Err(ConfigError::NoHomeDir);
        };
        init_config_file(config_path)
    }

    /// Create `.dbtctx/config.toml` with defaults unless it exists.
    pub fn init_local(&self, project_root: &Path) -> Result<PathBuf, ConfigError> {
        init_config_file(self.local_config_path(project_root))
    }

    /// Clear cached global configuration.
    ///
    /// Forces reload on next `load_global()` call.
    pub fn clear_cache(&mut self) {
        self.global_config = None;
    }
}

fn init_config_file(config_path: PathBuf) -> Result<PathBuf, ConfigError> {
    if !config_path.exists() {
        save_config_file(&config_path, &DbtCtxConfig::default())?;
    }
    Ok(config_path)
}

/// Load a configuration file from disk.
fn load_config_file(path: &Path) -> Result<DbtCtxConfig, ConfigError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| ConfigError::io(FileOp::Read, path, e))?;

    toml::from_str(&content).map_err(|e| ConfigError::toml(path, e))
}

/// Save a configuration file to disk.
fn save_config_file(path: &Path, config: &DbtCtxConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::io(FileOp::CreateDir, parent, e))?;
        }
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::io(FileOp::Write, path, e))
}

/// Merge two configurations, with `overlay` taking precedence.
///
/// Overlay fields win when they differ from the default value, so partial
/// files only change what they mention.
fn merge_configs(base: DbtCtxConfig, overlay: DbtCtxConfig) -> DbtCtxConfig {
    DbtCtxConfig {
        cache: merge_cache(base.cache, overlay.cache),
        project: merge_project(base.project, overlay.project),
        logging: merge_logging(base.logging, overlay.logging),
    }
}

fn pick<T: PartialEq>(base: T, overlay: T, default: T) -> T {
    if overlay != default {
        overlay
    } else {
        base
    }
}

fn merge_cache(base: CacheConfig, overlay: CacheConfig) -> CacheConfig {
    let default = CacheConfig::default();
    CacheConfig {
        max_size: pick(base.max_size, overlay.max_size, default.max_size),
        ttl_minutes: pick(base.ttl_minutes, overlay.ttl_minutes, default.ttl_minutes),
        cleanup_interval_secs: pick(
            base.cleanup_interval_secs,
            overlay.cleanup_interval_secs,
            default.cleanup_interval_secs,
        ),
        enabled: pick(base.enabled, overlay.enabled, default.enabled),
    }
}

fn merge_project(base: ProjectSettings, overlay: ProjectSettings) -> ProjectSettings {
    let default = ProjectSettings::default();
    ProjectSettings {
        project_path: pick(base.project_path, overlay.project_path, default.project_path),
        // Patterns replace rather than extend
        schema_patterns: pick(
            base.schema_patterns,
            overlay.schema_patterns,
            default.schema_patterns,
        ),
        warehouse: overlay.warehouse.or(base.warehouse),
    }
}

fn merge_logging(base: LoggingConfig, overlay: LoggingConfig) -> LoggingConfig {
    let default = LoggingConfig::default();
    LoggingConfig {
        level: pick(base.level, overlay.level, default.level),
        format: pick(base.format, overlay.format, default.format),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogFormat;
    use tempfile::TempDir;

    fn create_local_config(content: &str, dir: &Path) -> PathBuf {
        let config_dir = dir.join(CONFIG_DIR);
        std::fs::create_dir_all(&config_dir).unwrap();
        let path = config_dir.join(CONFIG_FILE_NAME);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn create_global_config(content: &str, global_dir: &Path) {
        std::fs::create_dir_all(global_dir).unwrap();
        std::fs::write(global_dir.join(CONFIG_FILE_NAME), content).unwrap();
    }

    #[test]
    fn test_load_default_config() {
        let temp = TempDir::new().unwrap();
        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(config, DbtCtxConfig::default());
    }

    #[test]
    fn test_load_local_config() {
        let temp = TempDir::new().unwrap();
        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        create_local_config(
            r#"
            [cache]
            max_size = 50

            [project]
            schema_patterns = ["models/*.yml"]
            "#,
            temp.path(),
        );

        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(config.cache.max_size, 50);
        assert_eq!(config.project.schema_patterns, vec!["models/*.yml"]);
        assert_eq!(config.cache.ttl_minutes, 60);
    }

    #[test]
    fn test_local_overrides_global() {
        let temp = TempDir::new().unwrap();
        let global_dir = temp.path().join("global");

        create_global_config(
            r#"
            [logging]
            level = "debug"

            [project]
            warehouse = "snowflake"
            "#,
            &global_dir,
        );

        // Local overrides the warehouse but not the log level
        create_local_config(
            r#"
            [project]
            warehouse = "bigquery"
            "#,
            temp.path(),
        );

        let mut loader = ConfigLoader::with_global_dir(&global_dir);
        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(config.project.warehouse.as_deref(), Some("bigquery"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_cli_overrides_all() {
        let temp = TempDir::new().unwrap();

        create_local_config(
            r#"
            [project]
            warehouse = "postgres"

            [logging]
            format = "json"
            "#,
            temp.path(),
        );

        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let overrides = ConfigOverrides {
            warehouse: Some("duckdb".to_string()),
            log_level: Some("trace".to_string()),
            ..Default::default()
        };

        let config = loader.load(temp.path(), Some(&overrides)).unwrap();

        assert_eq!(config.project.warehouse.as_deref(), Some("duckdb"));
        assert_eq!(config.logging.level, "trace");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let temp = TempDir::new().unwrap();
        let path = create_local_config("[cache\nmax_size = ", temp.path());

        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let err = loader.load(temp.path(), None).unwrap_err();

        assert!(matches!(err, ConfigError::Toml { .. }));
        assert!(err.to_string().contains(&path.display().to_string()));
    }

    #[test]
    fn test_save_and_load_config() {
        let temp = TempDir::new().unwrap();
        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let mut config = DbtCtxConfig::default();
        config.cache.ttl_minutes = 15;
        config.logging.level = "warn".to_string();

        loader.save_local(temp.path(), &config).unwrap();

        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let loaded = loader.load(temp.path(), None).unwrap();

        assert_eq!(loaded.cache.ttl_minutes, 15);
        assert_eq!(loaded.logging.level, "warn");
    }

    #[test]
    fn test_load_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");
        std::fs::write(&path, "[cache]\nenabled = false\n").unwrap();

        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let config = loader.load_file(&path, None).unwrap();
        assert!(!config.cache.enabled);

        let missing = loader.load_file(&temp.path().join("missing.toml"), None);
        assert!(matches!(missing, Err(ConfigError::Io { op: FileOp::Read, .. })));
    }

    #[test]
    fn test_init_local_creates_config() {
        let temp = TempDir::new().unwrap();
        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let config_path = loader.init_local(temp.path()).unwrap();

        assert!(config_path.exists());
        assert!(config_path.ends_with(".dbtctx/config.toml"));

        let content = std::fs::read_to_string(&config_path).unwrap();
        let parsed: DbtCtxConfig = toml::from_str(&content).unwrap();
        assert_eq!(parsed, DbtCtxConfig::default());
    }

    #[test]
    fn test_init_does_not_overwrite() {
        let temp = TempDir::new().unwrap();
        let global_dir = temp.path().join("global");
        create_global_config("[cache]\nmax_size = 7\n", &global_dir);

        let loader = ConfigLoader::with_global_dir(&global_dir);
        let path = loader.init_global().unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("max_size = 7"));
    }

    #[test]
    fn test_cache_clearing() {
        let temp = TempDir::new().unwrap();
        let global_dir = temp.path().join("global");
        create_global_config("[logging]\nlevel = \"debug\"\n", &global_dir);

        let mut loader = ConfigLoader::with_global_dir(&global_dir);

        let _ = loader.load_global().unwrap();
        assert!(loader.global_config.is_some());

        loader.clear_cache();
        assert!(loader.global_config.is_none());
    }
}
