//! CLI command implementations
//!
//! This module contains all dbtctx CLI command implementations and the
//! shared project-loading helpers they build on.

pub mod column;
pub mod config;
pub mod context;
pub mod lineage;
pub mod model;
pub mod models;
pub mod search;
pub mod stats;
pub mod tags;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::ValueEnum;
use dbtctx_config::{ConfigLoader, DbtCtxConfig};
use dbtctx_core::{global_document_cache, CacheSettings, Model, ProjectLoader, SyncOutcome};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::GlobalOptions;

/// Output format shared by query commands
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

/// Load configuration, honoring `--config` and CLI overrides, and validate it.
pub fn load_config(global: &GlobalOptions) -> Result<DbtCtxConfig> {
    let mut loader = ConfigLoader::new();
    let overrides = global.to_config_overrides();

    let config = match global.config {
        Some(ref config_path) => loader
            .load_file(config_path, Some(&overrides))
            .with_context(|| format!("Failed to load config file {}", config_path.display()))?,
        None => loader
            .load(&global.project_dir, Some(&overrides))
            .context("Failed to load configuration")?,
    };

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Cache settings for the core crate
pub fn cache_settings(config: &DbtCtxConfig) -> CacheSettings {
    CacheSettings::from_minutes(config.cache.max_size, config.cache.ttl_minutes)
        .with_cleanup_interval(Duration::from_secs(config.cache.cleanup_interval_secs))
}

/// Read the project and schema documents from disk and build the registry.
///
/// Unreadable schema files are skipped with a warning; an unreadable or
/// malformed project document is an error.
pub fn load_project(global: &GlobalOptions, config: &DbtCtxConfig) -> Result<SyncOutcome> {
    let root = &global.project_dir;
    let project_file = config.project_file(root);
    let project_text = std::fs::read_to_string(&project_file)
        .with_context(|| format!("Failed to read {}", project_file.display()))?;

    let mut documents = Vec::new();
    for path in discover_schema_files(root, &config.project.schema_patterns)? {
        let label = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .display()
            .to_string();
        match std::fs::read_to_string(&path) {
            Ok(text) => documents.push((label, text)),
            Err(e) => warn!(document = %label, error = %e, "Skipping unreadable schema file"),
        }
    }
    debug!(documents = documents.len(), "Discovered schema documents");

    let cache = config
        .cache
        .enabled
        .then(|| global_document_cache(cache_settings(config)));
    let loader = ProjectLoader::new(cache).with_warehouse(config.warehouse_kind());

    let outcome = loader
        .load(&project_text, documents)
        .with_context(|| format!("Failed to parse {}", project_file.display()))?;

    if !outcome.report.is_clean() {
        print_warning(
            &format!(
                "{} schema document(s) could not be parsed",
                outcome.report.failures.len()
            ),
            global.quiet,
        );
    }

    Ok(outcome)
}

/// Look up a model or fail with a readable error
pub fn require_model<'a>(outcome: &'a SyncOutcome, name: &str) -> Result<&'a Model> {
    outcome
        .registry
        .get_model(name)
        .ok_or_else(|| anyhow::anyhow!("Model '{}' not found", name))
}

// ============================================================================
// Schema File Discovery
// ============================================================================

/// Compile schema patterns into one glob set.
///
/// `*` stays within a path segment while `**` spans directories.
pub fn build_schema_glob_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern.trim_start_matches("./"))
            .literal_separator(true)
            .build()
            .with_context(|| format!("Invalid schema pattern '{}'", pattern))?;
        builder.add(glob);
    }
    builder.build().context("Failed to compile schema patterns")
}

/// Find files under `root` whose relative path matches a schema pattern.
///
/// Results are sorted and each file appears once.
pub fn discover_schema_files(root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let glob_set = build_schema_glob_set(patterns)?;
    if glob_set.is_empty() {
        return Ok(Vec::new());
    }

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .strip_prefix(root)
                .is_ok_and(|relative| glob_set.is_match(relative))
        })
        .map(|e| e.into_path())
        .collect();

    files.sort();
    Ok(files)
}

// ============================================================================
// Output Helpers
// ============================================================================

/// Print an info message to stderr (respects quiet flag).
pub fn print_info(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{}", message);
    }
}

/// Print a warning message to stderr (respects quiet flag).
pub fn print_warning(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("warning: {}", message);
    }
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "version: 2\n").unwrap();
    }

    fn relative(root: &Path, files: Vec<PathBuf>) -> Vec<String> {
        files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_glob_set_segment_rules() {
        let set = build_schema_glob_set(&[
            "models/*.yml".to_string(),
            "seeds/_*_props.yml".to_string(),
        ])
        .unwrap();
        assert!(set.is_match("models/schema.yml"));
        assert!(!set.is_match("models/marts/schema.yml"));
        assert!(!set.is_match("models/schema.yaml"));
        assert!(set.is_match("seeds/_core_props.yml"));

        let recursive = build_schema_glob_set(&["models/**/*.yml".to_string()]).unwrap();
        assert!(recursive.is_match("models/schema.yml"));
        assert!(recursive.is_match("models/marts/core/schema.yml"));
        assert!(!recursive.is_match("analyses/schema.yml"));
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let err = build_schema_glob_set(&["models/[*.yml".to_string()]).unwrap_err();
        assert!(err.to_string().contains("models/[*.yml"));
    }

    #[test]
    fn test_discover_recursive_and_single_level() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(root, "models/schema.yml");
        touch(root, "models/marts/core/schema.yml");
        touch(root, "models/marts/core/orders.sql");
        touch(root, "snapshots/snap.yml");
        touch(root, "snapshots/nested/deep.yml");

        let recursive = discover_schema_files(root, &["models/**/*.yml".to_string()]).unwrap();
        assert_eq!(
            relative(root, recursive),
            vec!["models/marts/core/schema.yml", "models/schema.yml"]
        );

        let single = discover_schema_files(root, &["snapshots/*.yml".to_string()]).unwrap();
        assert_eq!(relative(root, single), vec!["snapshots/snap.yml"]);
    }

    #[test]
    fn test_discover_literal_and_missing() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(root, "extra/sources.yml");

        let files = discover_schema_files(
            root,
            &[
                "extra/sources.yml".to_string(),
                "extra/sources.yml".to_string(),
                "missing/*.yml".to_string(),
            ],
        )
        .unwrap();
        assert_eq!(relative(root, files), vec!["extra/sources.yml"]);

        assert!(discover_schema_files(root, &[]).unwrap().is_empty());
    }
}
