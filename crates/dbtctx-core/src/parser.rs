//! dbt Document Parser
//!
//! Pure transforms from decoded YAML documents to typed entities:
//!
//! - `dbt_project.yml` → [`ProjectConfig`] / [`Project`]
//! - schema files (`models:`, `sources:`, `exposures:`, `metrics:`) →
//!   [`SchemaDocument`]
//!
//! Model configuration is resolved against the project's `models:` tree
//! (see [`resolve_model_config`]) before the schema-level `config:` block is
//! applied on top.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dbtctx_core::parser::{parse_project, parse_schema_document};
//!
//! let project = parse_project(project_yaml)?;
//! let doc = parse_schema_document(schema_yaml, Some(&project.config.models))?;
//! println!("{} models", doc.models.len());
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use crate::cache::SizeEstimate;
use crate::coordinator::{generate_key, DocumentCache};
use crate::document::{
    as_text, boolean, decode_mapping, integer, list, mapping, optional_mapping, string_list,
    string_list_or, text, text_or, Metadata,
};
use crate::error::ParseError;
use crate::models::{
    Column, DataTest, Exposure, Materialization, Metric, Model, ModelConfig, Project,
    ProjectConfig, SourceGroup, TestSeverity, WarehouseKind,
};

/// Cache content type for project documents
pub const PROJECT_CONTENT_TYPE: &str = "project";

/// Cache content type for schema documents
pub const SCHEMA_CONTENT_TYPE: &str = "schema";

// ============================================================================
// Parsed Documents
// ============================================================================

/// Entities declared in one schema document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    pub models: Vec<Model>,
    pub sources: Vec<SourceGroup>,
    pub exposures: Vec<Exposure>,
    pub metrics: Vec<Metric>,
}

impl SchemaDocument {
    /// Check if the document declares nothing
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
            && self.sources.is_empty()
            && self.exposures.is_empty()
            && self.metrics.is_empty()
    }

    /// Append another document's entities, preserving order
    pub fn extend(&mut self, other: SchemaDocument) {
        self.models.extend(other.models);
        self.sources.extend(other.sources);
        self.exposures.extend(other.exposures);
        self.metrics.extend(other.metrics);
    }
}

/// A parse result stored in the document cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParsedDocument {
    Project(ProjectConfig),
    Schema(SchemaDocument),
}

impl SizeEstimate for ParsedDocument {
    fn estimated_size(&self) -> usize {
        // Serialized length is a stable proxy for heap usage
        serde_json::to_vec(self).map(|bytes| bytes.len()).unwrap_or(0)
    }
}

// ============================================================================
// Project Documents
// ============================================================================

/// Parse `dbt_project.yml` text into a project configuration.
///
/// An empty document yields a configuration where every field takes its
/// default (name `"unknown"`).
pub fn parse_project_config(yaml: &str) -> Result<ProjectConfig, ParseError> {
    let data = decode_mapping(yaml)?;

    Ok(ProjectConfig {
        name: text_or(&data, "name", "unknown"),
        version: text(&data, "version"),
        profile: text(&data, "profile"),
        model_paths: string_list_or(&data, "model-paths", &["models"]),
        seed_paths: string_list_or(&data, "seed-paths", &["data"]),
        test_paths: string_list_or(&data, "test-paths", &["tests"]),
        analysis_paths: string_list_or(&data, "analysis-paths", &["analyses"]),
        macro_paths: string_list_or(&data, "macro-paths", &["macros"]),
        snapshot_paths: string_list_or(&data, "snapshot-paths", &["snapshots"]),
        target_path: text_or(&data, "target-path", "target"),
        clean_targets: string_list_or(&data, "clean-targets", &["target", "dbt_packages"]),
        vars: mapping(&data, "vars"),
        models: mapping(&data, "models"),
        seeds: mapping(&data, "seeds"),
        tests: mapping(&data, "tests"),
        snapshots: mapping(&data, "snapshots"),
        sources: mapping(&data, "sources"),
        quoting: mapping(&data, "quoting"),
        on_run_start: string_list(&data, "on-run-start").unwrap_or_default(),
        on_run_end: string_list(&data, "on-run-end").unwrap_or_default(),
    })
}

/// Parse `dbt_project.yml` text into a project with no entities yet.
pub fn parse_project(yaml: &str) -> Result<Project, ParseError> {
    parse_project_config(yaml).map(Project::new)
}

/// Parse a project document, consulting `cache` first.
pub fn parse_project_cached(yaml: &str, cache: &DocumentCache) -> Result<Project, ParseError> {
    if let Some(ParsedDocument::Project(config)) = cache.get_cached_yaml(yaml, PROJECT_CONTENT_TYPE)
    {
        trace!("Project document served from cache");
        return Ok(Project::new(config));
    }

    let config = parse_project_config(yaml)?;
    cache.cache_yaml(
        yaml,
        ParsedDocument::Project(config.clone()),
        PROJECT_CONTENT_TYPE,
    );
    Ok(Project::new(config))
}

// ============================================================================
// Schema Documents
// ============================================================================

/// Parse a schema document.
///
/// `models_tree` is the project's `models:` configuration tree; when given,
/// each model's configuration inherits from it.
pub fn parse_schema_document(
    yaml: &str,
    models_tree: Option<&Metadata>,
) -> Result<SchemaDocument, ParseError> {
    let data = decode_mapping(yaml)?;
    if data.is_empty() {
        return Ok(SchemaDocument::default());
    }

    let models = list(&data, "models")
        .iter()
        .filter_map(entry_mapping)
        .map(|entry| parse_model(entry, models_tree))
        .collect();

    let sources = list(&data, "sources")
        .iter()
        .filter_map(entry_mapping)
        .map(parse_source_group)
        .collect();

    let exposures = list(&data, "exposures")
        .iter()
        .filter_map(entry_mapping)
        .map(parse_exposure)
        .collect();

    let metrics = list(&data, "metrics")
        .iter()
        .filter_map(entry_mapping)
        .map(parse_metric)
        .collect();

    Ok(SchemaDocument {
        models,
        sources,
        exposures,
        metrics,
    })
}

/// Parse a schema document, consulting `cache` first.
///
/// The inheritance tree participates in the cache key, so the same text
/// parsed under a different project configuration is not reused.
pub fn parse_schema_cached(
    yaml: &str,
    models_tree: Option<&Metadata>,
    cache: &DocumentCache,
) -> Result<SchemaDocument, ParseError> {
    let content_type = schema_content_type(models_tree);

    if let Some(ParsedDocument::Schema(doc)) = cache.get_cached_yaml(yaml, &content_type) {
        trace!("Schema document served from cache");
        return Ok(doc);
    }

    let doc = parse_schema_document(yaml, models_tree)?;
    cache.cache_yaml(yaml, ParsedDocument::Schema(doc.clone()), &content_type);
    Ok(doc)
}

fn schema_content_type(models_tree: Option<&Metadata>) -> String {
    match models_tree {
        Some(tree) if !tree.is_empty() => {
            let tree_json = serde_json::to_string(tree).unwrap_or_default();
            let digest = generate_key(&tree_json, None);
            format!("{}@{}", SCHEMA_CONTENT_TYPE, &digest[..12])
        }
        _ => SCHEMA_CONTENT_TYPE.to_string(),
    }
}

fn entry_mapping(value: &Value) -> Option<&Metadata> {
    match value {
        Value::Object(map) => Some(map),
        other => {
            debug!(kind = crate::document::value_kind(other), "Skipping non-mapping entry");
            None
        }
    }
}

// ============================================================================
// Configuration Inheritance
// ============================================================================

/// Resolve the configuration a project `models:` tree applies to `model_name`.
///
/// Every branch is walked. `+`-prefixed keys apply to everything at and
/// below their level and are returned without the prefix; a key equal to
/// `model_name` contributes its mapping as a per-model override. Within a
/// level, later keys override earlier ones. Values replace, never merge.
pub fn resolve_model_config(model_name: &str, tree: &Metadata) -> Metadata {
    let mut config = Metadata::new();

    for (key, value) in tree {
        if key == model_name {
            if let Value::Object(overrides) = value {
                for (option, setting) in overrides {
                    config.insert(strip_plus(option).to_string(), setting.clone());
                }
            }
        } else if let Some(option) = key.strip_prefix('+') {
            config.insert(option.to_string(), value.clone());
        } else if let Value::Object(subtree) = value {
            for (option, setting) in resolve_model_config(model_name, subtree) {
                config.insert(option, setting);
            }
        }
    }

    config
}

fn strip_plus(key: &str) -> &str {
    key.strip_prefix('+').unwrap_or(key)
}

// ============================================================================
// Models and Columns
// ============================================================================

/// Parse one model (or source table) entry.
pub fn parse_model(entry: &Metadata, models_tree: Option<&Metadata>) -> Model {
    let name = text_or(entry, "name", "");

    let mut config_data = match models_tree {
        Some(tree) => resolve_model_config(&name, tree),
        None => Metadata::new(),
    };
    // Schema-level config always wins over the project tree
    for (key, value) in mapping(entry, "config") {
        config_data.insert(key, value);
    }

    let columns = list(entry, "columns")
        .iter()
        .filter_map(entry_mapping)
        .map(parse_column)
        .collect();

    let tests = test_entries(entry)
        .map(|test| parse_test(test, None))
        .collect();

    let depends_on = string_list(entry, "depends_on").unwrap_or_default();
    let refs = string_list(entry, "refs").unwrap_or_else(|| depends_on.clone());

    Model {
        config: parse_model_config(&config_data),
        description: text(entry, "description"),
        columns,
        tests,
        tags: string_list(entry, "tags").unwrap_or_default(),
        meta: mapping(entry, "meta"),
        docs: mapping(entry, "docs"),
        latest_version: integer(entry, "latest_version"),
        access: Some(text_or(entry, "access", "protected")),
        group: text(entry, "group"),
        patch_path: text(entry, "patch_path"),
        original_file_path: text(entry, "original_file_path"),
        depends_on,
        refs,
        sources: string_list(entry, "sources").unwrap_or_default(),
        name,
    }
}

/// Build a [`ModelConfig`] from a resolved configuration mapping.
///
/// Unknown materializations leave the field unset.
pub fn parse_model_config(data: &Metadata) -> ModelConfig {
    let materialized = text(data, "materialized").and_then(|value| {
        value
            .parse::<Materialization>()
            .map_err(|e| debug!(error = %e, "Ignoring unrecognized materialization"))
            .ok()
    });

    ModelConfig {
        materialized,
        schema: text(data, "schema"),
        database: text(data, "database"),
        alias: text(data, "alias"),
        tags: string_list(data, "tags").unwrap_or_default(),
        meta: mapping(data, "meta"),
        docs: mapping(data, "docs"),
        enabled: boolean(data, "enabled").unwrap_or(true),
        persist_docs: mapping(data, "persist_docs"),
        pre_hook: string_list(data, "pre-hook")
            .or_else(|| string_list(data, "pre_hook"))
            .unwrap_or_default(),
        post_hook: string_list(data, "post-hook")
            .or_else(|| string_list(data, "post_hook"))
            .unwrap_or_default(),
        grants: mapping(data, "grants"),
        contract: mapping(data, "contract"),
        on_schema_change: text(data, "on_schema_change"),
        on_configuration_change: text(data, "on_configuration_change"),
        unique_key: text(data, "unique_key"),
        cluster_by: string_list(data, "cluster_by"),
        partition_by: optional_mapping(data, "partition_by"),
    }
}

/// Parse one column entry.
pub fn parse_column(entry: &Metadata) -> Column {
    let name = text_or(entry, "name", "");

    let tests = test_entries(entry)
        .map(|test| parse_test(test, Some(name.as_str())))
        .collect();

    // Mapping constraints without a `type` are skipped
    let constraints = list(entry, "constraints")
        .iter()
        .filter_map(|constraint| match constraint {
            Value::String(kind) => Some(kind.clone()),
            Value::Object(map) => text(map, "type"),
            _ => None,
        })
        .collect();

    Column {
        description: text(entry, "description"),
        data_type: text(entry, "data_type"),
        constraints,
        tests,
        meta: mapping(entry, "meta"),
        tags: string_list(entry, "tags").unwrap_or_default(),
        quote: boolean(entry, "quote"),
        name,
    }
}

/// Test entries under `tests:` followed by `data_tests:`.
fn test_entries(entry: &Metadata) -> impl Iterator<Item = &Value> {
    list(entry, "tests")
        .iter()
        .chain(list(entry, "data_tests").iter())
}

/// Parse one test entry.
///
/// A bare string names a parameterless rule. A mapping's single key names
/// the rule; `severity` and `config` are lifted out of its parameters and
/// the rest are kept as keyword arguments.
pub fn parse_test(entry: &Value, column_name: Option<&str>) -> DataTest {
    match entry {
        Value::String(name) => DataTest::generic(name.as_str(), column_name),
        Value::Object(map) => {
            let Some((name, params)) = map.iter().next() else {
                return DataTest::generic("unknown", column_name);
            };

            let mut kwargs = match params {
                Value::Object(params) => params.clone(),
                _ => Metadata::new(),
            };
            let config = match kwargs.shift_remove("config") {
                Some(Value::Object(config)) => config,
                _ => Metadata::new(),
            };
            let severity = kwargs
                .shift_remove("severity")
                .as_ref()
                .and_then(as_text)
                .or_else(|| text(&config, "severity"))
                .and_then(|s| s.parse::<TestSeverity>().ok())
                .unwrap_or_default();

            DataTest {
                severity,
                config,
                kwargs,
                ..DataTest::generic(name.as_str(), column_name)
            }
        }
        _ => DataTest::generic("unknown", column_name),
    }
}

// ============================================================================
// Sources, Exposures, Metrics
// ============================================================================

fn parse_source_group(entry: &Metadata) -> SourceGroup {
    let tables = list(entry, "tables")
        .iter()
        .filter_map(entry_mapping)
        .map(|table| parse_model(table, None))
        .collect();

    SourceGroup {
        name: text_or(entry, "name", ""),
        database: text(entry, "database"),
        schema: text(entry, "schema"),
        description: text(entry, "description"),
        tables,
        meta: mapping(entry, "meta"),
        tags: string_list(entry, "tags").unwrap_or_default(),
        freshness: optional_mapping(entry, "freshness"),
        loaded_at_field: text(entry, "loaded_at_field"),
        loader: text(entry, "loader"),
    }
}

fn parse_exposure(entry: &Metadata) -> Exposure {
    let owner = mapping(entry, "owner")
        .iter()
        .filter_map(|(key, value)| as_text(value).map(|v| (key.clone(), v)))
        .collect();

    Exposure {
        name: text_or(entry, "name", ""),
        kind: text_or(entry, "type", "dashboard"),
        owner,
        description: text(entry, "description"),
        maturity: text(entry, "maturity"),
        url: text(entry, "url"),
        depends_on: string_list(entry, "depends_on").unwrap_or_default(),
        tags: string_list(entry, "tags").unwrap_or_default(),
        meta: mapping(entry, "meta"),
    }
}

fn parse_metric(entry: &Metadata) -> Metric {
    let filters = list(entry, "filters")
        .iter()
        .filter_map(|filter| match filter {
            Value::Object(map) => Some(map.clone()),
            _ => None,
        })
        .collect();

    Metric {
        name: text_or(entry, "name", ""),
        label: text_or(entry, "label", ""),
        model: text_or(entry, "model", ""),
        description: text(entry, "description"),
        calculation_method: text_or(entry, "calculation_method", ""),
        expression: text_or(entry, "expression", ""),
        timestamp: text(entry, "timestamp"),
        time_grains: string_list(entry, "time_grains").unwrap_or_default(),
        dimensions: string_list(entry, "dimensions").unwrap_or_default(),
        filters,
        meta: mapping(entry, "meta"),
        tags: string_list(entry, "tags").unwrap_or_default(),
    }
}

// ============================================================================
// Warehouse Inference
// ============================================================================

/// Profile-name fragments in priority order; first match wins.
const PROFILE_SIGNALS: &[(&[&str], WarehouseKind)] = &[
    (&["bigquery", "bq"], WarehouseKind::BigQuery),
    (&["snowflake"], WarehouseKind::Snowflake),
    (&["postgres", "pg"], WarehouseKind::Postgres),
    (&["redshift"], WarehouseKind::Redshift),
    (&["databricks"], WarehouseKind::Databricks),
    (&["synapse"], WarehouseKind::Synapse),
    (&["duckdb"], WarehouseKind::DuckDb),
];

/// Infer the target warehouse from the profile name, then from `vars`.
///
/// Returns `None` when no signal is found.
pub fn infer_warehouse_kind(config: &ProjectConfig) -> Option<WarehouseKind> {
    if let Some(profile) = config.profile.as_deref() {
        let profile = profile.to_lowercase();
        let inferred = PROFILE_SIGNALS
            .iter()
            .find(|(fragments, _)| fragments.iter().any(|f| profile.contains(f)))
            .map(|(_, kind)| *kind);
        if inferred.is_some() {
            return inferred;
        }
    }

    for (key, value) in &config.vars {
        let key = key.to_lowercase();
        if !key.contains("warehouse") && !key.contains("adapter") {
            continue;
        }
        let value = as_text(value)
            .unwrap_or_else(|| value.to_string())
            .to_lowercase();
        if value.contains("bigquery") {
            return Some(WarehouseKind::BigQuery);
        }
        if value.contains("snowflake") {
            return Some(WarehouseKind::Snowflake);
        }
    }

    None
}
