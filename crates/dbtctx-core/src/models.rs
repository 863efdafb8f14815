//! dbt Entity Model
//!
//! Strongly-typed representations of the entities declared in a dbt
//! project: models, columns, data tests, source groups, exposures,
//! metrics, and the project configuration itself.
//!
//! Entities are immutable once built. Updates happen by re-parsing and
//! replacing whole lists.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::document::Metadata;
use crate::error::ParseError;

// ============================================================================
// Enumerations
// ============================================================================

/// Severity of a data test failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestSeverity {
    #[default]
    Error,
    Warning,
    Info,
}

impl TestSeverity {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TestSeverity::Error => "error",
            TestSeverity::Warning => "warning",
            TestSeverity::Info => "info",
        }
    }
}

impl FromStr for TestSeverity {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(TestSeverity::Error),
            "warning" | "warn" => Ok(TestSeverity::Warning),
            "info" => Ok(TestSeverity::Info),
            _ => Err(ParseError::invalid_enum("severity", s)),
        }
    }
}

impl fmt::Display for TestSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Physical strategy used to persist a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Materialization {
    Table,
    View,
    Incremental,
    Ephemeral,
    Snapshot,
    Seed,
}

impl Materialization {
    /// Materialization dbt applies when none is configured
    pub const DEFAULT: Materialization = Materialization::View;

    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Materialization::Table => "table",
            Materialization::View => "view",
            Materialization::Incremental => "incremental",
            Materialization::Ephemeral => "ephemeral",
            Materialization::Snapshot => "snapshot",
            Materialization::Seed => "seed",
        }
    }
}

impl FromStr for Materialization {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "table" => Ok(Materialization::Table),
            "view" => Ok(Materialization::View),
            "incremental" => Ok(Materialization::Incremental),
            "ephemeral" => Ok(Materialization::Ephemeral),
            "snapshot" => Ok(Materialization::Snapshot),
            "seed" => Ok(Materialization::Seed),
            _ => Err(ParseError::invalid_enum("materialized", s)),
        }
    }
}

impl fmt::Display for Materialization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Analytical database technology a project targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarehouseKind {
    BigQuery,
    Snowflake,
    Postgres,
    Redshift,
    Databricks,
    Synapse,
    DuckDb,
}

impl WarehouseKind {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            WarehouseKind::BigQuery => "bigquery",
            WarehouseKind::Snowflake => "snowflake",
            WarehouseKind::Postgres => "postgres",
            WarehouseKind::Redshift => "redshift",
            WarehouseKind::Databricks => "databricks",
            WarehouseKind::Synapse => "synapse",
            WarehouseKind::DuckDb => "duckdb",
        }
    }
}

impl FromStr for WarehouseKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bigquery" | "bq" => Ok(WarehouseKind::BigQuery),
            "snowflake" => Ok(WarehouseKind::Snowflake),
            "postgres" | "postgresql" | "pg" => Ok(WarehouseKind::Postgres),
            "redshift" => Ok(WarehouseKind::Redshift),
            "databricks" => Ok(WarehouseKind::Databricks),
            "synapse" => Ok(WarehouseKind::Synapse),
            "duckdb" => Ok(WarehouseKind::DuckDb),
            _ => Err(ParseError::invalid_enum("warehouse", s)),
        }
    }
}

impl fmt::Display for WarehouseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Shared Entity Shape
// ============================================================================

/// Capabilities shared by every named, documented entity.
pub trait Entity {
    /// Entity name
    fn name(&self) -> &str;

    /// Optional human description
    fn description(&self) -> Option<&str>;

    /// Entity-level tags
    fn tags(&self) -> &[String];

    /// Free-form metadata
    fn meta(&self) -> &Metadata;
}

macro_rules! impl_entity {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Entity for $ty {
                fn name(&self) -> &str {
                    &self.name
                }

                fn description(&self) -> Option<&str> {
                    self.description.as_deref()
                }

                fn tags(&self) -> &[String] {
                    &self.tags
                }

                fn meta(&self) -> &Metadata {
                    &self.meta
                }
            }
        )*
    };
}

impl_entity!(Model, Column, SourceGroup, Exposure, Metric);

// ============================================================================
// Data Tests and Columns
// ============================================================================

/// A data test (rule) attached to a model or a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTest {
    /// Rule identifier (`unique`, `not_null`, `accepted_values`, ...)
    pub name: String,
    /// Test flavor; always "generic" for schema-declared tests
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: TestSeverity,
    pub config: Metadata,
    /// Owning column for column-level tests
    pub column_name: Option<String>,
    /// Rule parameters (e.g. accepted value lists)
    pub kwargs: Metadata,
}

impl DataTest {
    /// Create a parameterless generic test
    pub fn generic(name: impl Into<String>, column_name: Option<&str>) -> Self {
        Self {
            name: name.into(),
            kind: "generic".to_string(),
            severity: TestSeverity::default(),
            config: Metadata::new(),
            column_name: column_name.map(str::to_string),
            kwargs: Metadata::new(),
        }
    }
}

/// A column declared on a model or source table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub description: Option<String>,
    pub data_type: Option<String>,
    /// Constraint kinds (`not_null`, `primary_key`, ...)
    pub constraints: Vec<String>,
    pub tests: Vec<DataTest>,
    pub meta: Metadata,
    pub tags: Vec<String>,
    pub quote: Option<bool>,
}

impl Column {
    /// Check if any test targets this column
    pub fn has_tests(&self) -> bool {
        !self.tests.is_empty()
    }

    /// Check if the column has a non-empty description
    pub fn has_documentation(&self) -> bool {
        self.description.as_deref().is_some_and(|d| !d.is_empty())
    }
}

// ============================================================================
// Models
// ============================================================================

/// Resolved per-model configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub materialized: Option<Materialization>,
    pub schema: Option<String>,
    pub database: Option<String>,
    pub alias: Option<String>,
    pub tags: Vec<String>,
    pub meta: Metadata,
    pub docs: Metadata,
    pub enabled: bool,
    pub persist_docs: Metadata,
    pub pre_hook: Vec<String>,
    pub post_hook: Vec<String>,
    pub grants: Metadata,
    pub contract: Metadata,
    pub on_schema_change: Option<String>,
    pub on_configuration_change: Option<String>,
    pub unique_key: Option<String>,
    pub cluster_by: Option<Vec<String>>,
    pub partition_by: Option<Metadata>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            materialized: None,
            schema: None,
            database: None,
            alias: None,
            tags: Vec::new(),
            meta: Metadata::new(),
            docs: Metadata::new(),
            enabled: true,
            persist_docs: Metadata::new(),
            pre_hook: Vec::new(),
            post_hook: Vec::new(),
            grants: Metadata::new(),
            contract: Metadata::new(),
            on_schema_change: None,
            on_configuration_change: None,
            unique_key: None,
            cluster_by: None,
            partition_by: None,
        }
    }
}

/// A transformable dataset definition, or a source table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub name: String,
    pub description: Option<String>,
    pub columns: Vec<Column>,
    pub config: ModelConfig,
    /// Model-level tests
    pub tests: Vec<DataTest>,
    pub tags: Vec<String>,
    pub meta: Metadata,
    pub docs: Metadata,
    pub latest_version: Option<i64>,
    pub access: Option<String>,
    pub group: Option<String>,
    pub patch_path: Option<String>,
    pub original_file_path: Option<String>,
    pub depends_on: Vec<String>,
    /// Upstream model names
    pub refs: Vec<String>,
    /// Upstream source names
    pub sources: Vec<String>,
}

impl Model {
    /// Create a model with default configuration
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            columns: Vec::new(),
            config: ModelConfig::default(),
            tests: Vec::new(),
            tags: Vec::new(),
            meta: Metadata::new(),
            docs: Metadata::new(),
            latest_version: None,
            access: Some("protected".to_string()),
            group: None,
            patch_path: None,
            original_file_path: None,
            depends_on: Vec::new(),
            refs: Vec::new(),
            sources: Vec::new(),
        }
    }

    /// Names of columns that carry at least one test
    pub fn get_test_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.has_tests())
            .map(|c| c.name.clone())
            .collect()
    }

    /// Names of columns with a description
    pub fn get_documented_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.has_documentation())
            .map(|c| c.name.clone())
            .collect()
    }

    /// Find a column by case-insensitive name
    pub fn get_column_by_name(&self, name: &str) -> Option<&Column> {
        let name = name.to_lowercase();
        self.columns.iter().find(|c| c.name.to_lowercase() == name)
    }

    /// Configured materialization, `"view"` when unset
    pub fn get_materialization(&self) -> &'static str {
        self.config
            .materialized
            .unwrap_or(Materialization::DEFAULT)
            .as_str()
    }

    /// Warehouse relation name: `database.schema.alias`, missing parts omitted
    pub fn get_full_name(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(3);
        if let Some(ref database) = self.config.database {
            parts.push(database);
        }
        if let Some(ref schema) = self.config.schema {
            parts.push(schema);
        }
        parts.push(self.config.alias.as_deref().unwrap_or(&self.name));
        parts.join(".")
    }

    /// Entity tags followed by configuration tags
    pub fn all_tags(&self) -> impl Iterator<Item = &String> {
        self.tags.iter().chain(self.config.tags.iter())
    }

    /// Check membership in the combined tag list
    pub fn has_tag(&self, tag: &str) -> bool {
        self.all_tags().any(|t| t == tag)
    }
}

// ============================================================================
// Sources, Exposures, Metrics
// ============================================================================

/// Externally-owned tables grouped by originating system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceGroup {
    pub name: String,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub description: Option<String>,
    pub tables: Vec<Model>,
    pub meta: Metadata,
    pub tags: Vec<String>,
    pub freshness: Option<Metadata>,
    pub loaded_at_field: Option<String>,
    pub loader: Option<String>,
}

impl SourceGroup {
    /// Qualified `group.table` names of all tables
    pub fn table_names(&self) -> impl Iterator<Item = String> + '_ {
        self.tables
            .iter()
            .map(move |t| format!("{}.{}", self.name, t.name))
    }
}

/// A downstream consumer (dashboard, notebook, application).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exposure {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub owner: BTreeMap<String, String>,
    pub description: Option<String>,
    pub maturity: Option<String>,
    pub url: Option<String>,
    pub depends_on: Vec<String>,
    pub tags: Vec<String>,
    pub meta: Metadata,
}

/// A business metric computed over a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub label: String,
    /// Owning model name
    pub model: String,
    pub description: Option<String>,
    pub calculation_method: String,
    pub expression: String,
    pub timestamp: Option<String>,
    pub time_grains: Vec<String>,
    pub dimensions: Vec<String>,
    pub filters: Vec<Metadata>,
    pub meta: Metadata,
    pub tags: Vec<String>,
}

// ============================================================================
// Project
// ============================================================================

/// Contents of `dbt_project.yml`.
///
/// Per-resource configuration trees are kept unparsed: they are recursive
/// and keyed by arbitrary path segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    pub version: Option<String>,
    pub profile: Option<String>,
    pub model_paths: Vec<String>,
    pub seed_paths: Vec<String>,
    pub test_paths: Vec<String>,
    pub analysis_paths: Vec<String>,
    pub macro_paths: Vec<String>,
    pub snapshot_paths: Vec<String>,
    pub target_path: String,
    pub clean_targets: Vec<String>,
    pub vars: Metadata,
    pub models: Metadata,
    pub seeds: Metadata,
    pub tests: Metadata,
    pub snapshots: Metadata,
    pub sources: Metadata,
    pub quoting: Metadata,
    pub on_run_start: Vec<String>,
    pub on_run_end: Vec<String>,
}

/// A project configuration plus every entity parsed into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub config: ProjectConfig,
    pub models: Vec<Model>,
    pub sources: Vec<SourceGroup>,
    pub exposures: Vec<Exposure>,
    pub metrics: Vec<Metric>,
}

impl Project {
    /// Create a project with no entities
    pub fn new(config: ProjectConfig) -> Self {
        Self {
            config,
            models: Vec::new(),
            sources: Vec::new(),
            exposures: Vec::new(),
            metrics: Vec::new(),
        }
    }

    /// Find a model by case-insensitive name (first match)
    pub fn get_model_by_name(&self, name: &str) -> Option<&Model> {
        let name = name.to_lowercase();
        self.models.iter().find(|m| m.name.to_lowercase() == name)
    }

    /// Models carrying `tag` at entity or configuration level
    pub fn get_models_by_tag(&self, tag: &str) -> Vec<&Model> {
        self.models.iter().filter(|m| m.has_tag(tag)).collect()
    }

    /// Models configured into `schema`
    pub fn get_models_by_schema(&self, schema: &str) -> Vec<&Model> {
        self.models
            .iter()
            .filter(|m| m.config.schema.as_deref() == Some(schema))
            .collect()
    }

    /// Models whose resolved materialization equals `materialization`
    pub fn get_models_by_materialization(&self, materialization: &str) -> Vec<&Model> {
        self.models
            .iter()
            .filter(|m| m.get_materialization() == materialization)
            .collect()
    }

    /// Every tag used by any model, sorted and deduplicated
    pub fn get_all_tags(&self) -> BTreeSet<String> {
        self.models
            .iter()
            .flat_map(|m| m.all_tags().cloned())
            .collect()
    }

    /// Qualified `group.table` names of all source tables
    pub fn source_table_names(&self) -> Vec<String> {
        self.sources.iter().flat_map(|s| s.table_names()).collect()
    }
}

// ============================================================================
// Warehouse Binding
// ============================================================================

/// Warehouse a registry is bound to, with optional naming hints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseBinding {
    pub kind: WarehouseKind,
    /// dbt schema name → warehouse dataset name
    pub dataset_mappings: BTreeMap<String, String>,
    pub schema_pattern: Option<String>,
    pub database_pattern: Option<String>,
}

impl WarehouseBinding {
    /// Bind to a warehouse without naming hints
    pub fn new(kind: WarehouseKind) -> Self {
        Self {
            kind,
            dataset_mappings: BTreeMap::new(),
            schema_pattern: None,
            database_pattern: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, description: Option<&str>, tests: usize) -> Column {
        Column {
            name: name.to_string(),
            description: description.map(str::to_string),
            tests: (0..tests)
                .map(|_| DataTest::generic("not_null", Some(name)))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_materialization_from_str() {
        assert_eq!(
            "table".parse::<Materialization>().unwrap(),
            Materialization::Table
        );
        assert_eq!(
            "Incremental".parse::<Materialization>().unwrap(),
            Materialization::Incremental
        );
        assert!(matches!(
            "materialized_view".parse::<Materialization>(),
            Err(ParseError::InvalidEnumValue { .. })
        ));
    }

    #[test]
    fn test_warehouse_kind_aliases() {
        assert_eq!("bq".parse::<WarehouseKind>().unwrap(), WarehouseKind::BigQuery);
        assert_eq!("PG".parse::<WarehouseKind>().unwrap(), WarehouseKind::Postgres);
        assert_eq!(WarehouseKind::DuckDb.to_string(), "duckdb");
        assert!("oracle".parse::<WarehouseKind>().is_err());
    }

    #[test]
    fn test_severity_accepts_warn() {
        assert_eq!("warn".parse::<TestSeverity>().unwrap(), TestSeverity::Warning);
        assert_eq!(TestSeverity::default(), TestSeverity::Error);
    }

    #[test]
    fn test_full_name() {
        let mut model = Model::new("orders");
        assert_eq!(model.get_full_name(), "orders");

        model.config.schema = Some("marts".to_string());
        assert_eq!(model.get_full_name(), "marts.orders");

        model.config.database = Some("analytics".to_string());
        model.config.alias = Some("fct_orders".to_string());
        assert_eq!(model.get_full_name(), "analytics.marts.fct_orders");
    }

    #[test]
    fn test_materialization_default() {
        let mut model = Model::new("orders");
        assert_eq!(model.get_materialization(), "view");
        model.config.materialized = Some(Materialization::Incremental);
        assert_eq!(model.get_materialization(), "incremental");
    }

    #[test]
    fn test_column_helpers() {
        let mut model = Model::new("customers");
        model.columns = vec![
            column("customer_id", Some("Primary key"), 2),
            column("email", Some(""), 0),
            column("name", None, 1),
        ];

        assert_eq!(model.get_test_columns(), vec!["customer_id", "name"]);
        assert_eq!(model.get_documented_columns(), vec!["customer_id"]);
        assert_eq!(
            model.get_column_by_name("CUSTOMER_ID").map(|c| c.name.as_str()),
            Some("customer_id")
        );
        assert!(model.get_column_by_name("missing").is_none());
    }

    #[test]
    fn test_entity_trait() {
        let mut model = Model::new("orders");
        model.tags = vec!["finance".to_string()];
        let entity: &dyn Entity = &model;
        assert_eq!(entity.name(), "orders");
        assert_eq!(entity.tags(), ["finance".to_string()]);
        assert!(entity.description().is_none());
    }

    #[test]
    fn test_all_tags_combines_config_tags() {
        let mut model = Model::new("orders");
        model.tags = vec!["a".to_string()];
        model.config.tags = vec!["b".to_string(), "a".to_string()];

        let tags: Vec<&String> = model.all_tags().collect();
        assert_eq!(tags, vec!["a", "b", "a"]);
        assert!(model.has_tag("b"));
        assert!(!model.has_tag("c"));
    }
}
