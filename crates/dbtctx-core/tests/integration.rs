//! End-to-end tests over the fixture project in `tests/fixtures`.
//!
//! The fixture mirrors a small analytics project:
//! - `dbt_project.yml` with a nested `models:` configuration tree
//! - `models/marts/schema.yml` with mart models and an exposure
//! - `models/staging/schema.yml` with a source group and staging models

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use dbtctx_core::{
    infer_warehouse_kind, parse_project, parse_schema_document, CacheCoordinator, CacheSettings,
    Materialization, ModelRegistry, ParseError, ProjectLoader, SearchFilters, SyncOutcome,
    TestSeverity, WarehouseKind,
};
use pretty_assertions::assert_eq;

// ============================================================================
// Test Helpers
// ============================================================================

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

fn read_fixture(relative: &str) -> String {
    fs::read_to_string(fixtures_dir().join(relative)).expect("Failed to read fixture")
}

fn schema_documents() -> Vec<(String, String)> {
    ["models/marts/schema.yml", "models/staging/schema.yml"]
        .iter()
        .map(|path| (path.to_string(), read_fixture(path)))
        .collect()
}

fn load_fixture_project() -> SyncOutcome {
    ProjectLoader::new(None)
        .load(&read_fixture("dbt_project.yml"), schema_documents())
        .expect("Failed to load fixture project")
}

fn names(models: &[&dbtctx_core::Model]) -> Vec<String> {
    models.iter().map(|m| m.name.clone()).collect()
}

// ============================================================================
// Parsing
// ============================================================================

/// The marts document alone resolves the documented scenario.
#[test]
fn test_customer_summary_scenario() {
    let project = parse_project(&read_fixture("dbt_project.yml")).unwrap();
    assert_eq!(project.config.name, "analytics_dbt");
    assert_eq!(project.config.profile.as_deref(), Some("analytics_bq"));
    assert_eq!(
        infer_warehouse_kind(&project.config),
        Some(WarehouseKind::BigQuery)
    );

    let doc = parse_schema_document(
        &read_fixture("models/marts/schema.yml"),
        Some(&project.config.models),
    )
    .unwrap();

    let mut project = project;
    project.models = doc.models;
    let registry = ModelRegistry::new(project, None);

    let summary = registry.get_model("customer_summary").unwrap();
    assert_eq!(summary.config.materialized, Some(Materialization::Table));
    assert_eq!(summary.columns.len(), 7);
    assert_eq!(summary.get_full_name(), "marts_core.customer_summary");
    assert_eq!(summary.get_test_columns(), vec!["customer_id"]);

    let customer_id = summary.get_column_by_name("CUSTOMER_ID").unwrap();
    assert_eq!(customer_id.tests.len(), 2);
    assert_eq!(customer_id.data_type.as_deref(), Some("string"));
}

#[test]
fn test_project_paths_and_hooks() {
    let project = parse_project(&read_fixture("dbt_project.yml")).unwrap();
    let config = &project.config;

    assert_eq!(config.version.as_deref(), Some("1.0.0"));
    assert_eq!(config.seed_paths, vec!["seeds"]);
    // Defaults fill in what the document omits
    assert_eq!(config.test_paths, vec!["tests"]);
    assert_eq!(config.on_run_end, vec!["{{ grant_select(schemas) }}"]);
    assert!(config.on_run_start.is_empty());
}

#[test]
fn test_parameterized_test_keeps_kwargs() {
    let outcome = load_fixture_project();
    let order_facts = outcome.registry.get_model("order_facts").unwrap();
    let status = order_facts.get_column_by_name("status").unwrap();

    let accepted = &status.tests[0];
    assert_eq!(accepted.name, "accepted_values");
    assert_eq!(accepted.severity, TestSeverity::Warning);
    assert_eq!(accepted.column_name.as_deref(), Some("status"));
    assert_eq!(accepted.kwargs["values"].as_array().unwrap().len(), 4);
    assert!(!accepted.kwargs.contains_key("severity"));
    assert_eq!(status.meta["owner"], "finance");
}

#[test]
fn test_malformed_document_is_reported() {
    let err = parse_schema_document("models: [unclosed", None).unwrap_err();
    assert!(matches!(err, ParseError::MalformedDocument(_)));
}

// ============================================================================
// Loading and Queries
// ============================================================================

#[test]
fn test_load_fixture_project() {
    let outcome = load_fixture_project();
    let report = &outcome.report;

    assert!(report.is_clean());
    assert_eq!(report.documents_parsed, 2);
    assert_eq!(report.models, 4);
    assert_eq!(report.sources, 1);
    assert_eq!(report.exposures, 1);
    assert_eq!(report.warehouse, Some(WarehouseKind::BigQuery));

    let stats = outcome.registry.stats();
    assert_eq!(stats.project, "analytics_dbt");
    assert_eq!(stats.source_tables, 3);
    assert_eq!(stats.warehouse.as_deref(), Some("bigquery"));
}

#[test]
fn test_search_ranking() {
    let outcome = load_fixture_project();
    let registry = &outcome.registry;

    let results = registry.search("customer", &SearchFilters::new());
    assert_eq!(results[0].name, "customer_summary");
    assert!(!names(&results).contains(&"order_facts".to_string()));

    let incremental = SearchFilters::new().with_materialization("incremental");
    assert_eq!(
        names(&registry.search("order", &incremental)),
        vec!["order_facts"]
    );
}

#[test]
fn test_index_lookups() {
    let outcome = load_fixture_project();
    let registry = &outcome.registry;

    assert_eq!(names(&registry.get_by_tag("finance")), vec!["order_facts"]);
    assert_eq!(
        names(&registry.get_by_materialization("incremental")),
        vec!["order_facts"]
    );
    assert!(registry.get_all_tags().contains(&"core".to_string()));
}

#[test]
fn test_lineage_across_documents() {
    let outcome = load_fixture_project();
    let registry = &outcome.registry;

    let stg_orders = registry.lineage_for("stg_orders").unwrap();
    assert_eq!(stg_orders.upstream, vec!["jaffle_shop.orders"]);
    assert_eq!(stg_orders.downstream, vec!["customer_summary", "order_facts"]);

    let order_facts = registry.lineage_for("order_facts").unwrap();
    assert_eq!(
        order_facts.upstream,
        vec!["stg_orders", "jaffle_shop.payments"]
    );
    assert!(registry.is_external("jaffle_shop.payments"));
}

#[test]
fn test_partial_failure_keeps_good_documents() {
    let mut documents = schema_documents();
    documents.insert(1, ("models/broken.yml".to_string(), "- just\n- a list\n".to_string()));

    let outcome = ProjectLoader::new(None)
        .load(&read_fixture("dbt_project.yml"), documents)
        .unwrap();

    assert_eq!(outcome.report.documents_parsed, 2);
    assert_eq!(outcome.report.failures.len(), 1);
    assert_eq!(outcome.report.failures[0].0, "models/broken.yml");
    assert_eq!(outcome.report.models, 4);
}

#[test]
fn test_cached_loads_match_uncached() {
    let cache = Arc::new(CacheCoordinator::new(CacheSettings::default()));
    let loader = ProjectLoader::new(Some(Arc::clone(&cache)));
    let project_text = read_fixture("dbt_project.yml");

    let cached = loader.load(&project_text, schema_documents()).unwrap();
    let again = loader.load(&project_text, schema_documents()).unwrap();
    let uncached = load_fixture_project();

    assert_eq!(cached.registry.models(), uncached.registry.models());
    assert_eq!(again.registry.models(), uncached.registry.models());
    assert_eq!(cache.cache_stats().hits, 3);
    assert_eq!(cache.cache_stats().cache_size, 3);
}
