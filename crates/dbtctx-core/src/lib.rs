//! dbtctx Core - In-memory metadata index and cache for dbt projects
//!
//! This crate provides the indexing and caching layer behind dbtctx:
//! - Expiring LRU cache with usage statistics
//! - Content-addressed cache coordinator with passive cleanup
//! - Parsing of `dbt_project.yml` and schema documents into typed entities
//! - Configuration inheritance from the project `models:` tree
//! - Registry with name, tag, schema and materialization indices
//! - Scored model search and direct lineage extraction
//!
//! Fetching documents is left to the caller: everything here works on
//! already-loaded text.

pub mod cache;
pub mod coordinator;
pub mod document;
pub mod error;
pub mod lineage;
pub mod models;
pub mod parser;
pub mod registry;
pub mod search;
pub mod sync;

// Cache re-exports
pub use cache::{CacheStats, ExpiringCache, SizeEstimate};
pub use coordinator::{
    generate_key, global_document_cache, reset_global_document_cache, CacheCoordinator,
    CacheSettings, DocumentCache, MemoryUsage,
};

// Entity and parser re-exports
pub use document::Metadata;
pub use error::ParseError;
pub use models::{
    Column, DataTest, Entity, Exposure, Materialization, Metric, Model, ModelConfig, Project,
    ProjectConfig, SourceGroup, TestSeverity, WarehouseBinding, WarehouseKind,
};
pub use parser::{
    infer_warehouse_kind, parse_project, parse_project_config, parse_schema_document,
    resolve_model_config, ParsedDocument, SchemaDocument,
};

// Query re-exports
pub use lineage::{extract_basic_lineage, Lineage, ModelLineage};
pub use registry::{
    IndexReport, ModelRegistry, RegistryIndices, RegistryStats, DEFAULT_SCHEMA_GROUP,
};
pub use search::{score_models, search_models, SearchFilters, SearchHit};
pub use sync::{should_refresh, ProjectLoader, SyncOutcome, SyncReport};
