//! Project Loader
//!
//! Turns raw document text into a [`ModelRegistry`]. Fetching documents is
//! the caller's job; the loader parses the project document, then every
//! schema document against the project's `models:` tree, and tolerates
//! per-document failures.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::coordinator::DocumentCache;
use crate::document::Metadata;
use crate::error::ParseError;
use crate::models::{Project, WarehouseBinding, WarehouseKind};
use crate::parser::{
    infer_warehouse_kind, parse_project, parse_project_cached, parse_schema_cached,
    parse_schema_document, SchemaDocument,
};
use crate::registry::ModelRegistry;

/// Summary of one load
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    /// Schema documents parsed successfully
    pub documents_parsed: usize,
    /// Schema documents that failed, by label
    pub failures: Vec<(String, ParseError)>,
    pub models: usize,
    pub sources: usize,
    pub exposures: usize,
    pub metrics: usize,
    pub warehouse: Option<WarehouseKind>,
    /// Model names defined more than once; the last definition is indexed
    pub duplicates: Vec<String>,
}

impl SyncReport {
    /// Check if every schema document parsed
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Registry plus the report describing how it was built
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub registry: ModelRegistry,
    pub report: SyncReport,
}

/// Builds registries from project and schema document text.
#[derive(Default)]
pub struct ProjectLoader {
    cache: Option<Arc<DocumentCache>>,
    warehouse_override: Option<WarehouseKind>,
}

impl ProjectLoader {
    /// Create a loader, optionally backed by a document cache
    pub fn new(cache: Option<Arc<DocumentCache>>) -> Self {
        Self {
            cache,
            warehouse_override: None,
        }
    }

    /// Use `kind` instead of inferring the warehouse from the project
    pub fn with_warehouse(mut self, kind: Option<WarehouseKind>) -> Self {
        self.warehouse_override = kind;
        self
    }

    /// Parse every document and build a registry.
    ///
    /// A project document that fails to parse aborts the load. Schema
    /// documents that fail are recorded in the report and skipped.
    pub fn load<I, L, T>(
        &self,
        project_text: &str,
        schema_docs: I,
    ) -> Result<SyncOutcome, ParseError>
    where
        I: IntoIterator<Item = (L, T)>,
        L: Into<String>,
        T: AsRef<str>,
    {
        info!("Loading dbt project");
        let mut project = self.parse_project(project_text)?;
        let mut report = SyncReport::default();
        let mut merged = SchemaDocument::default();

        for (label, text) in schema_docs {
            let label = label.into();
            match self.parse_schema(text.as_ref(), &project.config.models) {
                Ok(doc) => {
                    debug!(
                        document = %label,
                        models = doc.models.len(),
                        sources = doc.sources.len(),
                        "Parsed schema document"
                    );
                    merged.extend(doc);
                    report.documents_parsed += 1;
                }
                Err(e) => {
                    warn!(document = %label, error = %e, "Skipping schema document");
                    report.failures.push((label, e));
                }
            }
        }

        project.models = merged.models;
        project.sources = merged.sources;
        project.exposures = merged.exposures;
        project.metrics = merged.metrics;

        let warehouse = self
            .warehouse_override
            .or_else(|| infer_warehouse_kind(&project.config));
        debug!(warehouse = ?warehouse, "Resolved warehouse");

        report.models = project.models.len();
        report.sources = project.sources.len();
        report.exposures = project.exposures.len();
        report.metrics = project.metrics.len();
        report.warehouse = warehouse;

        let registry = ModelRegistry::new(project, warehouse.map(WarehouseBinding::new));
        report.duplicates = registry.index_report().duplicates.clone();

        info!(
            models = report.models,
            sources = report.sources,
            documents = report.documents_parsed,
            failures = report.failures.len(),
            duplicates = report.duplicates.len(),
            "Project loaded"
        );

        Ok(SyncOutcome { registry, report })
    }

    fn parse_project(&self, text: &str) -> Result<Project, ParseError> {
        match self.cache {
            Some(ref cache) => parse_project_cached(text, cache),
            None => parse_project(text),
        }
    }

    fn parse_schema(
        &self,
        text: &str,
        models_tree: &Metadata,
    ) -> Result<SchemaDocument, ParseError> {
        match self.cache {
            Some(ref cache) => parse_schema_cached(text, Some(models_tree), cache),
            None => parse_schema_document(text, Some(models_tree)),
        }
    }
}

/// Check whether a project synced at `last_sync` is due for a reload.
///
/// A project that never synced is always due.
pub fn should_refresh(last_sync: Option<Instant>, ttl: Duration) -> bool {
    match last_sync {
        Some(at) => at.elapsed() >= ttl,
        None => true,
    }
}
