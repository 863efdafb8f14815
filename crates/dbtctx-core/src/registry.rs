//! Metadata Registry
//!
//! Owns a parsed [`Project`] and four cross-reference indices over its
//! models:
//!
//! - **name**: lowercased model name → model (last definition wins)
//! - **tag**: tag → model names, one entry per tag occurrence
//! - **schema**: configured schema → model names
//! - **materialization**: resolved materialization → model names
//!
//! Indices are rebuilt from scratch by [`ModelRegistry::build_indices`].
//! The registry has no interior locking; callers sharing one across threads
//! must serialize rebuilds against reads.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::{debug, warn};

use crate::lineage::{extract_basic_lineage, Lineage, ModelLineage};
use crate::models::{Model, Project, WarehouseBinding, WarehouseKind};
use crate::search::{search_models, SearchFilters};

/// Group holding models without a configured schema
pub const DEFAULT_SCHEMA_GROUP: &str = "default";

/// Cross-reference indices, rebuilt together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryIndices {
    /// Lowercased name → position in the project's model list
    pub by_name: HashMap<String, usize>,
    pub by_tag: BTreeMap<String, Vec<String>>,
    pub by_schema: BTreeMap<String, Vec<String>>,
    pub by_materialization: BTreeMap<String, Vec<String>>,
}

/// Outcome of an index rebuild
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    /// Models indexed (including shadowed duplicates)
    pub models: usize,
    /// Names defined more than once, in first-duplicate order
    pub duplicates: Vec<String>,
}

/// Counts describing the indexed project
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub project: String,
    pub models: usize,
    pub sources: usize,
    pub source_tables: usize,
    pub exposures: usize,
    pub metrics: usize,
    pub tags: usize,
    pub schemas: usize,
    pub materializations: BTreeMap<String, usize>,
    pub warehouse: Option<String>,
}

/// Indexed view over one project.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    project: Project,
    warehouse: Option<WarehouseBinding>,
    indices: RegistryIndices,
    /// Outcome of the most recent rebuild
    index_report: IndexReport,
}

impl ModelRegistry {
    /// Create a registry and build its indices.
    pub fn new(project: Project, warehouse: Option<WarehouseBinding>) -> Self {
        let mut registry = Self {
            project,
            warehouse,
            indices: RegistryIndices::default(),
            index_report: IndexReport::default(),
        };
        registry.build_indices();
        registry
    }

    /// Create a registry from a warehouse name hint.
    ///
    /// An unrecognized hint leaves the registry unbound.
    pub fn build(project: Project, warehouse_hint: Option<&str>) -> Self {
        let warehouse = warehouse_hint.and_then(|hint| match hint.parse::<WarehouseKind>() {
            Ok(kind) => Some(WarehouseBinding::new(kind)),
            Err(e) => {
                debug!(error = %e, "Ignoring warehouse hint");
                None
            }
        });
        Self::new(project, warehouse)
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn warehouse(&self) -> Option<&WarehouseBinding> {
        self.warehouse.as_ref()
    }

    pub fn indices(&self) -> &RegistryIndices {
        &self.indices
    }

    /// Report from the last index rebuild, including duplicate names
    pub fn index_report(&self) -> &IndexReport {
        &self.index_report
    }

    pub fn models(&self) -> &[Model] {
        &self.project.models
    }

    /// Replace the model list and rebuild.
    pub fn replace_models(&mut self, models: Vec<Model>) -> IndexReport {
        self.project.models = models;
        self.build_indices()
    }

    /// Clear and rebuild all four indices from the current model list.
    pub fn build_indices(&mut self) -> IndexReport {
        let mut indices = RegistryIndices::default();
        let mut duplicates: Vec<String> = Vec::new();

        for (idx, model) in self.project.models.iter().enumerate() {
            let key = model.name.to_lowercase();
            if indices.by_name.insert(key, idx).is_some() && !duplicates.contains(&model.name) {
                duplicates.push(model.name.clone());
            }

            for tag in model.all_tags() {
                indices
                    .by_tag
                    .entry(tag.clone())
                    .or_default()
                    .push(model.name.clone());
            }

            if let Some(ref schema) = model.config.schema {
                indices
                    .by_schema
                    .entry(schema.clone())
                    .or_default()
                    .push(model.name.clone());
            }

            indices
                .by_materialization
                .entry(model.get_materialization().to_string())
                .or_default()
                .push(model.name.clone());
        }

        for name in &duplicates {
            warn!(model = %name, "Duplicate model name, keeping the last definition");
        }

        self.indices = indices;
        debug!(
            models = self.project.models.len(),
            tags = self.indices.by_tag.len(),
            schemas = self.indices.by_schema.len(),
            "Built registry indices"
        );

        self.index_report = IndexReport {
            models: self.project.models.len(),
            duplicates,
        };
        self.index_report.clone()
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    /// Find a model by case-insensitive name
    pub fn get_model(&self, name: &str) -> Option<&Model> {
        self.indices
            .by_name
            .get(&name.to_lowercase())
            .and_then(|&idx| self.project.models.get(idx))
    }

    /// Models carrying `tag`, in index order
    pub fn get_by_tag(&self, tag: &str) -> Vec<&Model> {
        self.resolve(self.indices.by_tag.get(tag))
    }

    /// Models configured into `schema`, in index order
    pub fn get_by_schema(&self, schema: &str) -> Vec<&Model> {
        self.resolve(self.indices.by_schema.get(schema))
    }

    /// Models with the given resolved materialization, in index order
    pub fn get_by_materialization(&self, materialization: &str) -> Vec<&Model> {
        self.resolve(self.indices.by_materialization.get(materialization))
    }

    fn resolve(&self, names: Option<&Vec<String>>) -> Vec<&Model> {
        names
            .map(|names| names.iter().filter_map(|n| self.get_model(n)).collect())
            .unwrap_or_default()
    }

    /// Models reachable by name, one per name, in definition order
    pub fn indexed_models(&self) -> Vec<&Model> {
        let mut positions: Vec<usize> = self.indices.by_name.values().copied().collect();
        positions.sort_unstable();
        positions
            .into_iter()
            .filter_map(|idx| self.project.models.get(idx))
            .collect()
    }

    /// Model names grouped by schema, optionally narrowed to one schema and
    /// one materialization.
    ///
    /// Models without a schema fall under [`DEFAULT_SCHEMA_GROUP`]. Groups
    /// and the names inside each group are sorted.
    pub fn models_by_schema(
        &self,
        schema: Option<&str>,
        materialization: Option<&str>,
    ) -> BTreeMap<String, Vec<String>> {
        let candidates = match (schema, materialization) {
            (_, Some(kind)) => self.get_by_materialization(kind),
            (Some(schema), None) if schema != DEFAULT_SCHEMA_GROUP => self.get_by_schema(schema),
            _ => self.indexed_models(),
        };

        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for model in candidates {
            let group = model
                .config
                .schema
                .as_deref()
                .unwrap_or(DEFAULT_SCHEMA_GROUP);
            if schema.is_some_and(|wanted| wanted != group) {
                continue;
            }
            groups
                .entry(group.to_string())
                .or_default()
                .push(model.name.clone());
        }
        for names in groups.values_mut() {
            names.sort();
            // Duplicate index entries resolve to the same model
            names.dedup();
        }
        groups
    }

    /// Every indexed tag, sorted
    pub fn get_all_tags(&self) -> Vec<String> {
        self.indices.by_tag.keys().cloned().collect()
    }

    /// Every configured schema, sorted
    pub fn schemas(&self) -> Vec<String> {
        self.indices.by_schema.keys().cloned().collect()
    }

    /// Ranked search over the project's models
    pub fn search(&self, query: &str, filters: &SearchFilters) -> Vec<&Model> {
        search_models(&self.project.models, query, filters)
    }

    // ========================================================================
    // Lineage
    // ========================================================================

    /// Direct lineage for every model
    pub fn lineage(&self) -> Lineage {
        extract_basic_lineage(&self.project.models)
    }

    /// Direct lineage for one model, `None` if it is not defined
    pub fn lineage_for(&self, name: &str) -> Option<ModelLineage> {
        let model = self.get_model(name)?;
        self.lineage().get(&model.name).cloned()
    }

    /// Check whether an upstream name refers to something other than a model
    pub fn is_external(&self, name: &str) -> bool {
        self.get_model(name).is_none()
    }

    /// Relation name of a model in the warehouse
    pub fn warehouse_location(&self, name: &str) -> Option<String> {
        self.get_model(name).map(Model::get_full_name)
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            project: self.project.config.name.clone(),
            models: self.project.models.len(),
            sources: self.project.sources.len(),
            source_tables: self.project.sources.iter().map(|s| s.tables.len()).sum(),
            exposures: self.project.exposures.len(),
            metrics: self.project.metrics.len(),
            tags: self.indices.by_tag.len(),
            schemas: self.indices.by_schema.len(),
            materializations: self
                .indices
                .by_materialization
                .iter()
                .map(|(kind, names)| (kind.clone(), names.len()))
                .collect(),
            warehouse: self.warehouse.as_ref().map(|w| w.kind.to_string()),
        }
    }
}
