//! Direct model dependencies.
//!
//! Upstream edges come straight from each model's `refs` followed by its
//! `sources`. Downstream edges are derived by inverting upstream edges whose
//! target is another model. Only depth-1 edges are computed.

use std::collections::HashMap;

use serde::{Serialize, Serializer};

use crate::models::Model;

/// Upstream and downstream names for one model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModelLineage {
    pub upstream: Vec<String>,
    pub downstream: Vec<String>,
}

/// Per-model lineage in model order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lineage {
    entries: Vec<(String, ModelLineage)>,
    positions: HashMap<String, usize>,
}

impl Lineage {
    /// Lineage for `name`, matched exactly
    pub fn get(&self, name: &str) -> Option<&ModelLineage> {
        self.positions.get(name).map(|&idx| &self.entries[idx].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModelLineage)> {
        self.entries.iter().map(|(name, edges)| (name.as_str(), edges))
    }

    /// Insert or replace; a replaced name keeps its original position.
    fn insert(&mut self, name: String, edges: ModelLineage) {
        match self.positions.get(&name) {
            Some(&idx) => self.entries[idx].1 = edges,
            None => {
                self.positions.insert(name.clone(), self.entries.len());
                self.entries.push((name, edges));
            }
        }
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut ModelLineage> {
        let idx = *self.positions.get(name)?;
        Some(&mut self.entries[idx].1)
    }
}

// Serialized as a JSON object keyed by model name, in model order
impl Serialize for Lineage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

/// Compute direct upstream/downstream edges for `models`.
pub fn extract_basic_lineage(models: &[Model]) -> Lineage {
    let mut lineage = Lineage::default();

    for model in models {
        let upstream = model
            .refs
            .iter()
            .chain(model.sources.iter())
            .cloned()
            .collect();
        lineage.insert(
            model.name.clone(),
            ModelLineage {
                upstream,
                downstream: Vec::new(),
            },
        );
    }

    let edges: Vec<(String, String)> = lineage
        .iter()
        .flat_map(|(dependent, edges)| {
            edges
                .upstream
                .iter()
                .map(move |upstream| (upstream.clone(), dependent.to_string()))
        })
        .collect();

    for (upstream, dependent) in edges {
        if let Some(target) = lineage.get_mut(&upstream) {
            target.downstream.push(dependent);
        }
    }

    lineage
}
