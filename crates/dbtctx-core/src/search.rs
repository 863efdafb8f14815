//! Model Search
//!
//! Case-insensitive substring scoring over model metadata:
//!
//! | Match                      | Points |
//! |----------------------------|--------|
//! | name                       | 10     |
//! | description                | 5      |
//! | column name (per column)   | 3      |
//! | column description (each)  | 2      |
//! | tag (per tag)              | 4      |
//!
//! Models scoring zero are dropped before filters run. Results are ordered by
//! descending score; ties keep input order.

use serde::{Deserialize, Serialize};

use crate::models::Model;

const NAME_WEIGHT: u32 = 10;
const DESCRIPTION_WEIGHT: u32 = 5;
const COLUMN_NAME_WEIGHT: u32 = 3;
const COLUMN_DESCRIPTION_WEIGHT: u32 = 2;
const TAG_WEIGHT: u32 = 4;

/// Optional narrowing applied to scored models.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Keep models carrying any of these tags
    pub tags: Vec<String>,
    /// Keep models configured into exactly this schema
    pub schema: Option<String>,
    /// Keep models with exactly this resolved materialization
    pub materialization: Option<String>,
}

impl SearchFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_materialization(mut self, materialization: impl Into<String>) -> Self {
        self.materialization = Some(materialization.into());
        self
    }

    /// Check if no filter is set
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.schema.is_none() && self.materialization.is_none()
    }

    /// Check whether a model passes every set filter
    pub fn matches(&self, model: &Model) -> bool {
        if !self.tags.is_empty() && !self.tags.iter().any(|tag| model.has_tag(tag)) {
            return false;
        }
        if let Some(ref schema) = self.schema {
            if model.config.schema.as_deref() != Some(schema.as_str()) {
                return false;
            }
        }
        if let Some(ref materialization) = self.materialization {
            if model.get_materialization() != materialization {
                return false;
            }
        }
        true
    }
}

/// A model with its relevance score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit<'a> {
    pub model: &'a Model,
    pub score: u32,
}

/// Score one model against an already lowercased query.
pub fn score_model(model: &Model, query_lower: &str) -> u32 {
    let contains = |haystack: &str| haystack.to_lowercase().contains(query_lower);
    let mut score = 0;

    if contains(&model.name) {
        score += NAME_WEIGHT;
    }
    if model.description.as_deref().is_some_and(contains) {
        score += DESCRIPTION_WEIGHT;
    }

    for column in &model.columns {
        if contains(&column.name) {
            score += COLUMN_NAME_WEIGHT;
        }
        if column.description.as_deref().is_some_and(contains) {
            score += COLUMN_DESCRIPTION_WEIGHT;
        }
    }

    let tag_matches = model.all_tags().filter(|tag| contains(tag)).count() as u32;
    score + tag_matches * TAG_WEIGHT
}

/// Score, filter and rank models, keeping the scores.
pub fn score_models<'a>(
    models: &'a [Model],
    query: &str,
    filters: &SearchFilters,
) -> Vec<SearchHit<'a>> {
    let query_lower = query.to_lowercase();

    let mut hits: Vec<SearchHit<'a>> = models
        .iter()
        .map(|model| SearchHit {
            model,
            score: score_model(model, &query_lower),
        })
        .filter(|hit| hit.score > 0)
        .filter(|hit| filters.matches(hit.model))
        .collect();

    // sort_by is stable, ties keep input order
    hits.sort_by(|a, b| b.score.cmp(&a.score));
    hits
}

/// Score, filter and rank models.
pub fn search_models<'a>(
    models: &'a [Model],
    query: &str,
    filters: &SearchFilters,
) -> Vec<&'a Model> {
    score_models(models, query, filters)
        .into_iter()
        .map(|hit| hit.model)
        .collect()
}
