//! Context command - One-page overview of the project
//!
//! Schema sizes, every model with its materialization and a short
//! description, and the tag list. Meant to be pasted into a prompt or a
//! ticket as background on the project.

use anyhow::Result;
use clap::Args;
use dbtctx_config::DbtCtxConfig;
use dbtctx_core::{Model, ModelRegistry};
use serde::Serialize;

use super::{load_project, print_json, OutputFormat};
use crate::GlobalOptions;

/// Descriptions longer than this are cut
const DESCRIPTION_CHARS: usize = 100;

/// Column names listed per model
const COLUMNS_SHOWN: usize = 10;

/// Arguments for the context command
#[derive(Args, Debug)]
pub struct ContextArgs {
    /// Maximum number of models to list
    #[arg(long, short = 'l', default_value = "50")]
    limit: usize,

    /// Output format: text (default), json
    #[arg(long, short = 'o', default_value = "text")]
    output: OutputFormat,
}

#[derive(Debug, Serialize)]
struct ProjectContext {
    project: String,
    models: usize,
    sources: usize,
    /// Schema name → number of models
    schemas: Vec<(String, usize)>,
    listed: Vec<ModelSummary>,
    tags: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ModelSummary {
    name: String,
    materialization: &'static str,
    description: Option<String>,
    columns: Vec<String>,
}

impl ModelSummary {
    fn from_model(model: &Model) -> Self {
        Self {
            name: model.name.clone(),
            materialization: model.get_materialization(),
            description: model.description.as_deref().map(truncate),
            columns: model
                .columns
                .iter()
                .take(COLUMNS_SHOWN)
                .map(|c| c.name.clone())
                .collect(),
        }
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(DESCRIPTION_CHARS).collect()
}

fn build_context(registry: &ModelRegistry, limit: usize) -> ProjectContext {
    let models = registry.indexed_models();
    ProjectContext {
        project: registry.project().config.name.clone(),
        models: models.len(),
        sources: registry.project().sources.len(),
        schemas: registry
            .models_by_schema(None, None)
            .into_iter()
            .map(|(schema, names)| (schema, names.len()))
            .collect(),
        listed: models
            .into_iter()
            .take(limit)
            .map(ModelSummary::from_model)
            .collect(),
        tags: registry.get_all_tags(),
    }
}

/// Execute the context command
pub fn execute(args: ContextArgs, global: &GlobalOptions, config: &DbtCtxConfig) -> Result<()> {
    let outcome = load_project(global, config)?;
    let context = build_context(&outcome.registry, args.limit);

    match args.output {
        OutputFormat::Json => print_json(&context)?,
        OutputFormat::Text => print_context(&context),
    }

    Ok(())
}

fn print_context(context: &ProjectContext) {
    println!("# {}", context.project);
    println!();
    println!("Models:  {}", context.models);
    println!("Sources: {}", context.sources);

    println!("\n## Schemas ({})", context.schemas.len());
    for (schema, count) in &context.schemas {
        println!("- {}: {} models", schema, count);
    }

    println!("\n## Models");
    for model in &context.listed {
        println!(
            "- {} ({}): {}",
            model.name,
            model.materialization,
            model.description.as_deref().unwrap_or("No description")
        );
        if !model.columns.is_empty() {
            println!("  Columns: {}", model.columns.join(", "));
        }
    }
    if context.listed.len() < context.models {
        println!("  ... {} more", context.models - context.listed.len());
    }

    if !context.tags.is_empty() {
        println!("\n## Tags: {}", context.tags.join(", "));
    }
}
