//! Search command - Ranked model search

use anyhow::Result;
use clap::Args;
use dbtctx_config::DbtCtxConfig;
use dbtctx_core::{score_models, SearchFilters};
use serde::Serialize;

use super::{load_project, print_json, OutputFormat};
use crate::GlobalOptions;

/// Arguments for the search command
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search term, matched case-insensitively
    query: String,

    /// Keep models carrying this tag (repeatable, any match)
    #[arg(long, short = 't')]
    tag: Vec<String>,

    /// Keep models configured into this schema
    #[arg(long, short = 's')]
    schema: Option<String>,

    /// Keep models with this materialization (table, view, incremental, ...)
    #[arg(long, short = 'm')]
    materialization: Option<String>,

    /// Maximum number of results to return
    #[arg(long, short = 'n', default_value = "10")]
    limit: usize,

    /// Output format: text (default), json
    #[arg(long, short = 'o', default_value = "text")]
    output: OutputFormat,
}

/// One ranked result
#[derive(Debug, Serialize)]
struct SearchResult<'a> {
    name: &'a str,
    score: u32,
    materialization: &'static str,
    relation: String,
    description: Option<&'a str>,
}

/// Execute the search command
pub fn execute(args: SearchArgs, global: &GlobalOptions, config: &DbtCtxConfig) -> Result<()> {
    let outcome = load_project(global, config)?;

    let mut filters = SearchFilters::new().with_tags(args.tag);
    if let Some(schema) = args.schema {
        filters = filters.with_schema(schema);
    }
    if let Some(materialization) = args.materialization {
        filters = filters.with_materialization(materialization.to_lowercase());
    }

    let hits = score_models(outcome.registry.models(), &args.query, &filters);
    let results: Vec<SearchResult<'_>> = hits
        .into_iter()
        .take(args.limit)
        .map(|hit| SearchResult {
            name: &hit.model.name,
            score: hit.score,
            materialization: hit.model.get_materialization(),
            relation: hit.model.get_full_name(),
            description: hit.model.description.as_deref(),
        })
        .collect();

    if results.is_empty() {
        if !global.quiet {
            eprintln!("No models found for: {}", args.query);
        }
        return Ok(());
    }

    match args.output {
        OutputFormat::Json => print_json(&results)?,
        OutputFormat::Text => {
            if !global.quiet {
                println!("Found {} models for \"{}\":\n", results.len(), args.query);
            }

            for (i, result) in results.iter().enumerate() {
                println!("{}. {} ({})", i + 1, result.name, result.materialization);
                println!("   {}", result.relation);
                println!("   Score: {}", result.score);
                if let Some(description) = result.description {
                    println!("   {}", description);
                }
                println!();
            }
        }
    }

    Ok(())
}
