//! Stats command - Project and parse cache summary

use anyhow::Result;
use clap::Args;
use dbtctx_config::DbtCtxConfig;
use dbtctx_core::{global_document_cache, CacheStats, MemoryUsage, RegistryStats};
use serde::Serialize;

use super::{cache_settings, load_project, print_json, OutputFormat};
use crate::GlobalOptions;

/// Arguments for the stats command
#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Output format: text (default), json
    #[arg(long, short = 'o', default_value = "text")]
    output: OutputFormat,
}

#[derive(Debug, Serialize)]
struct StatsReport {
    registry: RegistryStats,
    documents_parsed: usize,
    failed_documents: Vec<String>,
    duplicate_models: Vec<String>,
    cache: Option<CacheReport>,
}

#[derive(Debug, Serialize)]
struct CacheReport {
    stats: CacheStats,
    memory: MemoryUsage,
}

/// Execute the stats command
pub fn execute(args: StatsArgs, global: &GlobalOptions, config: &DbtCtxConfig) -> Result<()> {
    let outcome = load_project(global, config)?;

    let cache = config.cache.enabled.then(|| {
        let cache = global_document_cache(cache_settings(config));
        CacheReport {
            stats: cache.cache_stats(),
            memory: cache.memory_usage_estimate(),
        }
    });

    let report = StatsReport {
        registry: outcome.registry.stats(),
        documents_parsed: outcome.report.documents_parsed,
        failed_documents: outcome
            .report
            .failures
            .iter()
            .map(|(label, _)| label.clone())
            .collect(),
        duplicate_models: outcome.report.duplicates.clone(),
        cache,
    };

    match args.output {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => print_report(&report),
    }

    Ok(())
}

fn print_report(report: &StatsReport) {
    let registry = &report.registry;

    println!("Project: {}", registry.project);
    println!(
        "Warehouse: {}",
        registry.warehouse.as_deref().unwrap_or("unknown")
    );
    println!();
    println!("Models:      {}", registry.models);
    println!(
        "Sources:     {} ({} tables)",
        registry.sources, registry.source_tables
    );
    println!("Exposures:   {}", registry.exposures);
    println!("Metrics:     {}", registry.metrics);
    println!("Tags:        {}", registry.tags);
    println!("Schemas:     {}", registry.schemas);

    if !registry.materializations.is_empty() {
        println!("\nMaterializations:");
        for (kind, count) in &registry.materializations {
            println!("  {:<12} {}", kind, count);
        }
    }

    println!("\nSchema documents: {}", report.documents_parsed);
    for label in &report.failed_documents {
        println!("  failed: {}", label);
    }

    if !report.duplicate_models.is_empty() {
        println!("\nDuplicate models (last definition kept):");
        for name in &report.duplicate_models {
            println!("  {}", name);
        }
    }

    if let Some(ref cache) = report.cache {
        println!("\nParse cache:");
        println!(
            "  Entries:  {}/{}",
            cache.stats.cache_size, cache.stats.max_size
        );
        println!(
            "  Requests: {} ({} hits, {} misses, {:.1}% hit rate)",
            cache.stats.total_requests,
            cache.stats.hits,
            cache.stats.misses,
            cache.stats.hit_rate * 100.0
        );
        println!("  Memory:   {:.2} MB", cache.memory.estimated_mb);
    }
}
