//! Lineage command - Direct upstream and downstream dependencies

use anyhow::Result;
use clap::Args;
use dbtctx_config::DbtCtxConfig;

use super::{load_project, print_json, require_model, OutputFormat};
use crate::GlobalOptions;

/// Arguments for the lineage command
#[derive(Args, Debug)]
pub struct LineageArgs {
    /// Model name (case-insensitive)
    model: String,

    /// Output format: text (default), json
    #[arg(long, short = 'o', default_value = "text")]
    output: OutputFormat,
}

/// Execute the lineage command
pub fn execute(args: LineageArgs, global: &GlobalOptions, config: &DbtCtxConfig) -> Result<()> {
    let outcome = load_project(global, config)?;
    let registry = &outcome.registry;
    let model = require_model(&outcome, &args.model)?;
    let lineage = registry.lineage_for(&model.name).unwrap_or_default();

    match args.output {
        OutputFormat::Json => print_json(&lineage)?,
        OutputFormat::Text => {
            println!("{}", model.name);

            println!("\nUpstream ({}):", lineage.upstream.len());
            for name in &lineage.upstream {
                if registry.is_external(name) {
                    println!("  {} (source)", name);
                } else {
                    println!("  {}", name);
                }
            }

            println!("\nDownstream ({}):", lineage.downstream.len());
            for name in &lineage.downstream {
                println!("  {}", name);
            }
        }
    }

    Ok(())
}
