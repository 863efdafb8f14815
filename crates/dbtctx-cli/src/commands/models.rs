//! Models command - List models grouped by schema

use anyhow::Result;
use clap::Args;
use dbtctx_config::DbtCtxConfig;

use super::{load_project, print_info, print_json, OutputFormat};
use crate::GlobalOptions;

/// Arguments for the models command
#[derive(Args, Debug)]
pub struct ModelsArgs {
    /// Only list models in this schema ("default" for models without one)
    #[arg(long, short = 's')]
    schema: Option<String>,

    /// Only list models with this materialization
    #[arg(long, short = 'm')]
    materialization: Option<String>,

    /// Output format: text (default), json
    #[arg(long, short = 'o', default_value = "text")]
    output: OutputFormat,
}

/// Execute the models command
pub fn execute(args: ModelsArgs, global: &GlobalOptions, config: &DbtCtxConfig) -> Result<()> {
    let outcome = load_project(global, config)?;
    let materialization = args.materialization.as_deref().map(str::to_lowercase);
    let groups = outcome
        .registry
        .models_by_schema(args.schema.as_deref(), materialization.as_deref());

    if let OutputFormat::Json = args.output {
        return print_json(&groups);
    }

    if groups.is_empty() {
        let scope = args
            .schema
            .map(|s| format!(" in schema {}", s))
            .unwrap_or_default();
        print_info(&format!("No models found{}", scope), global.quiet);
        return Ok(());
    }

    let total: usize = groups.values().map(Vec::len).sum();
    println!("Models ({} total)", total);
    for (schema, names) in &groups {
        println!("\n{} ({})", schema, names.len());
        for name in names {
            println!("  {}", name);
        }
    }

    Ok(())
}
