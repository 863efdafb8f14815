//! Column command - Show one column of a model

use anyhow::Result;
use clap::Args;
use dbtctx_config::DbtCtxConfig;
use dbtctx_core::Metadata;

use super::{load_project, print_json, require_model, OutputFormat};
use crate::GlobalOptions;

/// Arguments for the column command
#[derive(Args, Debug)]
pub struct ColumnArgs {
    /// Model name (case-insensitive)
    model: String,

    /// Column name (case-insensitive)
    column: String,

    /// Output format: text (default), json
    #[arg(long, short = 'o', default_value = "text")]
    output: OutputFormat,
}

/// Execute the column command
pub fn execute(args: ColumnArgs, global: &GlobalOptions, config: &DbtCtxConfig) -> Result<()> {
    let outcome = load_project(global, config)?;
    let model = require_model(&outcome, &args.model)?;
    let column = model.get_column_by_name(&args.column).ok_or_else(|| {
        anyhow::anyhow!("Column '{}' not found in model '{}'", args.column, model.name)
    })?;

    match args.output {
        OutputFormat::Json => print_json(column)?,
        OutputFormat::Text => {
            println!("{}.{}", model.name, column.name);
            if let Some(ref description) = column.description {
                println!("  {}", description);
            }
            println!("  Type:        {}", column.data_type.as_deref().unwrap_or("-"));
            if !column.constraints.is_empty() {
                println!("  Constraints: {}", column.constraints.join(", "));
            }
            if !column.tags.is_empty() {
                println!("  Tags:        {}", column.tags.join(", "));
            }
            if !column.meta.is_empty() {
                println!("  Meta:        {}", compact(&column.meta));
            }
            for test in &column.tests {
                println!("  Test:        {} ({})", test.name, test.severity);
                if !test.kwargs.is_empty() {
                    println!("               {}", compact(&test.kwargs));
                }
            }
        }
    }

    Ok(())
}

/// Render a metadata map on one line
fn compact(map: &Metadata) -> String {
    serde_json::to_string(map).unwrap_or_default()
}
