//! Model command - Show one model in detail

use anyhow::Result;
use clap::Args;
use dbtctx_config::DbtCtxConfig;
use dbtctx_core::{DataTest, Model};

use super::{load_project, print_json, require_model, OutputFormat};
use crate::GlobalOptions;

/// Arguments for the model command
#[derive(Args, Debug)]
pub struct ModelArgs {
    /// Model name (case-insensitive)
    name: String,

    /// Output format: text (default), json
    #[arg(long, short = 'o', default_value = "text")]
    output: OutputFormat,
}

/// Execute the model command
pub fn execute(args: ModelArgs, global: &GlobalOptions, config: &DbtCtxConfig) -> Result<()> {
    let outcome = load_project(global, config)?;
    let model = require_model(&outcome, &args.name)?;

    match args.output {
        OutputFormat::Json => print_json(model)?,
        OutputFormat::Text => print_model(model),
    }

    Ok(())
}

fn print_model(model: &Model) {
    println!("{}", model.name);
    println!("{}\n", "=".repeat(model.name.len()));

    if let Some(ref description) = model.description {
        println!("{}\n", description);
    }

    println!("Relation:        {}", model.get_full_name());
    println!("Materialization: {}", model.get_materialization());
    if let Some(ref key) = model.config.unique_key {
        println!("Unique key:      {}", key);
    }
    if !model.config.enabled {
        println!("Enabled:         false");
    }

    let tags: Vec<&str> = model.all_tags().map(String::as_str).collect();
    if !tags.is_empty() {
        println!("Tags:            {}", tags.join(", "));
    }
    if !model.refs.is_empty() {
        println!("Refs:            {}", model.refs.join(", "));
    }
    if !model.sources.is_empty() {
        println!("Sources:         {}", model.sources.join(", "));
    }

    if !model.columns.is_empty() {
        println!("\nColumns ({}):", model.columns.len());
        for column in &model.columns {
            let data_type = column.data_type.as_deref().unwrap_or("-");
            let tests = describe_tests(&column.tests);
            println!("  {:<28} {:<12} {}", column.name, data_type, tests);
        }
    }

    if !model.tests.is_empty() {
        println!("\nModel tests: {}", describe_tests(&model.tests));
    }
}

fn describe_tests(tests: &[DataTest]) -> String {
    tests
        .iter()
        .map(|t| t.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
