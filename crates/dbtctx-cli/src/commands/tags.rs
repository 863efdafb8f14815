//! Tags command - List tags and the models carrying them

use std::collections::BTreeMap;

use anyhow::Result;
use clap::Args;
use dbtctx_config::DbtCtxConfig;

use super::{load_project, print_json, OutputFormat};
use crate::GlobalOptions;

/// Arguments for the tags command
#[derive(Args, Debug)]
pub struct TagsArgs {
    /// Only show models for this tag
    tag: Option<String>,

    /// Output format: text (default), json
    #[arg(long, short = 'o', default_value = "text")]
    output: OutputFormat,
}

/// Execute the tags command
pub fn execute(args: TagsArgs, global: &GlobalOptions, config: &DbtCtxConfig) -> Result<()> {
    let outcome = load_project(global, config)?;
    let registry = &outcome.registry;

    let tags = match args.tag {
        Some(tag) => vec![tag],
        None => registry.get_all_tags(),
    };

    let mut by_tag: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for tag in tags {
        let mut names: Vec<String> = registry
            .get_by_tag(&tag)
            .into_iter()
            .map(|m| m.name.clone())
            .collect();
        // A model tagged at both levels appears twice in the index
        names.dedup();
        by_tag.insert(tag, names);
    }

    match args.output {
        OutputFormat::Json => print_json(&by_tag)?,
        OutputFormat::Text => {
            if by_tag.is_empty() && !global.quiet {
                eprintln!("No tags defined");
            }
            for (tag, models) in &by_tag {
                println!("{} ({})", tag, models.len());
                for name in models {
                    println!("  {}", name);
                }
            }
        }
    }

    Ok(())
}
