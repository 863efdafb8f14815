//! Config command - View and initialize configuration
//!
//! - Show the effective configuration and the files it was read from
//! - Create a default local or global configuration file

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use dbtctx_config::{ConfigLoader, DbtCtxConfig};
use serde::Serialize;

use super::{print_info, print_json};
use crate::GlobalOptions;

/// Config management commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show(ShowArgs),

    /// Create a configuration file with default values
    Init(InitArgs),
}

/// Arguments for the show command
#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Arguments for the init command
#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Create the global config (~/.dbtctx/config.toml) instead of the local one
    #[arg(long)]
    global: bool,
}

/// Configuration paths
#[derive(Debug, Clone, Serialize)]
struct ConfigPaths {
    global: Option<PathBuf>,
    local: PathBuf,
    global_exists: bool,
    local_exists: bool,
}

#[derive(Debug, Serialize)]
struct ShowOutput<'a> {
    paths: ConfigPaths,
    effective: &'a DbtCtxConfig,
}

/// Execute the config command
pub fn execute(cmd: ConfigCommand, global: &GlobalOptions, config: &DbtCtxConfig) -> Result<()> {
    match cmd {
        ConfigCommand::Show(args) => execute_show(args, global, config),
        ConfigCommand::Init(args) => execute_init(args, global),
    }
}

fn execute_show(args: ShowArgs, global: &GlobalOptions, config: &DbtCtxConfig) -> Result<()> {
    let loader = ConfigLoader::new();
    let global_path = loader.global_config_path();
    let local_path = global
        .config
        .clone()
        .unwrap_or_else(|| loader.local_config_path(&global.project_dir));

    let paths = ConfigPaths {
        global_exists: global_path.as_ref().is_some_and(|p| p.exists()),
        local_exists: local_path.exists(),
        global: global_path,
        local: local_path,
    };

    if args.json {
        return print_json(&ShowOutput {
            paths,
            effective: config,
        });
    }

    println!("Configuration Paths");
    println!("===================\n");
    match paths.global {
        Some(ref gp) => println!("Global: {} ({})", gp.display(), status(paths.global_exists)),
        None => println!("Global: not available (no home directory)"),
    }
    println!(
        "Local:  {} ({})",
        paths.local.display(),
        status(paths.local_exists)
    );

    let text = toml::to_string_pretty(config).context("Failed to render configuration")?;
    println!("\nEffective Configuration");
    println!("=======================\n");
    println!("{}", text.trim_end());

    Ok(())
}

fn execute_init(args: InitArgs, global: &GlobalOptions) -> Result<()> {
    let loader = ConfigLoader::new();

    let path = if args.global {
        loader
            .init_global()
            .context("Failed to create global config")?
    } else {
        loader
            .init_local(&global.project_dir)
            .context("Failed to create local config")?
    };

    print_info(&format!("Configuration at {}", path.display()), global.quiet);
    Ok(())
}

fn status(exists: bool) -> &'static str {
    if exists {
        "exists"
    } else {
        "not found"
    }
}
