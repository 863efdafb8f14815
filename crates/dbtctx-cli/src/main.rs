//! dbtctx CLI - Explore dbt project metadata from the command line
//!
//! Loads a dbt project from disk (`dbt_project.yml` plus schema documents),
//! builds the in-memory registry and answers queries against it.
//!
//! # Usage
//!
//! ```bash
//! # Rank models matching a term
//! dbtctx search customer --materialization table
//!
//! # Show one model with its columns and tests
//! dbtctx model customer_summary
//!
//! # Models grouped by schema
//! dbtctx models --schema marts_core
//!
//! # Direct upstream/downstream dependencies
//! dbtctx lineage order_facts
//!
//! # Project summary
//! dbtctx stats --output json
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dbtctx_config::LogFormat;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;

/// dbtctx - dbt metadata search, lineage and inspection
#[derive(Parser, Debug)]
#[command(name = "dbtctx")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOptions,
}

/// Global options available to all commands
#[derive(Args, Debug, Clone)]
struct GlobalOptions {
    /// dbt project root directory
    #[arg(
        long,
        short = 'p',
        global = true,
        env = "DBTCTX_PROJECT_DIR",
        default_value = "."
    )]
    project_dir: PathBuf,

    /// Path to configuration file
    #[arg(long, short = 'c', global = true, env = "DBTCTX_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Warehouse kind (bigquery, snowflake, postgres, ...), skipping inference
    #[arg(long, global = true, env = "DBTCTX_WAREHOUSE")]
    warehouse: Option<String>,

    /// Log level (trace, debug, info, warn, error), replacing logging.level
    #[arg(long, global = true, env = "DBTCTX_LOG_LEVEL")]
    log_level: Option<String>,

    /// Maximum number of parsed documents kept in the cache
    #[arg(long, global = true, value_name = "ENTRIES")]
    cache_size: Option<usize>,

    /// Parse every document without the document cache
    #[arg(long, global = true)]
    no_cache: bool,
}

impl GlobalOptions {
    /// Convert global options to config overrides
    pub fn to_config_overrides(&self) -> dbtctx_config::ConfigOverrides {
        dbtctx_config::ConfigOverrides {
            warehouse: self.warehouse.clone(),
            log_level: self.log_level.clone(),
            cache_max_size: self.cache_size,
            no_cache: self.no_cache,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search models by name, description, columns and tags
    Search(commands::search::SearchArgs),

    /// Show a model's configuration, columns and tests
    Model(commands::model::ModelArgs),

    /// List models grouped by schema
    Models(commands::models::ModelsArgs),

    /// Show one column of a model
    Column(commands::column::ColumnArgs),

    /// Show direct upstream and downstream dependencies of a model
    Lineage(commands::lineage::LineageArgs),

    /// List tags with the models carrying them
    Tags(commands::tags::TagsArgs),

    /// Summarize the project and the parse cache
    Stats(commands::stats::StatsArgs),

    /// Overview of schemas, models and tags
    Context(commands::context::ContextArgs),

    /// View and initialize configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = commands::load_config(&cli.global)?;

    // Flags win over the configured level
    let log_level = if cli.global.quiet {
        Level::ERROR
    } else if cli.global.verbose {
        Level::DEBUG
    } else {
        config
            .logging
            .level
            .parse::<Level>()
            .with_context(|| format!("Invalid log level '{}'", config.logging.level))?
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr);
    match config.logging.format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Text => {
            tracing::subscriber::set_global_default(builder.with_ansi(true).finish())?
        }
    }

    match cli.command {
        Commands::Search(args) => commands::search::execute(args, &cli.global, &config),
        Commands::Model(args) => commands::model::execute(args, &cli.global, &config),
        Commands::Models(args) => commands::models::execute(args, &cli.global, &config),
        Commands::Column(args) => commands::column::execute(args, &cli.global, &config),
        Commands::Lineage(args) => commands::lineage::execute(args, &cli.global, &config),
        Commands::Tags(args) => commands::tags::execute(args, &cli.global, &config),
        Commands::Stats(args) => commands::stats::execute(args, &cli.global, &config),
        Commands::Context(args) => commands::context::execute(args, &cli.global, &config),
        Commands::Config(cmd) => commands::config::execute(cmd, &cli.global, &config),
    }
}
