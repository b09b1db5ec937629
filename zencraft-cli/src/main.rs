//! Zencraft CLI: inspect and seed item databases.
//!
//! ```bash
//! zencraft seed defaults.json
//! zencraft list Page
//! zencraft search Page --filter status:isEqual:live
//! ```
//!
//! Settings come from `zencraft.toml` and `ZC_*` environment variables;
//! see `zencraft --help` for all commands.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use zencraft_core::config::ZencraftConfig;

#[derive(Parser)]
#[command(name = "zencraft", about = "Inspect and seed Zencraft item databases", version)]
struct Cli {
    /// Config file
    #[arg(long, global = true, default_value = zencraft_core::config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Directory of the local tables, overrides the config
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import default items from a JSON file keyed by item type
    Seed { file: PathBuf },
    /// List items of a type
    List {
        item_type: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        page_size: u32,
    },
    /// Show one item
    Get { item_type: String, id: String },
    /// Search items of a type
    Search {
        item_type: String,
        /// `key:operator:value`, repeatable; values may be JSON
        #[arg(long = "filter", value_name = "FILTER")]
        filters: Vec<String>,
        #[arg(long, default_value_t = 20)]
        page_size: u32,
    },
    /// Remove one item
    Remove { item_type: String, id: String },
    /// Check an item against the fields of its archetype
    Validate { item_type: String, id: String },
    /// Show or switch the data source
    Source {
        /// `api` or `local`
        source: Option<String>,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<ZencraftConfig> {
    let mut config = ZencraftConfig::load_from(&cli.config)?;
    if let Some(dir) = &cli.data_dir {
        config.storage.data_dir = dir.clone();
    }
    config.validate()?;
    Ok(config)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    zencraft_core::logging::init_logging(&config.logging)?;

    match cli.command {
        Commands::Seed { file } => commands::seed::run(&config, &file).await,
        Commands::List { item_type, page, page_size } => {
            commands::items::list(&config, &item_type, page, page_size).await
        }
        Commands::Get { item_type, id } => commands::items::get(&config, &item_type, &id).await,
        Commands::Search { item_type, filters, page_size } => {
            commands::items::search(&config, &item_type, &filters, page_size).await
        }
        Commands::Remove { item_type, id } => commands::items::remove(&config, &item_type, &id).await,
        Commands::Validate { item_type, id } => commands::items::validate(&config, &item_type, &id).await,
        Commands::Source { source } => commands::source::run(&config, source.as_deref()).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
