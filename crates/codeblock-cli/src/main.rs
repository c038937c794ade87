//! codeblock binary
//!
//! Offline inspection of code-block bindings in exported page documents.
//!
//! ## Usage
//!
//! ```bash
//! # Which nodes bind which code blocks
//! codeblock relations page.json
//!
//! # Code mapping after deleting node `form` (and its children) from the page
//! codeblock purge page.json code.json --node form
//!
//! # Three fresh code ids
//! codeblock unique-id code.json --count 3
//! ```

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use codeblock_kernel::GraphConfig;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "codeblock", about = "Inspect code-block bindings in page-tree documents")]
struct Cli {
    /// Graph config (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the reverse index: code id → node id → hook keys.
    Relations {
        /// Page tree JSON.
        tree: PathBuf,
    },
    /// Print the code mapping with a node subtree unbound from every block.
    Purge {
        /// Page tree JSON.
        tree: PathBuf,
        /// Code mapping JSON.
        dsl: PathBuf,
        /// Root of the subtree being deleted.
        #[arg(long)]
        node: String,
    },
    /// Print fresh code ids that do not collide with the mapping.
    UniqueId {
        /// Code mapping JSON.
        dsl: PathBuf,
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<String> {
    let config = match &cli.config {
        Some(path) => GraphConfig::load(path)?,
        None => GraphConfig::default(),
    };

    let value = match cli.command {
        Command::Relations { tree } => commands::relations(&tree, config)?,
        Command::Purge { tree, dsl, node } => commands::purge(&tree, &dsl, &node, config).await?,
        Command::UniqueId { dsl, count } => commands::unique_ids(&dsl, count, config).await?,
    };

    Ok(serde_json::to_string_pretty(&value)?)
}
