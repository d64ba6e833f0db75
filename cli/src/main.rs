//! Tracewalk CLI - validate recorded event traces
//!
//! # Commands
//! - `tracewalk check <trace>` - Classify a recorded trace against a Transition Tree
//! - `tracewalk paths` - List every known path of a Transition Tree

mod check;
mod paths;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracewalk_core::{TransitionTree, scriptloader};
use tracing_subscriber::EnvFilter;

/// Tracewalk event-trace validator
#[derive(Parser)]
#[command(name = "tracewalk")]
#[command(author, version, about = "Validate event traces against a tree of known orderings")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a recorded trace (one event name or JSON event per line)
    Check {
        /// Trace file ("-" reads stdin)
        trace: PathBuf,

        /// Transition tree file, JSON or TOML (default: built-in script-loader tree)
        #[arg(short, long)]
        tree: Option<PathBuf>,

        /// Validator config file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Only consider events from this origin
        #[arg(long)]
        origin: Option<String>,

        /// Delay failure delivery by this many milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
    },

    /// List every root-to-leaf path and its label
    Paths {
        /// Transition tree file, JSON or TOML (default: built-in script-loader tree)
        #[arg(short, long)]
        tree: Option<PathBuf>,
    },
}

/// Initialize a stdout-style tracing subscriber writing to stderr
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tracewalk_core=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_tree(path: Option<&Path>) -> Result<TransitionTree> {
    match path {
        Some(path) => TransitionTree::load(path)
            .with_context(|| format!("Failed to load transition tree: {}", path.display())),
        None => Ok(scriptloader::tree()),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            trace,
            tree,
            config,
            origin,
            delay_ms,
        } => {
            let tree = load_tree(tree.as_deref())?;
            let options = check::CheckOptions {
                config,
                origin,
                delay_ms,
            };
            check::run_check_command(&tree, &trace, options).await
        }
        Commands::Paths { tree } => {
            let tree = load_tree(tree.as_deref())?;
            paths::run_paths_command(&tree);
            Ok(ExitCode::SUCCESS)
        }
    }
}
