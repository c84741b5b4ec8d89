//! # seqsearch CLI
//!
//! ```bash
//! seqsearch --config ./config/seqsearch.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `seqsearch init` | Create the SQLite database and schema |
//! | `seqsearch load <id>` | Fetch and store a sequence without searching |
//! | `seqsearch search <id> <pattern>` | Search a sequence and write JSON results |
//! | `seqsearch serve` | Start the HTTP API |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use seqsearch::{config, migrate, search_cmd, server};

/// seqsearch: chunked storage and parallel regex search over nucleotide
/// sequences.
#[derive(Parser)]
#[command(name = "seqsearch", version)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults are used for everything when the file does not exist.
    #[arg(long, global = true, default_value = "./config/seqsearch.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Fetch a sequence from the provider and store it in chunks.
    ///
    /// Does nothing if the sequence is already stored.
    Load {
        /// Sequence identifier at the provider (e.g. `30271926`).
        sequence_id: String,
    },

    /// Search a sequence for a regex pattern.
    ///
    /// Blocks until the job finishes (up to `[jobs].await_timeout_secs`)
    /// and writes `{matched_text: [positions]}` as indented JSON.
    Search {
        /// Sequence identifier at the provider.
        sequence_id: String,

        /// Regular expression to search for (e.g. `AATCGA|GGCAT`).
        pattern: String,

        /// Output file. Defaults to `search_results_<id>_<timestamp>.json`
        /// in the working directory.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Start the HTTP API on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cfg = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else {
        tracing::debug!(path = %cli.config.display(), "config file not found, using defaults");
        config::Config::minimal()
    };

    match cli.command {
        Commands::Init => {
            migrate::run_init(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Load { sequence_id } => {
            search_cmd::run_load(&cfg, &sequence_id).await?;
        }
        Commands::Search {
            sequence_id,
            pattern,
            output,
        } => {
            search_cmd::run_search(&cfg, &sequence_id, &pattern, output).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
