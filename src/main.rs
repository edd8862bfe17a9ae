//! # Searchfeed CLI (`sfeed`)
//!
//! The `sfeed` binary drives both ingestion pipelines: provisioning the
//! managed indexer, running the incremental client-side sync, and querying
//! the remote index.
//!
//! ## Usage
//!
//! ```bash
//! sfeed --config ./config/sfeed.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `sfeed init` | Create the ledger database and schema |
//! | `sfeed provision` | Create the index, datasource, and indexer |
//! | `sfeed run-indexer` | Trigger a managed indexer run |
//! | `sfeed sync` | Run the incremental ingestion pipeline |
//! | `sfeed search "<query>"` | Query the remote index |
//! | `sfeed status` | Show ledger and configuration status |
//!
//! Secrets never live in the config file: `SEARCH_ADMIN_KEY` and
//! `STORAGE_ACCOUNT_KEY` come from the environment (a `.env` file is
//! honored), plus `STORAGE_CONNECTION_STRING` for `provision`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use searchfeed::config::{self, RecordPolicy, Secrets};
use searchfeed::ledger::Ledger;
use searchfeed::{ingest, provision, search, status};

/// Searchfeed — blob-storage to search-index ingestion pipelines with a
/// durable dedup ledger.
#[derive(Parser)]
#[command(
    name = "sfeed",
    about = "Searchfeed — blob-storage to search-index ingestion pipelines",
    version,
    long_about = "Searchfeed moves documents from a cloud blob container into a remote \
    search index. The delegated pipeline provisions a managed indexer that ingests \
    server-side; the incremental pipeline extracts, chunks, and uploads documents \
    client-side, tracking completed files in a durable SQLite ledger so no file is \
    ever ingested twice."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/sfeed.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the ledger database.
    ///
    /// Creates the SQLite file and the `checked_files` table. Idempotent —
    /// running it repeatedly is safe.
    Init,

    /// Provision the managed search service resources.
    ///
    /// Creates the index (from the declarative schema), the blob
    /// datasource, and the scheduled indexer. Resources that already exist
    /// are left in place with a warning.
    Provision,

    /// Trigger one run of the managed indexer.
    RunIndexer,

    /// Run the incremental ingestion pipeline.
    ///
    /// Lists the container, skips blobs the ledger already records, and
    /// pushes each new blob through extraction, chunking, and upload. A
    /// file's failure is logged and does not stop the run.
    Sync {
        /// Show what would be ingested without downloading or uploading.
        #[arg(long)]
        dry_run: bool,

        /// Maximum number of blobs to process.
        #[arg(long)]
        limit: Option<usize>,

        /// When to record a file in the ledger: `on-success` (default)
        /// or `always` (record even if the upload failed).
        #[arg(long, value_parser = parse_record_policy)]
        record_policy: Option<RecordPolicy>,
    },

    /// Query the remote index.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of hits to return.
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Show ledger row count and configuration summary.
    Status,
}

fn parse_record_policy(s: &str) -> Result<RecordPolicy, String> {
    match s {
        "on-success" => Ok(RecordPolicy::OnSuccess),
        "always" => Ok(RecordPolicy::Always),
        other => Err(format!(
            "invalid record policy '{}'; use on-success or always",
            other
        )),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; explicit env vars still apply.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let ledger = Ledger::open(&cfg.ledger.path).await?;
            ledger.initialize().await?;
            ledger.close().await;
            println!("Ledger initialized at {}", cfg.ledger.path.display());
        }
        Commands::Provision => {
            let secrets = Secrets::from_env()?;
            provision::run_provision(&cfg, &secrets).await?;
        }
        Commands::RunIndexer => {
            let secrets = Secrets::from_env()?;
            provision::run_indexer(&cfg, &secrets).await?;
        }
        Commands::Sync {
            dry_run,
            limit,
            record_policy,
        } => {
            let secrets = Secrets::from_env()?;
            ingest::run_sync(&cfg, &secrets, dry_run, limit, record_policy).await?;
        }
        Commands::Search { query, limit } => {
            let secrets = Secrets::from_env()?;
            search::run_search(&cfg, &secrets, &query, limit).await?;
        }
        Commands::Status => {
            status::run_status(&cfg).await?;
        }
    }

    Ok(())
}
