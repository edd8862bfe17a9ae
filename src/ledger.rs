//! Durable ingestion ledger.
//!
//! One SQLite table records which blob names have already been ingested.
//! The orchestrator consults [`Ledger::is_new`] before processing a blob and
//! calls [`Ledger::record`] once the blob's chunks are uploaded. Rows are
//! append-only: never mutated, never deleted.
//!
//! `record` is not idempotent at the storage layer — the identity constraint
//! is the synthetic key, not `file_name` — so the dedup invariant holds only
//! under the orchestrator's check-then-record usage. Two concurrent runs
//! against the same ledger can both observe `is_new == true` for a name and
//! both ingest it.

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

pub struct Ledger {
    pool: SqlitePool,
}

impl Ledger {
    /// Connect to the ledger database, creating the file (and its parent
    /// directory) if absent. The schema is created by [`initialize`].
    ///
    /// [`initialize`]: Ledger::initialize
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Create the `checked_files` table if it does not exist. Safe to call
    /// repeatedly; logs a warning when the table is already present.
    pub async fn initialize(&self) -> Result<()> {
        let exists: bool = sqlx::query_scalar(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='checked_files'",
        )
        .fetch_one(&self.pool)
        .await?;

        if exists {
            warn!("ledger table checked_files already exists, leaving it untouched");
            return Ok(());
        }

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS checked_files (
                id INTEGER PRIMARY KEY,
                file_name TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        debug!("ledger table checked_files created");
        Ok(())
    }

    /// True iff no row with this exact name exists.
    pub async fn is_new(&self, file_name: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM checked_files WHERE file_name = ?")
            .bind(file_name)
            .fetch_one(&self.pool)
            .await?;
        Ok(count == 0)
    }

    /// Append one row for `file_name`.
    pub async fn record(&self, file_name: &str) -> Result<()> {
        sqlx::query("INSERT INTO checked_files (file_name) VALUES (?)")
            .bind(file_name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Total number of recorded files.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM checked_files")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
