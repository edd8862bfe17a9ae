//! Incremental ingestion pipeline orchestration.
//!
//! Drives the full sync flow per blob: ledger filter → download into a
//! per-run scratch directory → text extraction → chunking → document
//! building → batch upload → ledger record → scratch cleanup. Failures are
//! isolated per file: a blob that cannot be downloaded, extracted, or
//! uploaded is logged and counted, and the run continues with the next one.
//!
//! The ledger write is gated by [`RecordPolicy`]: by default a file is
//! recorded only after its upload succeeded, so failed uploads are retried
//! on the next run. The `always` policy records regardless of the upload
//! outcome.

use anyhow::{bail, Result};
use std::path::Path;
use tracing::{error, info, warn};

use crate::blob::BlobClient;
use crate::chunk::chunk_text;
use crate::config::{Config, RecordPolicy, Secrets};
use crate::docbuild::build_documents;
use crate::extract;
use crate::ledger::Ledger;
use crate::models::BlobItem;
use crate::search_client::SearchClient;

/// Counters for one sync run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub listed: usize,
    pub skipped: usize,
    pub ingested: usize,
    pub failed: usize,
    pub documents_uploaded: usize,
}

/// Run the incremental ingestion pipeline over the configured container.
///
/// Environment-level failures (ledger unavailable, listing failed) abort
/// the run; per-file failures are counted in the report.
pub async fn run_sync(
    config: &Config,
    secrets: &Secrets,
    dry_run: bool,
    limit: Option<usize>,
    policy_override: Option<RecordPolicy>,
) -> Result<SyncReport> {
    let policy = policy_override.unwrap_or(config.ingest.record_policy);

    let ledger = Ledger::open(&config.ledger.path).await?;
    ledger.initialize().await?;

    let blob_client = BlobClient::new(
        &config.storage,
        &secrets.storage_account_key,
        config.ingest.timeout_secs,
    )?;
    let search_client = SearchClient::new(
        &config.search,
        &secrets.search_admin_key,
        config.ingest.timeout_secs,
    )?;

    let mut blobs = blob_client.list_blobs().await?;
    if let Some(limit) = limit {
        blobs.truncate(limit);
    }

    if dry_run {
        let report = plan_only(&ledger, &blobs).await?;
        ledger.close().await;
        return Ok(report);
    }

    let mut report = SyncReport {
        listed: blobs.len(),
        ..SyncReport::default()
    };

    // One scratch directory per run; dropped (and deleted) on every exit
    // path, including failures.
    let scratch = tempfile::tempdir()?;

    for item in &blobs {
        if !ledger.is_new(&item.name).await? {
            info!(blob = %item.name, "already ingested, skipping");
            report.skipped += 1;
            continue;
        }

        match ingest_one(
            &blob_client,
            &search_client,
            &ledger,
            config,
            policy,
            scratch.path(),
            item,
        )
        .await
        {
            Ok(count) => {
                report.ingested += 1;
                report.documents_uploaded += count;
            }
            Err(e) => {
                error!(blob = %item.name, error = %e, "ingestion failed");
                report.failed += 1;
            }
        }
    }

    ledger.close().await;

    println!("sync {}", config.storage.container);
    println!("  listed blobs: {}", report.listed);
    println!("  skipped (already ingested): {}", report.skipped);
    println!("  ingested: {}", report.ingested);
    println!("  failed: {}", report.failed);
    println!("  documents uploaded: {}", report.documents_uploaded);
    println!("ok");

    Ok(report)
}

/// Process one new blob end to end. Returns the number of documents
/// uploaded for it.
async fn ingest_one(
    blob_client: &BlobClient,
    search_client: &SearchClient,
    ledger: &Ledger,
    config: &Config,
    policy: RecordPolicy,
    scratch: &Path,
    item: &BlobItem,
) -> Result<usize> {
    info!(blob = %item.name, size = item.size, "ingesting");

    let bytes = blob_client.download(&item.name).await?;

    // Scratch copy named by the trailing path segment of the blob name.
    let local_name = item.name.rsplit('/').next().unwrap_or(&item.name);
    let local_path = scratch.join(local_name);
    std::fs::write(&local_path, &bytes)?;

    let text = extract::extract_file(&local_path)?;
    if text.trim().is_empty() {
        bail!("extracted no text from '{}'", item.name);
    }

    let chunks = chunk_text(&text, config.chunking.chunk_size, config.chunking.overlap);
    if chunks.is_empty() {
        bail!("chunker produced no chunks for '{}'", item.name);
    }

    let documents = build_documents(&chunks, &item.name);

    let upload = search_client
        .upload_documents(&config.search.index, &documents)
        .await;

    match upload {
        Ok(count) => {
            ledger.record(&item.name).await?;
            cleanup_scratch(&local_path);
            info!(blob = %item.name, documents = count, "ingested and recorded");
            Ok(count)
        }
        Err(e) => {
            if policy == RecordPolicy::Always {
                // Reproduces the record-despite-failure behavior of the
                // system this replaces; opt-in only.
                ledger.record(&item.name).await?;
                warn!(blob = %item.name, "upload failed but recorded under 'always' policy");
            }
            Err(e)
        }
    }
}

async fn plan_only(ledger: &Ledger, blobs: &[BlobItem]) -> Result<SyncReport> {
    let mut report = SyncReport {
        listed: blobs.len(),
        ..SyncReport::default()
    };

    for item in blobs {
        if ledger.is_new(&item.name).await? {
            println!("  would ingest: {}", item.name);
        } else {
            report.skipped += 1;
        }
    }

    println!("sync (dry-run)");
    println!("  listed blobs: {}", report.listed);
    println!("  new: {}", report.listed - report.skipped);
    println!("  already ingested: {}", report.skipped);

    Ok(report)
}

fn cleanup_scratch(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "failed to remove scratch file");
    }
}
