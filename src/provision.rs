//! Delegated ingestion pipeline.
//!
//! Provisions the managed-service resources — index, blob datasource, and
//! scheduled indexer — and triggers indexer runs. Chunking and indexing are
//! performed server-side by the managed indexer; nothing here touches the
//! ledger or the local pipeline.

use anyhow::{bail, Result};
use tracing::info;

use crate::config::{datasource_connection, Config, Secrets};
use crate::models::IndexSchema;
use crate::search_client::SearchClient;

/// Create the index, datasource, and indexer. Each step treats an
/// already-existing resource as success.
pub async fn run_provision(config: &Config, secrets: &Secrets) -> Result<()> {
    let connection = datasource_connection()?;
    let client = SearchClient::new(
        &config.search,
        &secrets.search_admin_key,
        config.ingest.timeout_secs,
    )?;

    let schema = IndexSchema::chunk_documents(&config.search.index);
    if schema.key_field().is_none() {
        bail!("index schema '{}' declares no key field", schema.name);
    }
    client.create_index(&schema).await?;
    println!("index: {}", config.search.index);

    client
        .create_datasource(
            &config.search.datasource,
            &config.storage.container,
            &connection,
        )
        .await?;
    println!("datasource: {}", config.search.datasource);

    client
        .create_indexer(
            &config.search.indexer,
            &config.search.datasource,
            &config.search.index,
        )
        .await?;
    println!("indexer: {}", config.search.indexer);
    println!("ok");

    Ok(())
}

/// Trigger one run of the provisioned indexer.
pub async fn run_indexer(config: &Config, secrets: &Secrets) -> Result<()> {
    let client = SearchClient::new(
        &config.search,
        &secrets.search_admin_key,
        config.ingest.timeout_secs,
    )?;

    client.run_indexer(&config.search.indexer).await?;
    info!(indexer = %config.search.indexer, "run triggered");
    println!("indexer run triggered: {}", config.search.indexer);

    Ok(())
}
