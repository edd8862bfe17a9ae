//! Search CLI command.
//!
//! Queries the remote index and prints ranked hits with their provenance.

use anyhow::Result;

use crate::config::{Config, Secrets};
use crate::search_client::SearchClient;

pub async fn run_search(
    config: &Config,
    secrets: &Secrets,
    query: &str,
    limit: Option<i64>,
) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let client = SearchClient::new(
        &config.search,
        &secrets.search_admin_key,
        config.ingest.timeout_secs,
    )?;

    let hits = client.search(&config.search.index, query, limit).await?;

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for hit in &hits {
        println!("id:     {}", hit.id);
        println!("score:  {:.4}", hit.score);
        if let Some(ref path) = hit.metadata_storage_path {
            println!("source: {}", path);
        }
        println!("{}", snippet(&hit.content));
        println!();
    }
    println!("{} result(s)", hits.len());

    Ok(())
}

/// First 200 characters of the hit content, cut at a char boundary.
fn snippet(content: &str) -> &str {
    let mut end = content.len().min(200);
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    &content[..end]
}
