//! Ledger and configuration status report.

use anyhow::Result;

use crate::config::Config;
use crate::ledger::Ledger;

pub async fn run_status(config: &Config) -> Result<()> {
    println!("container:     {}", config.storage.container);
    println!("index:         {}", config.search.index);
    println!("ledger:        {}", config.ledger.path.display());
    println!(
        "chunking:      size {} / overlap {}",
        config.chunking.chunk_size, config.chunking.overlap
    );

    if config.ledger.path.exists() {
        let ledger = Ledger::open(&config.ledger.path).await?;
        ledger.initialize().await?;
        println!("ingested:      {} file(s)", ledger.count().await?);
        ledger.close().await;
    } else {
        println!("ingested:      ledger not initialized (run `sfeed init`)");
    }

    Ok(())
}
