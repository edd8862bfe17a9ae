//! # Searchfeed
//!
//! Ingestion pipelines that move documents from cloud blob storage into a
//! remote search index.
//!
//! Two pipelines share one configuration:
//!
//! - **Delegated**: provision an index, a blob datasource, and a scheduled
//!   indexer on the managed search service, then let the service ingest
//!   server-side ([`provision`]).
//! - **Incremental**: list blobs client-side, skip the ones a durable
//!   ledger already records, then extract → chunk → upload each new file
//!   and record it ([`ingest`]).
//!
//! ```text
//! ┌───────────┐    ┌──────────────────────────────┐    ┌────────────┐
//! │ Blob      │──▶│  sync: ledger → extract →     │──▶│  Search     │
//! │ container │    │  chunk → build → upload       │    │  index      │
//! └───────────┘    └───────────────┬──────────────┘    └────────────┘
//!                                  │
//!                            ┌─────▼─────┐
//!                            │  SQLite    │
//!                            │  ledger    │
//!                            └───────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment secrets |
//! | [`models`] | Core data types |
//! | [`ledger`] | Durable dedup ledger |
//! | [`blob`] | Blob storage REST client |
//! | [`search_client`] | Search service REST client |
//! | [`extract`] | Binary document text extraction |
//! | [`chunk`] | Overlapping text chunker |
//! | [`docbuild`] | Upload document construction |
//! | [`ingest`] | Incremental ingestion orchestration |
//! | [`provision`] | Managed-indexer provisioning |
//! | [`search`] | Query command |
//! | [`status`] | Ledger status report |

pub mod blob;
pub mod chunk;
pub mod config;
pub mod docbuild;
pub mod extract;
pub mod ingest;
pub mod ledger;
pub mod models;
pub mod provision;
pub mod search;
pub mod search_client;
pub mod status;
