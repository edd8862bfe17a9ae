use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub search: SearchConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

/// Remote search service: endpoint plus the names of the provisioned
/// index, datasource, and indexer.
#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    pub endpoint: String,
    pub index: String,
    pub datasource: String,
    pub indexer: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

fn default_api_version() -> String {
    "2023-11-01".to_string()
}

/// Blob storage account and container holding the source documents.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub account: String,
    pub container: String,
    /// Custom endpoint for emulators (Azurite) and test servers.
    /// Defaults to `https://{account}.blob.core.windows.net`.
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_path")]
    pub path: PathBuf,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: default_ledger_path(),
        }
    }
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("database/file_check_in.db")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    2048
}
fn default_overlap() -> usize {
    256
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default)]
    pub record_policy: RecordPolicy,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            record_policy: RecordPolicy::default(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

/// When the ledger records a file as ingested.
///
/// `OnSuccess` records only after the upload call returns success, so a
/// failed upload is retried on the next run. `Always` records regardless of
/// the upload outcome — the behavior of the system this replaces, kept as
/// an explicit opt-in.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RecordPolicy {
    #[default]
    OnSuccess,
    Always,
}

/// Credentials read from the environment, never from the config file.
#[derive(Clone)]
pub struct Secrets {
    pub search_admin_key: String,
    pub storage_account_key: String,
}

impl Secrets {
    /// Load `SEARCH_ADMIN_KEY` and `STORAGE_ACCOUNT_KEY`.
    pub fn from_env() -> Result<Self> {
        let search_admin_key = std::env::var("SEARCH_ADMIN_KEY")
            .context("SEARCH_ADMIN_KEY environment variable not set")?;
        let storage_account_key = std::env::var("STORAGE_ACCOUNT_KEY")
            .context("STORAGE_ACCOUNT_KEY environment variable not set")?;
        Ok(Self {
            search_admin_key,
            storage_account_key,
        })
    }
}

/// Connection string handed to the managed indexer's datasource definition.
/// Only the `provision` command needs it.
pub fn datasource_connection() -> Result<String> {
    std::env::var("STORAGE_CONNECTION_STRING")
        .context("STORAGE_CONNECTION_STRING environment variable not set")
}

impl StorageConfig {
    /// Base URL for blob requests, without a trailing slash.
    pub fn base_url(&self) -> String {
        match &self.endpoint_url {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{}.blob.core.windows.net", self.account),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.search.endpoint.trim().is_empty() {
        anyhow::bail!("search.endpoint must not be empty");
    }
    for (field, value) in [
        ("search.index", &config.search.index),
        ("search.datasource", &config.search.datasource),
        ("search.indexer", &config.search.indexer),
        ("storage.account", &config.storage.account),
        ("storage.container", &config.storage.container),
    ] {
        if value.trim().is_empty() {
            anyhow::bail!("{} must not be empty", field);
        }
    }

    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.overlap >= config.chunking.chunk_size {
        anyhow::bail!(
            "chunking.overlap ({}) must be smaller than chunking.chunk_size ({})",
            config.chunking.overlap,
            config.chunking.chunk_size
        );
    }

    Ok(config)
}
