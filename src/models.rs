//! Core data models used throughout searchfeed.
//!
//! These types represent the blobs, upload records, and search hits that
//! flow through the ingestion and query pipelines.

use serde::{Deserialize, Serialize};

/// One blob listed from the storage container, before any processing.
#[derive(Debug, Clone)]
pub struct BlobItem {
    /// Full blob name within the container (may contain `/` segments).
    pub name: String,
    /// Object size in bytes, as reported by the listing.
    pub size: i64,
    /// Last modification timestamp (Unix epoch seconds).
    pub last_modified: i64,
    /// Entity tag from the listing, stripped of surrounding quotes.
    pub etag: String,
}

/// The unit submitted to the remote search index: one chunk of one blob.
///
/// Field names match the remote index schema exactly — the struct is
/// serialized verbatim into the upload batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadDocument {
    /// Unique per chunk: the first hyphen-delimited segment of a fresh UUID.
    pub id: String,
    /// The chunk text.
    pub content: String,
    /// Source blob name, kept on every chunk for provenance and filtering.
    pub metadata_storage_path: String,
}

/// A single hit returned by the remote search service.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub content: String,
    pub metadata_storage_path: Option<String>,
    #[serde(rename = "@search.score", default)]
    pub score: f64,
}

/// Declarative index definition consumed by the provisioning client.
///
/// Serializes to the search service's index-definition JSON. The default
/// schema reproduces the pipeline's three-field layout: a key `id`, the
/// searchable `content`, and the `metadata_storage_path` provenance field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSchema {
    pub name: String,
    pub fields: Vec<IndexField>,
}

/// One field in an [`IndexSchema`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub key: bool,
    #[serde(default)]
    pub searchable: bool,
}

impl IndexSchema {
    /// The default three-field chunk-document schema for `index_name`.
    pub fn chunk_documents(index_name: &str) -> Self {
        Self {
            name: index_name.to_string(),
            fields: vec![
                IndexField {
                    name: "id".to_string(),
                    field_type: "Edm.String".to_string(),
                    key: true,
                    searchable: false,
                },
                IndexField {
                    name: "content".to_string(),
                    field_type: "Edm.String".to_string(),
                    key: false,
                    searchable: true,
                },
                IndexField {
                    name: "metadata_storage_path".to_string(),
                    field_type: "Edm.String".to_string(),
                    key: false,
                    searchable: false,
                },
            ],
        }
    }

    /// The key field's name, if the schema declares one.
    pub fn key_field(&self) -> Option<&str> {
        self.fields.iter().find(|f| f.key).map(|f| f.name.as_str())
    }
}
