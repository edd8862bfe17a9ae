//! Upload document construction.
//!
//! Pairs each chunk with a freshly generated short identifier and the
//! source blob name, producing the records the search index accepts.

use uuid::Uuid;

use crate::models::UploadDocument;

/// Build one [`UploadDocument`] per chunk.
///
/// The `id` is the first hyphen-delimited segment of a fresh v4 UUID —
/// eight hex characters, unique per chunk within any realistic corpus.
/// Every document carries the source blob name in
/// `metadata_storage_path` so index-side filtering can trace provenance.
pub fn build_documents(chunks: &[String], file_name: &str) -> Vec<UploadDocument> {
    chunks
        .iter()
        .map(|chunk| UploadDocument {
            id: short_id(),
            content: chunk.clone(),
            metadata_storage_path: file_name.to_string(),
        })
        .collect()
}

fn short_id() -> String {
    let id = Uuid::new_v4().to_string();
    id.split('-').next().unwrap_or(&id).to_string()
}
