//! Blob storage client.
//!
//! Lists and downloads blobs from an Azure Blob Storage container using the
//! storage REST API with Shared Key authentication. Listing follows
//! `NextMarker` continuation for large containers, and blob names pass
//! through include/exclude glob filters before entering the pipeline.
//!
//! Pure-Rust request signing (`hmac` + `sha2` + `base64`): the string to
//! sign covers the canonicalized `x-ms-*` headers and the canonicalized
//! resource, keyed with the base64-decoded account key.
//!
//! A custom `endpoint_url` redirects all requests to an emulator (Azurite)
//! or a test server in place of `https://{account}.blob.core.windows.net`.

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::Utc;
use globset::{Glob, GlobSet, GlobSetBuilder};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;
use tracing::warn;

use crate::config::StorageConfig;
use crate::models::BlobItem;

type HmacSha256 = Hmac<Sha256>;

const STORAGE_API_VERSION: &str = "2021-08-06";

pub struct BlobClient {
    base_url: String,
    account: String,
    container: String,
    key: Vec<u8>,
    include: GlobSet,
    exclude: GlobSet,
    client: reqwest::Client,
}

impl BlobClient {
    /// Build a client for the configured container.
    ///
    /// Fails when the account key is not valid base64 or a glob pattern
    /// does not parse.
    pub fn new(storage: &StorageConfig, account_key: &str, timeout_secs: u64) -> Result<Self> {
        let key = BASE64
            .decode(account_key)
            .context("storage account key is not valid base64")?;

        let include = build_globset(&storage.include_globs)?;
        let exclude = build_globset(&storage.exclude_globs)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            base_url: storage.base_url(),
            account: storage.account.clone(),
            container: storage.container.clone(),
            key,
            include,
            exclude,
            client,
        })
    }

    /// List all blobs in the container that pass the glob filters.
    ///
    /// Follows `NextMarker` continuation until the listing is exhausted,
    /// then returns the surviving blobs sorted by name.
    pub async fn list_blobs(&self) -> Result<Vec<BlobItem>> {
        let mut blobs = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut query = vec![
                ("comp".to_string(), "list".to_string()),
                ("restype".to_string(), "container".to_string()),
            ];
            if let Some(ref m) = marker {
                query.push(("marker".to_string(), m.clone()));
            }

            let path = format!("/{}", self.container);
            let xml = self.signed_get_text(&path, &query).await?;

            let (batch, next_marker) = parse_blob_list(&xml)?;
            for blob in batch {
                if self.exclude.is_match(&blob.name) {
                    continue;
                }
                if !self.include.is_match(&blob.name) {
                    continue;
                }
                blobs.push(blob);
            }

            match next_marker {
                Some(m) if !m.is_empty() => marker = Some(m),
                _ => break,
            }
        }

        blobs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(blobs)
    }

    /// Download one blob's raw bytes.
    pub async fn download(&self, name: &str) -> Result<Vec<u8>> {
        let encoded: String = name.split('/').map(uri_encode).collect::<Vec<_>>().join("/");
        let path = format!("/{}/{}", self.container, encoded);

        let resp = self.signed_get(&path, &[]).await?;
        if !resp.status().is_success() {
            bail!(
                "blob download failed (HTTP {}) for '{}'",
                resp.status(),
                name
            );
        }
        Ok(resp.bytes().await?.to_vec())
    }

    async fn signed_get_text(&self, path: &str, query: &[(String, String)]) -> Result<String> {
        let resp = self.signed_get(path, query).await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!(
                "blob listing failed (HTTP {}): {}",
                status,
                body.chars().take(500).collect::<String>()
            );
        }
        Ok(resp.text().await?)
    }

    async fn signed_get(&self, path: &str, query: &[(String, String)]) -> Result<reqwest::Response> {
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let authorization = self.authorization("GET", path, query, &date);

        let query_string: String = query
            .iter()
            .map(|(k, v)| format!("{}={}", k, uri_encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let url = if query_string.is_empty() {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}{}?{}", self.base_url, path, query_string)
        };

        self.client
            .get(&url)
            .header("Authorization", authorization)
            .header("x-ms-date", &date)
            .header("x-ms-version", STORAGE_API_VERSION)
            .send()
            .await
            .with_context(|| format!("blob request failed: {}", url))
    }

    /// Shared Key authorization header for a bodyless GET.
    ///
    /// ```text
    /// StringToSign = VERB \n (11 empty standard headers) \n
    ///                CanonicalizedHeaders CanonicalizedResource
    /// Signature    = base64(HMAC-SHA256(decoded_key, StringToSign))
    /// ```
    fn authorization(
        &self,
        verb: &str,
        path: &str,
        query: &[(String, String)],
        date: &str,
    ) -> String {
        let canonical_headers = format!(
            "x-ms-date:{}\nx-ms-version:{}\n",
            date, STORAGE_API_VERSION
        );

        let mut canonical_resource = format!("/{}{}", self.account, path);
        let mut sorted = query.to_vec();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        for (k, v) in &sorted {
            canonical_resource.push_str(&format!("\n{}:{}", k, v));
        }

        let string_to_sign = format!(
            "{}\n\n\n\n\n\n\n\n\n\n\n\n{}{}",
            verb, canonical_headers, canonical_resource
        );

        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("HMAC can take key of any size");
        mac.update(string_to_sign.as_bytes());
        let signature = BASE64.encode(mac.finalize().into_bytes());

        format!("SharedKey {}:{}", self.account, signature)
    }
}

// ============ XML Parsing (minimal, no extra deps) ============

/// Parse a `List Blobs` XML response into [`BlobItem`]s plus the
/// continuation marker, if the listing is truncated.
fn parse_blob_list(xml: &str) -> Result<(Vec<BlobItem>, Option<String>)> {
    let mut blobs = Vec::new();
    let next_marker = extract_xml_value(xml, "NextMarker");

    let mut remaining = xml;
    while let Some(start) = remaining.find("<Blob>") {
        let block_start = start + "<Blob>".len();
        let Some(end) = remaining[block_start..].find("</Blob>") else {
            break;
        };
        let block = &remaining[block_start..block_start + end];
        remaining = &remaining[block_start + end + "</Blob>".len()..];

        let name = extract_xml_value(block, "Name").unwrap_or_default();
        if name.is_empty() {
            warn!("skipping listed blob with empty name");
            continue;
        }

        let last_modified = extract_xml_value(block, "Last-Modified")
            .and_then(|s| chrono::DateTime::parse_from_rfc2822(&s).ok())
            .map(|dt| dt.timestamp())
            .unwrap_or(0);

        let etag = extract_xml_value(block, "Etag")
            .unwrap_or_default()
            .trim_matches('"')
            .to_string();

        let size = extract_xml_value(block, "Content-Length")
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(0);

        blobs.push(BlobItem {
            name,
            size,
            last_modified,
            etag,
        });
    }

    Ok((blobs, next_marker))
}

/// Extract the text content of an XML tag (simple, non-nested).
fn extract_xml_value(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = xml.find(&open)?;
    let value_start = start + open.len();
    let end = xml[value_start..].find(&close)?;
    Some(xml[value_start..value_start + end].to_string())
}

/// URI-encode a path or query value per RFC 3986.
fn uri_encode(s: &str) -> String {
    let mut result = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                result.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    result
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
