//! End-to-end tests for the incremental ingestion pipeline.
//!
//! The blob store and the search service are both stood in for by one
//! `httpmock` server; the ledger lives in a per-test temporary directory.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use httpmock::prelude::*;
use serde_json::json;
use tempfile::TempDir;

use searchfeed::config::{
    ChunkingConfig, Config, IngestConfig, LedgerConfig, RecordPolicy, SearchConfig, Secrets,
    StorageConfig,
};
use searchfeed::ingest::run_sync;
use searchfeed::ledger::Ledger;

fn test_config(server_url: &str, tmp: &TempDir) -> Config {
    Config {
        search: SearchConfig {
            endpoint: server_url.to_string(),
            index: "test-index".to_string(),
            datasource: "test-datasource".to_string(),
            indexer: "test-indexer".to_string(),
            api_version: "2023-11-01".to_string(),
        },
        storage: StorageConfig {
            account: "acct".to_string(),
            container: "docs".to_string(),
            endpoint_url: Some(server_url.to_string()),
            include_globs: vec!["**/*".to_string()],
            exclude_globs: vec![],
        },
        ledger: LedgerConfig {
            path: tmp.path().join("ledger.db"),
        },
        chunking: ChunkingConfig {
            chunk_size: 2048,
            overlap: 256,
        },
        ingest: IngestConfig {
            record_policy: RecordPolicy::OnSuccess,
            timeout_secs: 5,
        },
    }
}

fn test_secrets() -> Secrets {
    Secrets {
        search_admin_key: "test-admin-key".to_string(),
        storage_account_key: BASE64.encode(b"test-account-key"),
    }
}

fn listing_xml(names_and_sizes: &[(&str, usize)]) -> String {
    let blobs: String = names_and_sizes
        .iter()
        .map(|(name, size)| {
            format!(
                "<Blob><Name>{}</Name><Properties>\
                 <Last-Modified>Tue, 03 Mar 2026 10:00:00 GMT</Last-Modified>\
                 <Etag>0x8DD5A1</Etag>\
                 <Content-Length>{}</Content-Length>\
                 </Properties></Blob>",
                name, size
            )
        })
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\
         <EnumerationResults ContainerName=\"docs\"><Blobs>{}</Blobs></EnumerationResults>",
        blobs
    )
}

/// Five 2000-char paragraphs: 10,000 characters in total.
fn ten_thousand_char_text() -> String {
    (0..5)
        .map(|i| {
            let letter = (b'a' + i as u8) as char;
            format!("{}\n", letter.to_string().repeat(1999))
        })
        .collect()
}

fn upload_ok_body(count: usize) -> serde_json::Value {
    let items: Vec<serde_json::Value> = (0..count)
        .map(|i| json!({ "key": format!("k{}", i), "status": true, "statusCode": 201 }))
        .collect();
    json!({ "value": items })
}

#[tokio::test]
async fn ten_thousand_char_file_uploads_five_documents() {
    let server = MockServer::start_async().await;
    let tmp = TempDir::new().unwrap();
    let config = test_config(&server.base_url(), &tmp);
    let text = ten_thousand_char_text();
    assert_eq!(text.len(), 10_000);

    let listing = server
        .mock_async(|when, then| {
            when.method(GET).path("/docs").query_param("comp", "list");
            then.status(200).body(listing_xml(&[("big.txt", 10_000)]));
        })
        .await;
    let download = server
        .mock_async(|when, then| {
            when.method(GET).path("/docs/big.txt");
            then.status(200).body(&text);
        })
        .await;
    let upload = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/indexes/test-index/docs/index")
                .body_contains("\"metadata_storage_path\":\"big.txt\"");
            then.status(200).json_body(upload_ok_body(5));
        })
        .await;

    let report = run_sync(&config, &test_secrets(), false, None, None)
        .await
        .unwrap();

    assert_eq!(report.listed, 1);
    assert_eq!(report.ingested, 1);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.failed, 0);
    assert_eq!(report.documents_uploaded, 5);

    assert_eq!(listing.hits_async().await, 1);
    assert_eq!(download.hits_async().await, 1);
    assert_eq!(upload.hits_async().await, 1);

    let ledger = Ledger::open(&config.ledger.path).await.unwrap();
    assert_eq!(ledger.count().await.unwrap(), 1);
    assert!(!ledger.is_new("big.txt").await.unwrap());
}

#[tokio::test]
async fn second_run_ingests_nothing() {
    let server = MockServer::start_async().await;
    let tmp = TempDir::new().unwrap();
    let config = test_config(&server.base_url(), &tmp);

    server
        .mock_async(|when, then| {
            when.method(GET).path("/docs").query_param("comp", "list");
            then.status(200).body(listing_xml(&[("note.txt", 11)]));
        })
        .await;
    let download = server
        .mock_async(|when, then| {
            when.method(GET).path("/docs/note.txt");
            then.status(200).body("hello world");
        })
        .await;
    let upload = server
        .mock_async(|when, then| {
            when.method(POST).path("/indexes/test-index/docs/index");
            then.status(200).json_body(upload_ok_body(1));
        })
        .await;

    let secrets = test_secrets();
    let first = run_sync(&config, &secrets, false, None, None).await.unwrap();
    assert_eq!(first.ingested, 1);

    let second = run_sync(&config, &secrets, false, None, None).await.unwrap();
    assert_eq!(second.ingested, 0);
    assert_eq!(second.skipped, 1);
    assert_eq!(second.documents_uploaded, 0);

    // One download, one upload across both runs.
    assert_eq!(download.hits_async().await, 1);
    assert_eq!(upload.hits_async().await, 1);

    let ledger = Ledger::open(&config.ledger.path).await.unwrap();
    assert_eq!(ledger.count().await.unwrap(), 1);
}

#[tokio::test]
async fn already_recorded_blob_is_skipped_without_download() {
    let server = MockServer::start_async().await;
    let tmp = TempDir::new().unwrap();
    let config = test_config(&server.base_url(), &tmp);

    // Pre-record the blob before any sync.
    let ledger = Ledger::open(&config.ledger.path).await.unwrap();
    ledger.initialize().await.unwrap();
    ledger.record("seen.txt").await.unwrap();
    ledger.close().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/docs").query_param("comp", "list");
            then.status(200).body(listing_xml(&[("seen.txt", 5)]));
        })
        .await;
    let download = server
        .mock_async(|when, then| {
            when.method(GET).path("/docs/seen.txt");
            then.status(200).body("nope!");
        })
        .await;

    let report = run_sync(&config, &test_secrets(), false, None, None)
        .await
        .unwrap();

    assert_eq!(report.skipped, 1);
    assert_eq!(report.ingested, 0);
    assert_eq!(download.hits_async().await, 0);

    let ledger = Ledger::open(&config.ledger.path).await.unwrap();
    assert_eq!(ledger.count().await.unwrap(), 1);
}

#[tokio::test]
async fn failed_upload_leaves_ledger_untouched_for_retry() {
    let server = MockServer::start_async().await;
    let tmp = TempDir::new().unwrap();
    let config = test_config(&server.base_url(), &tmp);

    server
        .mock_async(|when, then| {
            when.method(GET).path("/docs").query_param("comp", "list");
            then.status(200).body(listing_xml(&[("flaky.txt", 9)]));
        })
        .await;
    let download = server
        .mock_async(|when, then| {
            when.method(GET).path("/docs/flaky.txt");
            then.status(200).body("some text");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/indexes/test-index/docs/index");
            then.status(503).body("service unavailable");
        })
        .await;

    let secrets = test_secrets();
    let report = run_sync(&config, &secrets, false, None, None).await.unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(report.ingested, 0);

    let ledger = Ledger::open(&config.ledger.path).await.unwrap();
    assert_eq!(ledger.count().await.unwrap(), 0);
    assert!(ledger.is_new("flaky.txt").await.unwrap());
    ledger.close().await;

    // The file is retried on the next run.
    let retry = run_sync(&config, &secrets, false, None, None).await.unwrap();
    assert_eq!(retry.failed, 1);
    assert_eq!(download.hits_async().await, 2);
}

#[tokio::test]
async fn always_policy_records_despite_failed_upload() {
    let server = MockServer::start_async().await;
    let tmp = TempDir::new().unwrap();
    let config = test_config(&server.base_url(), &tmp);

    server
        .mock_async(|when, then| {
            when.method(GET).path("/docs").query_param("comp", "list");
            then.status(200).body(listing_xml(&[("flaky.txt", 9)]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/docs/flaky.txt");
            then.status(200).body("some text");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/indexes/test-index/docs/index");
            then.status(503).body("service unavailable");
        })
        .await;

    let report = run_sync(
        &config,
        &test_secrets(),
        false,
        None,
        Some(RecordPolicy::Always),
    )
    .await
    .unwrap();

    // Still reported as failed, but the ledger records it anyway.
    assert_eq!(report.failed, 1);

    let ledger = Ledger::open(&config.ledger.path).await.unwrap();
    assert!(!ledger.is_new("flaky.txt").await.unwrap());
    assert_eq!(ledger.count().await.unwrap(), 1);
}

#[tokio::test]
async fn rejected_documents_fail_the_file() {
    let server = MockServer::start_async().await;
    let tmp = TempDir::new().unwrap();
    let config = test_config(&server.base_url(), &tmp);

    server
        .mock_async(|when, then| {
            when.method(GET).path("/docs").query_param("comp", "list");
            then.status(200).body(listing_xml(&[("partial.txt", 7)]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/docs/partial.txt");
            then.status(200).body("content");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/indexes/test-index/docs/index");
            then.status(200).json_body(json!({
                "value": [{ "key": "k0", "status": false, "errorMessage": "too large" }]
            }));
        })
        .await;

    let report = run_sync(&config, &test_secrets(), false, None, None)
        .await
        .unwrap();

    assert_eq!(report.failed, 1);
    let ledger = Ledger::open(&config.ledger.path).await.unwrap();
    assert!(ledger.is_new("partial.txt").await.unwrap());
}

#[tokio::test]
async fn one_bad_blob_does_not_stop_the_run() {
    let server = MockServer::start_async().await;
    let tmp = TempDir::new().unwrap();
    let config = test_config(&server.base_url(), &tmp);

    server
        .mock_async(|when, then| {
            when.method(GET).path("/docs").query_param("comp", "list");
            then.status(200)
                .body(listing_xml(&[("gone.txt", 4), ("good.txt", 10)]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/docs/gone.txt");
            then.status(404).body("blob not found");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/docs/good.txt");
            then.status(200).body("still here");
        })
        .await;
    let upload = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/indexes/test-index/docs/index")
                .body_contains("good.txt");
            then.status(200).json_body(upload_ok_body(1));
        })
        .await;

    let report = run_sync(&config, &test_secrets(), false, None, None)
        .await
        .unwrap();

    assert_eq!(report.listed, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.ingested, 1);
    assert_eq!(upload.hits_async().await, 1);

    let ledger = Ledger::open(&config.ledger.path).await.unwrap();
    assert!(ledger.is_new("gone.txt").await.unwrap());
    assert!(!ledger.is_new("good.txt").await.unwrap());
}

#[tokio::test]
async fn dry_run_touches_nothing() {
    let server = MockServer::start_async().await;
    let tmp = TempDir::new().unwrap();
    let config = test_config(&server.base_url(), &tmp);

    server
        .mock_async(|when, then| {
            when.method(GET).path("/docs").query_param("comp", "list");
            then.status(200).body(listing_xml(&[("a.txt", 1), ("b.txt", 1)]));
        })
        .await;
    let download_a = server
        .mock_async(|when, then| {
            when.method(GET).path("/docs/a.txt");
            then.status(200).body("x");
        })
        .await;
    let download_b = server
        .mock_async(|when, then| {
            when.method(GET).path("/docs/b.txt");
            then.status(200).body("x");
        })
        .await;

    let report = run_sync(&config, &test_secrets(), true, None, None)
        .await
        .unwrap();

    assert_eq!(report.listed, 2);
    assert_eq!(download_a.hits_async().await, 0);
    assert_eq!(download_b.hits_async().await, 0);

    let ledger = Ledger::open(&config.ledger.path).await.unwrap();
    assert_eq!(ledger.count().await.unwrap(), 0);
}

#[tokio::test]
async fn glob_filters_exclude_blobs_from_the_run() {
    let server = MockServer::start_async().await;
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(&server.base_url(), &tmp);
    config.storage.include_globs = vec!["**/*.txt".to_string()];

    server
        .mock_async(|when, then| {
            when.method(GET).path("/docs").query_param("comp", "list");
            then.status(200)
                .body(listing_xml(&[("keep.txt", 4), ("skip.bin", 4)]));
        })
        .await;

    let report = run_sync(&config, &test_secrets(), true, None, None)
        .await
        .unwrap();

    assert_eq!(report.listed, 1);
}

#[tokio::test]
async fn limit_caps_processed_blobs() {
    let server = MockServer::start_async().await;
    let tmp = TempDir::new().unwrap();
    let config = test_config(&server.base_url(), &tmp);

    server
        .mock_async(|when, then| {
            when.method(GET).path("/docs").query_param("comp", "list");
            then.status(200)
                .body(listing_xml(&[("a.txt", 1), ("b.txt", 1), ("c.txt", 1)]));
        })
        .await;

    let report = run_sync(&config, &test_secrets(), true, Some(2), None)
        .await
        .unwrap();

    assert_eq!(report.listed, 2);
}
