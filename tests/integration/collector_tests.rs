//! Integration tests for the collector
//!
//! These tests use wiremock to stand in for the DoH resolver and the
//! backend, and drive whole blocks end-to-end against temp-dir storage.

use dom4in_collector::config::{parse_config, Config};
use dom4in_collector::state::{CandidateSource, Pointer};
use dom4in_collector::storage::{CursorStore, JsonCursorStore, LifetimeTotals, UploadStatus};
use dom4in_collector::{BlockOutcome, BlockReport, Collector, CollectorError};
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const UPLOAD_PATH: &str = "/api/admin/upload-aggregate";

/// Builds a config pointing at the mock server with storage under `dir`
fn test_config(server: &MockServer, dir: &Path, charset: &str, max_length: u32) -> Config {
    test_config_with(server, dir, charset, max_length, "")
}

fn test_config_with(
    server: &MockServer,
    dir: &Path,
    charset: &str,
    max_length: u32,
    extra: &str,
) -> Config {
    let toml = format!(
        r#"
[enumeration]
tlds = ["com"]
charset = "{charset}"
max-length = {max_length}

[[resolver]]
name = "mock"
url = "{uri}/dns-query"

[probe]
workers = 4
dns-timeout-ms = 2000
http-timeout-ms = 2000

[backend]
base-url = "{uri}"
api-key = "test-key"

[storage]
pointer-path = '{dir}/state/pointer.json'
word-cursor-path = '{dir}/state/words.json'
ledger-path = '{dir}/state/ledger.db'

{extra}
"#,
        charset = charset,
        max_length = max_length,
        uri = server.uri(),
        dir = dir.display(),
        extra = extra,
    );
    parse_config(&toml).expect("test config should be valid")
}

async fn mount_nxdomain_resolver(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/dns-query"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"Status":3}"#))
        .mount(server)
        .await;
}

async fn mount_backend(server: &MockServer, status: u16) {
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .and(header("x-admin-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(status).set_body_string("{}"))
        .mount(server)
        .await;
}

/// Upload bodies received so far, in arrival order
async fn uploaded_payloads(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.url.path() == UPLOAD_PATH)
        .map(|request| serde_json::from_slice(&request.body).expect("payload should be JSON"))
        .collect()
}

fn expect_processed(outcome: BlockOutcome) -> BlockReport {
    match outcome {
        BlockOutcome::Processed(report) => report,
        BlockOutcome::Exhausted => panic!("expected a processed block"),
    }
}

#[tokio::test]
async fn test_short_mode_runs_to_exhaustion() {
    let server = MockServer::start().await;
    mount_nxdomain_resolver(&server).await;
    mount_backend(&server, 200).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path(), "ab", 2);
    let mut collector = Collector::new(config, "hash").unwrap().with_batch_range(4, 4);

    let processed = collector.run(None).await.unwrap();
    assert_eq!(processed, 2);

    let payloads = uploaded_payloads(&server).await;
    assert_eq!(payloads.len(), 2);

    let first = &payloads[0]["length_stats"][0];
    assert_eq!(first["length"], 1);
    assert_eq!(first["total_possible"], 2);
    assert_eq!(first["tracked_count"], 2);
    assert_eq!(first["unregistered_found"], 2);

    let second = &payloads[1]["length_stats"][0];
    assert_eq!(second["length"], 2);
    assert_eq!(second["tracked_count"], 4);
    assert_eq!(payloads[1]["global"]["domains_tracked_lifetime"], 4);
    assert_eq!(payloads[1]["length_stats_by_tld"][0]["tld"], "com");

    let store: JsonCursorStore<Pointer> =
        JsonCursorStore::new(dir.path().join("state/pointer.json"));
    let pointer = store.load().unwrap().unwrap();
    assert!(pointer.is_exhausted());

    let totals = collector.ledger().lifetime_totals().unwrap();
    assert_eq!(totals.blocks, 2);
    assert_eq!(totals.candidates, 6);
    assert_eq!(totals.registered, 0);

    assert!(matches!(
        collector.run_block().await.unwrap(),
        BlockOutcome::Exhausted
    ));
}

#[tokio::test]
async fn test_failed_resolvers_count_as_unregistered() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dns-query"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    mount_backend(&server, 200).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path(), "abc", 1);
    let mut collector = Collector::new(config, "hash").unwrap();

    let report = expect_processed(collector.run_block().await.unwrap());
    assert_eq!(report.mode, CandidateSource::Short);
    assert_eq!(report.tally.candidates, 3);
    assert_eq!(report.tally.resolver_errors, 3);
    assert_eq!(report.tally.registered, 0);
    assert_eq!(report.payload.length_stats[0].counters.unregistered_found, 3);
    assert_eq!(report.upload_status, UploadStatus::Uploaded);

    let entry = &collector.resolver_pool().snapshot()[0];
    assert_eq!(entry.errors, 3);
    assert_eq!(entry.successes, 0);
}

#[tokio::test]
async fn test_failed_upload_is_queued_and_replayed() {
    let server = MockServer::start().await;
    mount_nxdomain_resolver(&server).await;
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_backend(&server, 200).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path(), "ab", 2);
    let mut collector = Collector::new(config, "hash").unwrap().with_batch_range(2, 2);

    let first = expect_processed(collector.run_block().await.unwrap());
    assert_eq!(first.upload_status, UploadStatus::Queued);
    assert_eq!(collector.ledger().pending_outbox().unwrap().len(), 1);

    // Cursors move on even though the upload failed
    let store: JsonCursorStore<Pointer> =
        JsonCursorStore::new(dir.path().join("state/pointer.json"));
    assert!(store.load().unwrap().unwrap().cursor(1).unwrap().done);

    let second = expect_processed(collector.run_block().await.unwrap());
    assert_eq!(second.upload_status, UploadStatus::Uploaded);
    assert!(collector.ledger().pending_outbox().unwrap().is_empty());

    let payloads = uploaded_payloads(&server).await;
    assert_eq!(payloads.len(), 3);
    // The replayed payload is the first block's, delivered before the second block's
    assert_eq!(payloads[1], payloads[0]);
    assert_eq!(payloads[2]["length_stats"][0]["length"], 2);

    let blocks = collector.ledger().recent_blocks(10).unwrap();
    assert_eq!(blocks[1].upload_status, UploadStatus::Queued);
    assert_eq!(blocks[0].upload_status, UploadStatus::Uploaded);
}

#[tokio::test]
async fn test_failed_cursor_save_leaves_ledger_untouched() {
    let server = MockServer::start().await;
    mount_nxdomain_resolver(&server).await;
    mount_backend(&server, 200).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path(), "ab", 1);
    let mut collector = Collector::new(config, "hash").unwrap().with_batch_range(2, 2);

    // A directory where the pointer file belongs makes the rename fail
    let blocked = dir.path().join("state/pointer.json");
    std::fs::create_dir_all(blocked.join("occupied")).unwrap();

    let result = collector.run_block().await;
    assert!(matches!(result, Err(CollectorError::Storage(_))));
    assert_eq!(
        collector.ledger().lifetime_totals().unwrap(),
        LifetimeTotals::default()
    );
    assert!(collector.ledger().tld_totals().unwrap().is_empty());
    assert!(!collector.cursors().pointer.cursor(1).unwrap().done);

    // Once the path is writable again the same block is counted exactly once
    std::fs::remove_dir_all(&blocked).unwrap();
    let report = expect_processed(collector.run_block().await.unwrap());
    assert_eq!(report.tally.candidates, 2);

    let totals = collector.ledger().lifetime_totals().unwrap();
    assert_eq!(totals.blocks, 1);
    assert_eq!(totals.candidates, 2);
    let tlds = collector.ledger().tld_totals().unwrap();
    assert_eq!(tlds.len(), 1);
    assert_eq!(tlds[0].domains_checked_total, 2);

    let store: JsonCursorStore<Pointer> = JsonCursorStore::new(&blocked);
    assert!(store.load().unwrap().unwrap().is_exhausted());
}

#[tokio::test]
async fn test_resume_after_restart() {
    let server = MockServer::start().await;
    mount_nxdomain_resolver(&server).await;
    mount_backend(&server, 200).await;

    let dir = TempDir::new().unwrap();

    {
        let config = test_config(&server, dir.path(), "ab", 2);
        let mut collector = Collector::new(config, "hash").unwrap().with_batch_range(3, 3);
        let report = expect_processed(collector.run_block().await.unwrap());
        assert_eq!(report.tally.candidates, 2);
    }

    let config = test_config(&server, dir.path(), "ab", 2);
    let mut collector = Collector::new(config, "hash").unwrap().with_batch_range(3, 3);
    let pointer = &collector.cursors().pointer;
    assert!(pointer.cursor(1).unwrap().done);
    assert_eq!(pointer.next_length, 2);

    let report = expect_processed(collector.run_block().await.unwrap());
    assert_eq!(report.length_breakdown, "L2=3");
    assert_eq!(collector.cursors().pointer.cursor(2).unwrap().index, 3);

    let report = expect_processed(collector.run_block().await.unwrap());
    assert_eq!(report.tally.candidates, 1);
    assert!(collector.cursors().pointer.is_exhausted());
}

#[tokio::test]
async fn test_charset_change_is_rejected() {
    let server = MockServer::start().await;
    mount_nxdomain_resolver(&server).await;
    mount_backend(&server, 200).await;

    let dir = TempDir::new().unwrap();
    {
        let config = test_config(&server, dir.path(), "ab", 1);
        let mut collector = Collector::new(config, "hash").unwrap();
        expect_processed(collector.run_block().await.unwrap());
    }

    let config = test_config(&server, dir.path(), "abc", 1);
    let result = Collector::new(config, "hash");
    assert!(matches!(result, Err(CollectorError::CursorMismatch(_))));
}

#[tokio::test]
async fn test_word_mode_alternates_and_tags_parts_of_speech() {
    let server = MockServer::start().await;
    mount_nxdomain_resolver(&server).await;
    mount_backend(&server, 200).await;

    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("words.txt"), "cat\ndog\n").unwrap();
    std::fs::write(dir.path().join("nouns.txt"), "cat\n").unwrap();

    let extra = format!(
        r#"
[schedule]
short-mode = true
word-mode = true

[words]
path = '{dir}/words.txt'

[words.pos]
noun = '{dir}/nouns.txt'
"#,
        dir = dir.path().display()
    );
    let config = test_config_with(&server, dir.path(), "ab", 1, &extra);
    let mut collector = Collector::new(config, "hash").unwrap().with_batch_range(2, 2);

    let short = expect_processed(collector.run_block().await.unwrap());
    assert_eq!(short.mode, CandidateSource::Short);

    let words = expect_processed(collector.run_block().await.unwrap());
    assert_eq!(words.mode, CandidateSource::Word);
    assert!(words.payload.length_stats.is_empty());
    assert_eq!(words.payload.word_pos_stats.len(), 1);
    let noun = &words.payload.word_pos_stats[0];
    assert_eq!(noun.pos, "noun");
    assert_eq!(noun.length, 3);
    assert_eq!(noun.counters.tracked_count, 1);

    // Short mode is exhausted, so word mode keeps going
    let again = expect_processed(collector.run_block().await.unwrap());
    assert_eq!(again.mode, CandidateSource::Word);
    assert_eq!(collector.cursors().word_cursor.index, 0);
}

#[tokio::test]
async fn test_missing_word_list() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let missing = format!(
        r#"
[words]
path = '{dir}/missing.txt'
"#,
        dir = dir.path().display()
    );

    // Alongside short mode, word mode is dropped
    let both = format!("[schedule]\nshort-mode = true\nword-mode = true\n{}", missing);
    let config = test_config_with(&server, dir.path(), "ab", 1, &both);
    let collector = Collector::new(config, "hash").unwrap();
    assert_eq!(collector.cursors().modes(), &[CandidateSource::Short]);

    // On its own, it is fatal
    let only = format!("[schedule]\nshort-mode = false\nword-mode = true\n{}", missing);
    let config = test_config_with(&server, dir.path(), "ab", 1, &only);
    assert!(matches!(
        Collector::new(config, "hash"),
        Err(CollectorError::WordSource(_))
    ));
}
