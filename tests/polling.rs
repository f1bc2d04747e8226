//! End-to-end polling tests against a mock EDGAR feed
//!
//! Each test runs a real scheduler over a SQLite file in a temp directory and a
//! wiremock server standing in for the feed host.

mod common;

use common::{
    EDGAR_FEED, EDGAR_FEED_PATHS, atom_feed, collect_events_until, completed_cycles,
    create_test_config, create_test_scheduler, wait_for_event,
};
use filing_feed::{ConditionalFetchCache, CycleOutcome, CycleReport, Event, run_with_shutdown};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FEED_PATH: &str = "/cgi-bin/browse-edgar";

#[tokio::test]
async fn test_edgar_feed_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "application/atom+xml")
                .set_body_string(EDGAR_FEED),
        )
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let (scheduler, db) = create_test_scheduler(create_test_config(&server, &temp_dir)).await;
    let mut events = scheduler.subscribe();
    let handle = scheduler.spawn();

    let completed = wait_for_event(&mut events, Duration::from_secs(5), |e| {
        matches!(e, Event::CycleCompleted { .. })
    })
    .await
    .expect("no cycle completed");
    handle.shutdown().await.unwrap();

    match completed {
        Event::CycleCompleted { report, .. } => {
            assert_eq!(report.parsed, 3);
            assert_eq!(report.inserted, 3);
        }
        other => panic!("unexpected event {:?}", other),
    }

    let link = format!("{}{}", server.uri(), EDGAR_FEED_PATHS[1]);
    let record = db.find_filing_by_link(&link).await.unwrap().unwrap();
    assert_eq!(record.title, "144 - Smith & Jones Holdings (0001000002) (Subject)");
    assert_eq!(
        record.summary,
        "<b>Filed:</b> 2024-01-02 <b>AccNo:</b> 0001000002-24-000002 <b>Size:</b> 4 KB"
    );

    // Feed-level links never become filings
    let all = db.list_recent_filings(100).await.unwrap();
    assert!(all.iter().all(|r| r.link.contains("/Archives/edgar/data/")));
}

#[tokio::test]
async fn test_unchanged_feed_is_fetched_conditionally() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .and(header("if-none-match", "\"e1\""))
        .respond_with(ResponseTemplate::new(304))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"e1\"")
                .insert_header("Last-Modified", "Tue, 02 Jan 2024 19:30:00 GMT")
                .set_body_string(EDGAR_FEED),
        )
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let (scheduler, db) = create_test_scheduler(create_test_config(&server, &temp_dir)).await;
    let mut events = scheduler.subscribe();
    let handle = scheduler.spawn();

    let collected = collect_events_until(&mut events, Duration::from_secs(5), |e| {
        matches!(e, Event::NotModified { cycle } if *cycle >= 6)
    })
    .await;
    handle.shutdown().await.unwrap();

    assert_eq!(completed_cycles(&collected), 1, "only the first cycle ingests");
    assert_eq!(db.count_filings().await.unwrap(), 3);

    let requests = server.received_requests().await.unwrap();
    assert!(requests.len() >= 6);
    assert!(requests[0].headers.get("if-none-match").is_none());
    for request in &requests[1..] {
        assert_eq!(request.headers.get("if-none-match").unwrap(), "\"e1\"");
        assert_eq!(
            request.headers.get("if-modified-since").unwrap(),
            "Tue, 02 Jan 2024 19:30:00 GMT"
        );
    }
}

#[tokio::test]
async fn test_changed_feed_adds_only_new_filings() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .and(header("if-none-match", "\"v2\""))
        .respond_with(ResponseTemplate::new(304))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .and(header("if-none-match", "\"v1\""))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"v2\"")
                .set_body_string(atom_feed(&[
                    ("New filing", "/n", "fresh"),
                    ("First", "/1", "changed summary"),
                    ("Second", "/2", "two"),
                ])),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"v1\"")
                .set_body_string(atom_feed(&[("First", "/1", "one"), ("Second", "/2", "two")])),
        )
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let (scheduler, db) = create_test_scheduler(create_test_config(&server, &temp_dir)).await;
    let mut cache = ConditionalFetchCache::new();

    let first = scheduler.poll_once(&mut cache).await.unwrap();
    assert_eq!(
        first,
        CycleOutcome::Ingested(CycleReport {
            parsed: 2,
            inserted: 2,
            touched: 0,
            failed: 0,
        })
    );

    let second = scheduler.poll_once(&mut cache).await.unwrap();
    assert_eq!(
        second,
        CycleOutcome::Ingested(CycleReport {
            parsed: 3,
            inserted: 1,
            touched: 2,
            failed: 0,
        })
    );

    let third = scheduler.poll_once(&mut cache).await.unwrap();
    assert_eq!(third, CycleOutcome::NotModified);

    assert_eq!(db.count_filings().await.unwrap(), 3);

    // Content keeps its first-seen value
    let first_link = format!("{}/1", server.uri());
    let record = db.find_filing_by_link(&first_link).await.unwrap().unwrap();
    assert_eq!(record.summary, "one");
}

#[tokio::test]
async fn test_records_survive_restart() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(EDGAR_FEED))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();

    let created_at = {
        let (scheduler, db) = create_test_scheduler(create_test_config(&server, &temp_dir)).await;
        let mut cache = ConditionalFetchCache::new();
        scheduler.poll_once(&mut cache).await.unwrap();

        let link = format!("{}{}", server.uri(), EDGAR_FEED_PATHS[0]);
        let record = db.find_filing_by_link(&link).await.unwrap().unwrap();
        db.close().await;
        record.created_at
    };

    // A new process starts with an empty validator cache and the same store
    let (scheduler, db) = create_test_scheduler(create_test_config(&server, &temp_dir)).await;
    let mut cache = ConditionalFetchCache::new();
    let outcome = scheduler.poll_once(&mut cache).await.unwrap();

    assert!(matches!(
        outcome,
        CycleOutcome::Ingested(CycleReport { inserted: 0, touched: 3, .. })
    ));

    let link = format!("{}{}", server.uri(), EDGAR_FEED_PATHS[0]);
    let record = db.find_filing_by_link(&link).await.unwrap().unwrap();
    assert_eq!(record.created_at, created_at);
    assert_eq!(db.count_filings().await.unwrap(), 3);
}

#[tokio::test]
async fn test_duplicate_links_within_one_document() {
    let server = MockServer::start().await;

    let entries: Vec<(&str, &str, &str)> = (0..20).map(|_| ("Same", "/same", "dup")).collect();
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(atom_feed(&entries)))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let (scheduler, db) = create_test_scheduler(create_test_config(&server, &temp_dir)).await;
    let mut cache = ConditionalFetchCache::new();

    let outcome = scheduler.poll_once(&mut cache).await.unwrap();
    assert_eq!(
        outcome,
        CycleOutcome::Ingested(CycleReport {
            parsed: 20,
            inserted: 1,
            touched: 19,
            failed: 0,
        })
    );
    assert_eq!(db.count_filings().await.unwrap(), 1);
}

#[tokio::test]
async fn test_run_with_shutdown_stops_on_cancelled_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(EDGAR_FEED))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let (scheduler, db) = create_test_scheduler(create_test_config(&server, &temp_dir)).await;
    let mut events = scheduler.subscribe();
    let handle = scheduler.spawn();
    let token = handle.shutdown_token();

    let runner = tokio::spawn(run_with_shutdown(handle));

    wait_for_event(&mut events, Duration::from_secs(5), |e| {
        matches!(e, Event::CycleCompleted { .. })
    })
    .await
    .expect("no cycle completed");

    token.cancel();
    tokio::time::timeout(Duration::from_secs(10), runner)
        .await
        .expect("run_with_shutdown did not return after cancellation")
        .unwrap()
        .unwrap();

    wait_for_event(&mut events, Duration::from_secs(1), |e| matches!(e, Event::Shutdown))
        .await
        .expect("no shutdown event");
    assert_eq!(db.count_filings().await.unwrap(), 3);
}
