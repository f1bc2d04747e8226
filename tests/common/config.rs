//! Test configuration helpers for building pollers against a mock feed

use filing_feed::{Config, Database, PollScheduler};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::MockServer;

/// Configuration pointed at `server`, polling fast, with a database in `temp_dir`
pub fn create_test_config(server: &MockServer, temp_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.feed.url = format!("{}/cgi-bin/browse-edgar", server.uri());
    config.feed.user_agent = "filing-feed-e2e/1.0 (tests@example.com)".to_string();
    config.feed.poll_interval = Duration::from_millis(50);
    config.feed.fetch_timeout = Duration::from_secs(5);
    config.ingest.shutdown_grace = Duration::from_secs(5);
    config.persistence.database_path = temp_dir.path().join("filings.db");
    config
}

/// Open the database named by `config` and build a scheduler over it
pub async fn create_test_scheduler(config: Config) -> (PollScheduler, Arc<Database>) {
    let db = Arc::new(
        Database::new(&config.persistence.database_path)
            .await
            .expect("failed to open test database"),
    );
    let scheduler =
        PollScheduler::new(config, db.clone()).expect("failed to create test scheduler");
    (scheduler, db)
}
