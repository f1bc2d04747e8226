use clap::Parser;
use filing_feed::{Config, Database, PollScheduler, run_with_shutdown};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "filing-feed")]
#[command(about = "Poll an Atom filing feed and record each filing once", long_about = None)]
struct Args {
    /// JSON configuration file; built-in defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// SQLite database path (overrides persistence.database_path)
    #[arg(long)]
    database: Option<PathBuf>,
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,filing_feed=info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

async fn run(args: Args) -> filing_feed::Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };
    if let Some(database) = args.database {
        config.persistence.database_path = database;
    }

    tracing::info!(
        feed = %config.feed.url,
        database = %config.persistence.database_path.display(),
        "Starting filing-feed"
    );

    let db = Arc::new(Database::new(&config.persistence.database_path).await?);
    let handle = PollScheduler::new(config, db.clone())?.spawn();

    run_with_shutdown(handle).await?;

    match db.count_filings().await {
        Ok(count) => tracing::info!(filings = count, "Shutdown complete"),
        Err(e) => tracing::warn!(error = %e, "Could not count filings at shutdown"),
    }
    db.close().await;
    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize logging as early as possible.
    init_logging();

    let args = Args::parse();
    if let Err(err) = run(args).await {
        tracing::error!(error = %err, "filing-feed failed");
        eprintln!("filing-feed error: {}", err);
        std::process::exit(1);
    }
}
