mod api;
mod config;
mod detector;
mod error;
mod notify;
mod scanner;
mod scheduler;
mod snapshot;
mod state;
mod types;

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::routes::{router, ApiState};
use crate::api::{CycleLatency, HealthState};
use crate::config::Config;
use crate::error::Result;
use crate::notify::TelegramNotifier;
use crate::scanner::Scanner;
use crate::scheduler::start_scheduler;
use crate::snapshot::HttpSnapshotSource;
use crate::state::ListingStore;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    info!(
        "Watching {} query term(s): {}",
        cfg.queries.len(),
        cfg.queries.join(", ")
    );

    // --- Collaborators ---
    let source = Arc::new(HttpSnapshotSource::new(&cfg)?);
    let notifier = Arc::new(TelegramNotifier::new(&cfg)?);

    // --- In-memory state ---
    let store = ListingStore::new();
    let health = Arc::new(HealthState::new());
    let latency = Arc::new(CycleLatency::new());

    let scanner = Scanner::new(
        &cfg,
        source,
        notifier,
        Arc::clone(&store),
        Arc::clone(&health),
        Arc::clone(&latency),
    );

    // Populate baselines right away instead of waiting for the first tick.
    let startup_scanner = scanner.clone();
    tokio::spawn(async move {
        startup_scanner.run_cycle().await;
    });

    // Scheduler must stay alive for the life of the process.
    let _scheduler = start_scheduler(&cfg.cron_expression, scanner.clone()).await?;

    // HTTP status API
    let api_state = ApiState {
        queries: scanner.queries(),
        store,
        health,
        latency,
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
