//! SpaceKeeper - keeps remotely hosted app instances awake.
//!
//! Polls each configured space's lifecycle stage, tracks how long it has
//! really been running since its last start, and wakes (or restarts) spaces
//! that have gone to sleep.

mod config;
mod format;
mod probe;
mod reactivate;
mod scheduler;
mod state;
mod web;

use config::AppConfig;
use probe::Prober;
use reactivate::Reactivator;
use scheduler::Scheduler;
use state::StateStore;
use web::Server;

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("spacekeeper=info".parse()?),
        )
        .init();

    // Load configuration
    let cfg = Arc::new(AppConfig::load());
    tracing::info!("Starting SpaceKeeper on port {}...", cfg.http_port);
    tracing::info!(
        "Watching {} space(s), sweep interval {:?}",
        cfg.targets.len(),
        cfg.sweep_interval
    );
    if cfg.api_token.is_none() {
        tracing::warn!("HF_API_TOKEN not set; restart escalation is disabled");
    }

    // In-memory state, one slot per configured space
    let store = Arc::new(StateStore::new(&cfg.targets));

    // One HTTP client shared by probes and reactivation requests
    let client = reqwest::Client::builder().timeout(cfg.probe_timeout).build()?;

    let prober = Arc::new(Prober::new(client.clone(), store.clone(), &cfg));
    let reactivator = Arc::new(Reactivator::new(client, store, &cfg));

    // Start the keep-alive sweep loop
    let scheduler = Arc::new(Scheduler::new(cfg.clone(), prober, reactivator.clone()));
    scheduler.start();

    // Start web server
    let server = Server::new(cfg, scheduler, reactivator);
    server.start().await?;

    Ok(())
}
