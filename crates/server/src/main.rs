mod api;
mod bootstrap;
mod health;

use std::time::Duration;

use anyhow::Result;

use adweave_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use adweave_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations;
    // a partially configured process must refuse to start.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config)?;

    // Periodic sweep keeps the session map from accumulating dead entries
    // between reads; expiry itself is enforced lazily on access.
    let sweeper_store = app.store.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        interval.tick().await;
        loop {
            interval.tick().await;
            sweeper_store.purge_expired().await;
        }
    });

    let router =
        api::router(app.controller.clone()).merge(health::router(app.store.clone()));

    let address =
        format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "adweave-server listening"
    );

    let grace_secs = app.config.server.graceful_shutdown_secs;
    axum::serve(listener, router)
        .with_graceful_shutdown(wait_for_shutdown(grace_secs))
        .await?;

    tracing::info!(
        event_name = "system.server.stopped",
        correlation_id = "shutdown",
        "adweave-server stopped"
    );

    Ok(())
}

async fn wait_for_shutdown(grace_secs: u64) {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        grace_secs,
        "shutdown signal received, draining in-flight requests"
    );
}
