// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod error;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::application::account_service::AccountService;
use crate::application::dashboard_service::DashboardService;
use crate::application::snapshot_refresher::SnapshotRefresher;
use crate::infrastructure::account_store::JsonAccountStore;
use crate::infrastructure::config::load_config;
use crate::infrastructure::drive_fetcher::DriveSource;
use crate::infrastructure::sqlite_snapshot::SqliteSnapshotRepository;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    add_user, delete_user, edit_user, get_dashboard, health_check, list_users, login,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = load_config()?;

    // Snapshot refresh (infrastructure + application layers)
    let source = Arc::new(DriveSource::new(
        config.snapshot.drive_file_id.clone(),
        Duration::from_secs(config.snapshot.fetch_timeout_secs),
    ));
    let refresher = Arc::new(SnapshotRefresher::new(
        &config.snapshot.path,
        &config.schema.table,
        Duration::from_secs(config.snapshot.max_age_secs),
        source,
    ));

    // One synchronous refresh before accepting requests. Failure is not
    // fatal: queries fall back to last-known-good data or the empty result.
    if !refresher.ensure_fresh().await {
        tracing::warn!("starting without a fresh snapshot; dashboards may be empty or outdated");
    }

    // Periodic refresh on its own timer, decoupled from query handling.
    let periodic = refresher.clone();
    let refresh_interval = Duration::from_secs(config.snapshot.refresh_interval_secs.max(60));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(refresh_interval);
        ticker.tick().await; // first tick fires immediately; startup already refreshed
        loop {
            ticker.tick().await;
            periodic.ensure_fresh().await;
        }
    });

    // Create repository and services
    let repository = Arc::new(SqliteSnapshotRepository::new(
        &config.snapshot.path,
        config.schema.clone(),
    ));
    let dashboard_service = DashboardService::new(repository);
    let account_service = AccountService::new(Arc::new(JsonAccountStore::new(
        &config.accounts.path,
    )));

    // Create application state
    let state = Arc::new(AppState {
        dashboard_service,
        account_service,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/dashboard", get(get_dashboard))
        .route("/login", post(login))
        .route("/users", get(list_users).post(add_user))
        .route("/users/:id", put(edit_user).delete(delete_user))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.server.bind.parse()?;
    println!("Starting laundry-dashboard service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
