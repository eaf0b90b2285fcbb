//! REST API over a finished settlement run.
//!
//! Provides four GET endpoints:
//! - `/settlements`: period totals of every entity
//! - `/settlements/{id}`: one entity with its daily figures
//! - `/days`: daily rows with optional entity and date-range filtering
//! - `/warnings`: data-quality warnings and rejected agents

mod handlers;
mod types;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;

use crate::settle::{SettlementReport, SettlementRun};

/// Immutable application state shared across all request handlers.
///
/// Built once after settlement completes and wrapped in `Arc`; all data is
/// read-only, so no locks are needed.
pub struct AppState {
    pub run: SettlementRun,
    pub report: SettlementReport,
}

impl AppState {
    pub fn new(run: SettlementRun) -> Self {
        let report = SettlementReport::from_run(&run);
        Self { run, report }
    }
}

/// Builds the axum router with all API routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/settlements", get(handlers::list_settlements))
        .route("/settlements/{id}", get(handlers::get_settlement))
        .route("/days", get(handlers::get_days))
        .route("/warnings", get(handlers::get_warnings))
        .with_state(state)
}

/// Binds to the given address and serves the API.
///
/// # Panics
///
/// Panics if the TCP listener cannot bind to `addr`.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind to {addr}: {e}"));
    log::info!("API server listening on http://{addr}");
    axum::serve(listener, app)
        .await
        .unwrap_or_else(|e| panic!("server error: {e}"));
}
