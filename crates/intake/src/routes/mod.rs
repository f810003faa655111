//! HTTP routes for the intake service.

pub mod scan;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Build the scan workflow router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/scan/resolve", post(scan::resolve))
        .route("/api/scan/search", get(scan::search))
        .route("/api/scan/link", post(scan::link))
        .route("/api/scan/pending", get(scan::pending))
}
