//! HTTP endpoint handlers for the status server.
//!
//! This module provides handlers for all HTTP endpoints:
//! - `/`: Plain-text index
//! - `/health`: Outcome of the latest scrape cycle
//! - `/aggregates`: Last aggregate collection as JSON
//! - `/metrics`: The agent's own Prometheus metrics

pub mod aggregates;
pub mod health;
pub mod metrics;
pub mod root;

use axum::{routing::get, Router};

use crate::state::SharedState;

// Re-export handlers
pub use aggregates::aggregates_handler;
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use root::root_handler;

/// Builds the status server routes.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/aggregates", get(aggregates_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}
