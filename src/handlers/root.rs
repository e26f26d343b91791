//! Root endpoint handler listing the available endpoints.

use axum::{extract::State, response::IntoResponse};
use tracing::{debug, instrument};

use crate::state::SharedState;

/// Handler for the root `/` endpoint.
#[instrument(skip(state))]
pub async fn root_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing / request");

    let version = env!("CARGO_PKG_VERSION");

    let uptime_secs = state.start_time.elapsed().as_secs();
    let hours = uptime_secs / 3600;
    let minutes = (uptime_secs % 3600) / 60;
    let seconds = uptime_secs % 60;

    let proxy = state.config.proxy_url.as_deref().unwrap_or("(not configured)");

    (
        [("Content-Type", "text/plain; charset=utf-8")],
        format!(
            "traefik-agent-bridge {version}\n\
             Uptime: {hours}h {minutes}m {seconds}s\n\
             Proxy:  {proxy}\n\n\
             Endpoints:\n  \
             /health      Outcome of the latest scrape cycle\n  \
             /aggregates  Last aggregate collection (JSON)\n  \
             /metrics     Agent metrics (Prometheus)\n"
        ),
    )
}
