//! Health check endpoint handler.
//!
//! Returns 200 once a scrape cycle succeeded and the latest one did not fail,
//! 503 otherwise.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use std::fmt::Write as FmtWrite;
use tracing::{debug, instrument};

use crate::state::SharedState;

/// Handler for the /health endpoint.
#[instrument(skip(state))]
pub async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /health request");

    let status = state.status.read().await;

    let (code, message) = if status.is_healthy() {
        (StatusCode::OK, "OK".to_string())
    } else if let Some(err) = &status.last_error {
        (StatusCode::SERVICE_UNAVAILABLE, format!("Last scrape failed: {err}"))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "No scrape completed yet".to_string())
    };

    let mut body = String::new();
    writeln!(body, "{message}\n").ok();
    writeln!(body, "{:22} {}", "Cycles:", status.cycles).ok();
    writeln!(body, "{:22} {}", "Failures:", status.failures).ok();
    writeln!(
        body,
        "{:22} {:.3}s",
        "Last cycle duration:", status.last_duration_seconds
    )
    .ok();
    match status.last_success {
        Some(at) => writeln!(body, "{:22} {}", "Last success:", at.to_rfc3339()).ok(),
        None => writeln!(body, "{:22} never", "Last success:").ok(),
    };
    if let Some(metrics) = &status.metrics {
        writeln!(body, "{:22} {}", "Aggregates:", metrics.len()).ok();
    }

    debug!("Health check: {} - {}", code, message);
    (code, [("Content-Type", "text/plain; charset=utf-8")], body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::state::AppState;
    use chrono::Utc;
    use std::sync::Arc;

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_unhealthy_before_first_scrape() {
        let state = Arc::new(AppState::new(Config::default()).unwrap());
        let response = health_handler(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(body_text(response).await.starts_with("No scrape completed yet"));
    }

    #[tokio::test]
    async fn test_healthy_after_success() {
        let state = Arc::new(AppState::new(Config::default()).unwrap());
        {
            let mut status = state.status.write().await;
            status.metrics = Some(Vec::new());
            status.last_success = Some(Utc::now());
            status.cycles = 1;
        }
        let response = health_handler(State(state.clone())).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        state.status.write().await.last_error = Some("scrape failed: boom".into());
        let response = health_handler(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(body_text(response).await.contains("boom"));
    }
}
