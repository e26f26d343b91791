//! Aggregates endpoint handler.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, instrument};

use traefik_agent_bridge::Metric;

use crate::state::SharedState;

#[derive(Serialize)]
struct AggregatesResponse<'a> {
    scraped_at: Option<DateTime<Utc>>,
    aggregates: &'a [Metric],
}

/// Handler for the /aggregates endpoint.
///
/// Serves the last completed collection; 503 until the first cycle succeeds.
#[instrument(skip(state))]
pub async fn aggregates_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /aggregates request");

    let status = state.status.read().await;
    match &status.metrics {
        Some(metrics) => (
            StatusCode::OK,
            Json(AggregatesResponse {
                scraped_at: status.last_success,
                aggregates: metrics,
            }),
        )
            .into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"error": "no scrape completed yet"})),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::state::AppState;
    use std::sync::Arc;
    use traefik_agent_bridge::metrics::scrape_text;

    #[tokio::test]
    async fn test_serves_last_collection() {
        let state = Arc::new(AppState::new(Config::default()).unwrap());
        let response = aggregates_handler(State(state.clone())).await.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        {
            let mut status = state.status.write().await;
            status.metrics = Some(scrape_text(
                "traefik_router_requests_total{code=\"200\",router=\"r@docker\",service=\"s@docker\"} 2\n",
            ));
            status.last_success = Some(Utc::now());
        }

        let response = aggregates_handler(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let first = &json["aggregates"][0];
        assert_eq!(first["aggregate"], "counter");
        assert_eq!(first["kind"], "requests");
        assert_eq!(first["entity"]["type"], "ingress");
        assert_eq!(first["entity"]["name"], "r@docker");
        assert_eq!(first["value"], 2.0);
    }
}
