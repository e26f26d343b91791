//! Application state management for the agent.
//!
//! This module defines the shared application state that is passed
//! to HTTP handlers and updated by the background poll loop.

use chrono::{DateTime, Utc};
use prometheus::Registry;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

use traefik_agent_bridge::Metric;

use crate::config::Config;
use crate::telemetry::BridgeMetrics;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Outcome of the most recent scrape cycle.
#[derive(Debug, Clone, Default)]
pub struct ScrapeStatus {
    /// Last completed collection. Kept across failed cycles.
    pub metrics: Option<Vec<Metric>>,
    /// When `metrics` was produced.
    pub last_success: Option<DateTime<Utc>>,
    /// Error of the latest cycle; cleared on success.
    pub last_error: Option<String>,
    pub cycles: u64,
    pub failures: u64,
    pub last_duration_seconds: f64,
}

impl ScrapeStatus {
    /// Healthy once a cycle succeeded and the latest one did not fail.
    pub fn is_healthy(&self) -> bool {
        self.last_success.is_some() && self.last_error.is_none()
    }
}

/// Global application state shared across requests and background tasks.
pub struct AppState {
    pub registry: Registry,
    pub telemetry: BridgeMetrics,
    pub status: RwLock<ScrapeStatus>,
    pub config: Arc<Config>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let telemetry = BridgeMetrics::new(&registry)?;
        Ok(Self {
            registry,
            telemetry,
            status: RwLock::new(ScrapeStatus::default()),
            config: Arc::new(config),
            start_time: Instant::now(),
        })
    }
}
