//! Background poll loop for the agent.
//!
//! Runs a scrape cycle every `scrape_interval`, each bounded by
//! `scrape_timeout`, and publishes the last completed collection to the
//! shared state. A failed cycle keeps the previous collection and is retried
//! on the next tick.

use chrono::Utc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use traefik_agent_bridge::metrics::MetricsSource;
use traefik_agent_bridge::{ScrapeError, Scraper};

use crate::state::SharedState;

/// Runs scrape cycles until `shutdown` is cancelled.
pub async fn run_poll_loop<S: MetricsSource>(
    state: SharedState,
    scraper: Scraper<S>,
    shutdown: CancellationToken,
) {
    let interval = state.config.scrape_interval();
    let timeout = state.config.scrape_timeout();
    info!(
        "Starting poll loop: interval {}s, timeout {}s",
        interval.as_secs(),
        timeout.as_secs()
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if let Err(e) = run_cycle(&state, &scraper, timeout, &shutdown).await {
            if shutdown.is_cancelled() {
                break;
            }
            debug!("Cycle failed, retrying on next tick: {}", e);
        }
    }

    info!("Poll loop stopped");
}

/// Runs one bounded scrape cycle and records its outcome.
#[instrument(skip_all)]
pub async fn run_cycle<S: MetricsSource>(
    state: &SharedState,
    scraper: &Scraper<S>,
    timeout: Duration,
    shutdown: &CancellationToken,
) -> Result<usize, ScrapeError> {
    let start = Instant::now();
    state.telemetry.scrapes_total.inc();

    let cancel = shutdown.child_token();
    let scrape = scraper.scrape(&cancel);
    tokio::pin!(scrape);

    // Timer first: a fetch failing at the deadline still counts as a timeout
    let result = tokio::select! {
        biased;
        _ = tokio::time::sleep(timeout) => {
            cancel.cancel();
            scrape.await
        }
        result = &mut scrape => result,
    };
    let elapsed = start.elapsed().as_secs_f64();

    let mut status = state.status.write().await;
    status.cycles += 1;
    status.last_duration_seconds = elapsed;

    match result {
        Ok(metrics) => {
            let count = metrics.len();
            state.telemetry.scrape_duration_seconds.observe(elapsed);
            state.telemetry.record_aggregates(&metrics);

            let now = Utc::now();
            state
                .telemetry
                .last_success_timestamp_seconds
                .set(now.timestamp_millis() as f64 / 1000.0);

            status.metrics = Some(metrics);
            status.last_success = Some(now);
            status.last_error = None;
            info!("Scrape completed: {} aggregates in {:.3}s", count, elapsed);
            Ok(count)
        }
        Err(e) => {
            let reason = match &e {
                ScrapeError::Cancelled if shutdown.is_cancelled() => "shutdown",
                ScrapeError::Cancelled => "timeout",
                ScrapeError::Failed(_) => "error",
            };
            state
                .telemetry
                .scrape_failures_total
                .with_label_values(&[reason])
                .inc();

            status.failures += 1;
            status.last_error = Some(match reason {
                "timeout" => format!("scrape timed out after {}s", timeout.as_secs_f64()),
                _ => e.to_string(),
            });

            match reason {
                "shutdown" => debug!("Scrape cancelled by shutdown"),
                "timeout" => warn!("Scrape cancelled after {:.3}s timeout", timeout.as_secs_f64()),
                _ => error!("Scrape failed: {}", e),
            }
            Err(e)
        }
    }
}
