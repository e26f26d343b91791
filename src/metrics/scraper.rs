//! Scrape cycle orchestration.
//!
//! A [`Scraper`] fetches the exposition text from its [`MetricsSource`] and
//! runs it through parser, label interpreter and aggregator. Each call builds
//! its own aggregator, so concurrent scrapes never share state.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use super::aggregator::Aggregator;
use super::family::observations;
use super::parser::parse;
use super::Metric;
use crate::error::ClientError;

/// Something that serves Prometheus exposition text.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Fetches the raw metrics text. Non-success statuses are errors.
    async fn get_metrics(&self) -> Result<String, ClientError>;
}

#[async_trait]
impl<T: MetricsSource + ?Sized> MetricsSource for Arc<T> {
    async fn get_metrics(&self) -> Result<String, ClientError> {
        (**self).get_metrics().await
    }
}

/// Errors of a scrape cycle.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Fetching the metrics failed; wraps the transport or API error.
    #[error("scrape failed: {0}")]
    Failed(#[source] ClientError),
    /// The caller cancelled the scrape before the fetch completed.
    #[error("scrape cancelled")]
    Cancelled,
}

impl ScrapeError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScrapeError::Cancelled)
    }
}

/// Runs scrape cycles against a metrics source.
#[derive(Debug, Clone)]
pub struct Scraper<S> {
    source: S,
}

impl<S: MetricsSource> Scraper<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Runs one scrape cycle.
    ///
    /// Returns the aggregate collection sorted by `(kind, entity)`. If `cancel`
    /// fires while the fetch is in flight, the fetch is dropped and
    /// [`ScrapeError::Cancelled`] is returned.
    #[instrument(skip_all)]
    pub async fn scrape(&self, cancel: &CancellationToken) -> Result<Vec<Metric>, ScrapeError> {
        let start = Instant::now();

        let text = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ScrapeError::Cancelled),
            fetched = self.source.get_metrics() => fetched.map_err(ScrapeError::Failed)?,
        };

        let metrics = scrape_text(&text);
        debug!(
            "Scraped {} aggregates from {} bytes in {:.3}s",
            metrics.len(),
            text.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(metrics)
    }
}

/// Parses and aggregates already-fetched exposition text.
pub fn scrape_text(text: &str) -> Vec<Metric> {
    let mut aggregator = Aggregator::new();
    for sample in parse(text) {
        aggregator.extend(observations(&sample));
    }
    aggregator.finish()
}
