//! Metrics scraping and normalization.
//!
//! This module turns the Prometheus text exposition served by a Traefik
//! instance into typed aggregates keyed by logical entity:
//! - `parser`: line-oriented exposition text into [`RawSample`]s
//! - `labels`: label set into an [`Entity`] (service or ingress/router)
//! - `family`: known Traefik metric families into [`Observation`]s
//! - `aggregator`: observations into [`Counter`]s and [`Histogram`]s
//! - `scraper`: one complete fetch-parse-aggregate cycle

pub mod aggregator;
pub mod family;
pub mod labels;
pub mod parser;
pub mod scraper;

use serde::Serialize;
use std::fmt;

pub use aggregator::{Aggregator, Component, Observation};
pub use family::{observations, Family, Scope};
pub use labels::{classify, classify_scoped, EntityLabel};
pub use parser::{parse, Marker, RawSample, Samples, Suffix};
pub use scraper::{scrape_text, MetricsSource, ScrapeError, Scraper};

/// Kind of an aggregated metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Requests,
    RequestErrors,
    RequestClientErrors,
    RequestDuration,
}

impl MetricKind {
    /// Wire name of the metric kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Requests => "requests",
            MetricKind::RequestErrors => "request_errors",
            MetricKind::RequestClientErrors => "request_client_errors",
            MetricKind::RequestDuration => "request_duration",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Logical object a metric observation is attributed to.
///
/// The identifier is the opaque name the proxy uses internally and already
/// carries the provider suffix (e.g. `default-whoami-80@docker`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "type", content = "name", rename_all = "snake_case")]
pub enum Entity {
    Service(String),
    Ingress(String),
}

impl Entity {
    /// Returns the proxy identifier of the entity.
    pub fn name(&self) -> &str {
        match self {
            Entity::Service(name) | Entity::Ingress(name) => name,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Service(name) => write!(f, "service/{name}"),
            Entity::Ingress(name) => write!(f, "ingress/{name}"),
        }
    }
}

/// Accumulated total for one metric kind and entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Counter {
    pub kind: MetricKind,
    pub entity: Entity,
    pub value: f64,
}

/// Accumulated sum and count of observations for one metric kind and entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub kind: MetricKind,
    pub entity: Entity,
    pub sum: f64,
    pub count: u64,
}

/// A single record of the aggregate collection returned by a scrape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "aggregate", rename_all = "snake_case")]
pub enum Metric {
    Counter(Counter),
    Histogram(Histogram),
}

impl Metric {
    pub fn kind(&self) -> MetricKind {
        match self {
            Metric::Counter(c) => c.kind,
            Metric::Histogram(h) => h.kind,
        }
    }

    pub fn entity(&self) -> &Entity {
        match self {
            Metric::Counter(c) => &c.entity,
            Metric::Histogram(h) => &h.entity,
        }
    }

    /// Unique key of the record within one aggregate collection.
    pub fn key(&self) -> (MetricKind, &Entity) {
        (self.kind(), self.entity())
    }
}

impl From<Counter> for Metric {
    fn from(counter: Counter) -> Self {
        Metric::Counter(counter)
    }
}

impl From<Histogram> for Metric {
    fn from(histogram: Histogram) -> Self {
        Metric::Histogram(histogram)
    }
}
