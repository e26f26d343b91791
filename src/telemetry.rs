//! Prometheus metrics of the agent itself.
//!
//! Besides scrape health, the latest aggregate collection is re-exported per
//! entity so the agent can be scraped like any other exporter.

use prometheus::{Counter, CounterVec, Gauge, GaugeVec, Histogram, HistogramOpts, Opts, Registry};

use traefik_agent_bridge::{Entity, Metric, MetricKind};

/// Buckets for scrape cycle duration in seconds.
const SCRAPE_DURATION_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Collection of the agent's Prometheus metrics.
#[derive(Clone)]
pub struct BridgeMetrics {
    // ========== Scrape Cycle ==========
    pub scrapes_total: Counter,
    pub scrape_failures_total: CounterVec, // labels: reason
    pub scrape_duration_seconds: Histogram,
    pub last_success_timestamp_seconds: Gauge,

    // ========== Aggregates ==========
    pub aggregates: GaugeVec,        // labels: kind
    pub entity_counter: GaugeVec,    // labels: kind, entity_type, entity
    pub entity_duration_sum: GaugeVec, // labels: entity_type, entity
    pub entity_duration_count: GaugeVec, // labels: entity_type, entity
}

impl BridgeMetrics {
    /// Creates and registers all metrics with the registry.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        // ========== Scrape Cycle ==========
        let scrapes_total = Counter::new(
            "bridge_scrapes_total",
            "Total number of scrape cycles started",
        )?;
        let scrape_failures_total = CounterVec::new(
            Opts::new(
                "bridge_scrape_failures_total",
                "Total number of scrape cycles that produced no aggregates",
            ),
            &["reason"],
        )?;
        let scrape_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "bridge_scrape_duration_seconds",
                "Duration of completed scrape cycles in seconds",
            )
            .buckets(SCRAPE_DURATION_BUCKETS.to_vec()),
        )?;
        let last_success_timestamp_seconds = Gauge::new(
            "bridge_last_success_timestamp_seconds",
            "Unix time of the last successful scrape cycle",
        )?;

        // ========== Aggregates ==========
        let aggregates = GaugeVec::new(
            Opts::new(
                "bridge_aggregates",
                "Number of records in the last aggregate collection by kind",
            ),
            &["kind"],
        )?;
        let entity_counter = GaugeVec::new(
            Opts::new(
                "bridge_entity_counter",
                "Counter aggregates of the last scrape per entity",
            ),
            &["kind", "entity_type", "entity"],
        )?;
        let entity_duration_sum = GaugeVec::new(
            Opts::new(
                "bridge_entity_request_duration_seconds_sum",
                "Sum of request durations of the last scrape per entity",
            ),
            &["entity_type", "entity"],
        )?;
        let entity_duration_count = GaugeVec::new(
            Opts::new(
                "bridge_entity_request_duration_seconds_count",
                "Number of timed requests of the last scrape per entity",
            ),
            &["entity_type", "entity"],
        )?;

        // ========== Register All Metrics ==========
        registry.register(Box::new(scrapes_total.clone()))?;
        registry.register(Box::new(scrape_failures_total.clone()))?;
        registry.register(Box::new(scrape_duration_seconds.clone()))?;
        registry.register(Box::new(last_success_timestamp_seconds.clone()))?;
        registry.register(Box::new(aggregates.clone()))?;
        registry.register(Box::new(entity_counter.clone()))?;
        registry.register(Box::new(entity_duration_sum.clone()))?;
        registry.register(Box::new(entity_duration_count.clone()))?;

        Ok(Self {
            scrapes_total,
            scrape_failures_total,
            scrape_duration_seconds,
            last_success_timestamp_seconds,
            aggregates,
            entity_counter,
            entity_duration_sum,
            entity_duration_count,
        })
    }

    /// Replaces the per-entity series with the given collection.
    ///
    /// Entities that disappeared from the proxy since the previous cycle are
    /// dropped rather than kept at their last value.
    pub fn record_aggregates(&self, metrics: &[Metric]) {
        self.aggregates.reset();
        self.entity_counter.reset();
        self.entity_duration_sum.reset();
        self.entity_duration_count.reset();

        for kind in [
            MetricKind::Requests,
            MetricKind::RequestErrors,
            MetricKind::RequestClientErrors,
            MetricKind::RequestDuration,
        ] {
            let n = metrics.iter().filter(|m| m.kind() == kind).count();
            self.aggregates.with_label_values(&[kind.as_str()]).set(n as f64);
        }

        for metric in metrics {
            match metric {
                Metric::Counter(c) => {
                    let (entity_type, entity) = entity_labels(&c.entity);
                    self.entity_counter
                        .with_label_values(&[c.kind.as_str(), entity_type, entity])
                        .set(c.value);
                }
                Metric::Histogram(h) => {
                    let (entity_type, entity) = entity_labels(&h.entity);
                    self.entity_duration_sum
                        .with_label_values(&[entity_type, entity])
                        .set(h.sum);
                    self.entity_duration_count
                        .with_label_values(&[entity_type, entity])
                        .set(h.count as f64);
                }
            }
        }
    }
}

fn entity_labels(entity: &Entity) -> (&'static str, &str) {
    match entity {
        Entity::Service(name) => ("service", name),
        Entity::Ingress(name) => ("ingress", name),
    }
}
