//! Aggregation of classified observations into counters and histograms.
//!
//! Each scrape owns its own [`Aggregator`]; nothing is shared across cycles.
//! Contributions are kept per key and summed in sorted order when the
//! collection is produced, so the result does not depend on arrival order.

use std::collections::BTreeMap;
use tracing::trace;

use super::{Counter, Entity, Histogram, Metric, MetricKind};

/// Which part of an aggregate an observation updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    /// Counter total.
    Total,
    /// Histogram sum of observed values.
    Sum,
    /// Histogram number of observations.
    Count,
}

/// A classified value ready for aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub kind: MetricKind,
    pub entity: Entity,
    pub value: f64,
    pub component: Component,
}

#[derive(Debug)]
enum Accumulator {
    Counter(Vec<f64>),
    Histogram { sums: Vec<f64>, count: u64 },
}

impl Accumulator {
    fn for_component(component: Component) -> Self {
        match component {
            Component::Total => Accumulator::Counter(Vec::new()),
            Component::Sum | Component::Count => Accumulator::Histogram {
                sums: Vec::new(),
                count: 0,
            },
        }
    }
}

/// Accumulates observations for one scrape cycle.
#[derive(Debug, Default)]
pub struct Aggregator {
    entries: BTreeMap<(MetricKind, Entity), Accumulator>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct `(kind, entity)` keys seen so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adds one observation. Non-finite values are dropped.
    pub fn push(&mut self, obs: Observation) {
        if !obs.value.is_finite() {
            trace!(kind = %obs.kind, entity = %obs.entity, "Dropping non-finite value");
            return;
        }

        let acc = self
            .entries
            .entry((obs.kind, obs.entity))
            .or_insert_with(|| Accumulator::for_component(obs.component));

        match (acc, obs.component) {
            (Accumulator::Counter(values), Component::Total) => values.push(obs.value),
            (Accumulator::Histogram { sums, .. }, Component::Sum) => sums.push(obs.value),
            (Accumulator::Histogram { count, .. }, Component::Count) => {
                if obs.value >= 0.0 {
                    *count = count.saturating_add(obs.value.round() as u64);
                }
            }
            _ => trace!("Dropping observation with mismatched component"),
        }
    }

    /// Produces the aggregate collection, sorted by `(kind, entity)`.
    pub fn finish(self) -> Vec<Metric> {
        self.entries
            .into_iter()
            .map(|((kind, entity), acc)| match acc {
                Accumulator::Counter(values) => Metric::Counter(Counter {
                    kind,
                    entity,
                    value: ordered_sum(values),
                }),
                Accumulator::Histogram { sums, count } => Metric::Histogram(Histogram {
                    kind,
                    entity,
                    sum: ordered_sum(sums),
                    count,
                }),
            })
            .collect()
    }
}

impl Extend<Observation> for Aggregator {
    fn extend<I: IntoIterator<Item = Observation>>(&mut self, iter: I) {
        for obs in iter {
            self.push(obs);
        }
    }
}

/// Sums values in ascending order; floating-point addition is not associative.
fn ordered_sum(mut values: Vec<f64>) -> f64 {
    values.sort_by(f64::total_cmp);
    values.into_iter().sum()
}
