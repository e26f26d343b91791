//! Known Traefik metric families and how their samples map to observations.

use super::aggregator::{Component, Observation};
use super::labels::{classify_scoped, EntityLabel, ROUTER_PRECEDENCE, SERVICE_PRECEDENCE};
use super::parser::{RawSample, Suffix};
use super::MetricKind;

/// Entity kind a metric family describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Service,
    Router,
}

impl Scope {
    /// Label precedence used to classify samples of this scope.
    pub fn precedence(&self) -> &'static [EntityLabel] {
        match self {
            Scope::Service => &SERVICE_PRECEDENCE,
            Scope::Router => &ROUTER_PRECEDENCE,
        }
    }
}

/// Shape of a known family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// `*_requests_total` counter, partitioned by status code.
    Requests,
    /// `*_request_duration_seconds` histogram, read from its `_sum`/`_count` series.
    RequestDuration,
}

/// Looks up a family by its base name (series suffix removed).
pub fn lookup(base_name: &str) -> Option<(Family, Scope)> {
    match base_name {
        "traefik_service_requests_total" => Some((Family::Requests, Scope::Service)),
        "traefik_service_request_duration_seconds" => {
            Some((Family::RequestDuration, Scope::Service))
        }
        "traefik_router_requests_total" => Some((Family::Requests, Scope::Router)),
        "traefik_router_request_duration_seconds" => {
            Some((Family::RequestDuration, Scope::Router))
        }
        _ => None,
    }
}

/// Error kind derived from an HTTP status code label.
fn error_kind(code: Option<&str>) -> Option<MetricKind> {
    match code?.parse::<u16>().ok()? {
        500..=599 => Some(MetricKind::RequestErrors),
        400..=499 => Some(MetricKind::RequestClientErrors),
        _ => None,
    }
}

/// Maps a raw sample to the observations it contributes.
///
/// Samples of unknown families, bucket series, and samples without an entity
/// label contribute nothing.
pub fn observations(sample: &RawSample<'_>) -> impl Iterator<Item = Observation> {
    let mut out: [Option<Observation>; 2] = [None, None];

    let classified = lookup(sample.base_name()).and_then(|(family, scope)| {
        classify_scoped(&sample.labels, scope.precedence()).map(|entity| (family, entity))
    });

    match classified {
        Some((Family::Requests, entity)) if sample.suffix().is_none() => {
            if let Some(kind) = error_kind(sample.label("code")) {
                out[1] = Some(Observation {
                    kind,
                    entity: entity.clone(),
                    value: sample.value,
                    component: Component::Total,
                });
            }
            out[0] = Some(Observation {
                kind: MetricKind::Requests,
                entity,
                value: sample.value,
                component: Component::Total,
            });
        }
        Some((Family::RequestDuration, entity)) => {
            let component = match sample.suffix() {
                Some(Suffix::Sum) => Some(Component::Sum),
                Some(Suffix::Count) => Some(Component::Count),
                _ => None,
            };
            out[0] = component.map(|component| Observation {
                kind: MetricKind::RequestDuration,
                entity,
                value: sample.value,
                component,
            });
        }
        _ => {}
    }

    out.into_iter().flatten()
}
