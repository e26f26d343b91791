//! Traefik agent bridge library
//!
//! Agent-side plumbing between a Traefik proxy and its control plane:
//!
//! - **Metrics scraping**: fetch the proxy's Prometheus exposition text and
//!   normalize it into per-service and per-ingress aggregates
//! - **Configuration push**: deliver versioned dynamic configuration
//!   snapshots to the proxy over mutual TLS
//! - **Certificates**: fetch the wildcard certificate from the platform API
//!
//! # Usage
//!
//! ```rust
//! use traefik_agent_bridge::metrics::{scrape_text, Entity, Metric, MetricKind};
//!
//! let text = r#"
//! traefik_service_requests_total{code="200",method="GET",service="whoami@docker"} 3
//! traefik_service_requests_total{code="404",method="GET",service="whoami@docker"} 1
//! "#;
//!
//! for metric in scrape_text(text) {
//!     if let Metric::Counter(counter) = metric {
//!         println!("{} {} = {}", counter.kind, counter.entity, counter.value);
//!     }
//! }
//! ```

pub mod certificate;
pub mod error;
mod http;
pub mod metrics;
pub mod proxy;

// Re-export main types for convenience
pub use certificate::{Certificate, CertificateClient};
pub use error::{ApiError, ClientError};
pub use metrics::{Counter, Entity, Histogram, Metric, MetricKind, ScrapeError, Scraper};
pub use proxy::{ConfigVersion, MtlsPaths, ProxyClient, Transport};
