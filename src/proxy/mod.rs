//! Client for the proxy's agent endpoints.
//!
//! The proxy serves its metrics on `GET /metrics` and accepts dynamic
//! configuration snapshots on `POST /config`. Outside of insecure mode every
//! call goes over mutual TLS using a private CA.

mod tls;
mod version;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::ClientError;
use crate::http::{check_status, endpoint, parse_base_url};
use crate::metrics::MetricsSource;

pub use version::ConfigVersion;

/// Overall timeout applied to each request when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// PEM files for the mutually authenticated channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MtlsPaths {
    /// CA the proxy's server certificate must chain to.
    pub ca: PathBuf,
    /// Agent client certificate.
    pub cert: PathBuf,
    /// Agent private key.
    pub key: PathBuf,
}

/// How the agent talks to the proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    /// Plain HTTP, or HTTPS without a client identity. For local testing.
    Insecure,
    Mtls(MtlsPaths),
}

/// HTTP client for one proxy instance.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    base_url: Url,
    http: reqwest::Client,
}

impl ProxyClient {
    /// Builds a client for `base_url` using the given transport.
    pub fn new(base_url: &str, transport: &Transport) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, transport, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Like [`ProxyClient::new`] with an explicit per-request timeout.
    pub fn with_timeout(
        base_url: &str,
        transport: &Transport,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let base_url = parse_base_url(base_url)?;
        let builder = reqwest::Client::builder().timeout(timeout);
        let http = match transport {
            Transport::Insecure => builder.build()?,
            Transport::Mtls(paths) => tls::configure(builder, paths)?.build()?,
        };
        Ok(Self { base_url, http })
    }

    /// Uses a caller-provided HTTP client.
    pub fn with_http_client(base_url: &str, http: reqwest::Client) -> Result<Self, ClientError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            http,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetches the raw Prometheus exposition text.
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    pub async fn get_metrics(&self) -> Result<String, ClientError> {
        let url = endpoint(&self.base_url, "metrics")?;
        let response = self.http.get(url).send().await?;
        let response = check_status(response).await?;
        Ok(response.text().await?)
    }

    /// Pushes a dynamic configuration snapshot tagged with `unix_nano`.
    ///
    /// The snapshot is serialized as-is under `configuration`; its schema
    /// belongs to the proxy. Any 2xx status is a successful delivery.
    #[instrument(skip(self, configuration), fields(base_url = %self.base_url))]
    pub async fn push_dynamic<C>(&self, unix_nano: i64, configuration: &C) -> Result<(), ClientError>
    where
        C: Serialize + ?Sized,
    {
        let body = serde_json::to_vec(&DynamicConfiguration {
            unix_nano,
            configuration,
        })
        .map_err(ClientError::Encode)?;

        let url = endpoint(&self.base_url, "config")?;
        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        check_status(response).await?;
        debug!("Pushed dynamic configuration version {}", unix_nano);
        Ok(())
    }
}

#[async_trait]
impl MetricsSource for ProxyClient {
    async fn get_metrics(&self) -> Result<String, ClientError> {
        ProxyClient::get_metrics(self).await
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DynamicConfiguration<'a, C: ?Sized> {
    unix_nano: i64,
    configuration: &'a C,
}
