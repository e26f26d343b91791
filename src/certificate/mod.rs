//! Wildcard certificate retrieval from the platform API.

use chrono::{DateTime, Utc};
use reqwest::header::AUTHORIZATION;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::ClientError;
use crate::http::{check_status, endpoint, parse_base_url};

/// Certificate and key issued for the agent's domains.
///
/// `certificate` and `private_key` hold PEM bytes; on the wire they are
/// base64 strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub domains: Vec<String>,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    #[serde(with = "base64_bytes")]
    pub certificate: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub private_key: Vec<u8>,
}

impl Certificate {
    /// Whether `at` falls inside the validity window, bounds included.
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.not_before <= at && at <= self.not_after
    }
}

/// Client for the certificate endpoint of the platform.
#[derive(Debug, Clone)]
pub struct CertificateClient {
    base_url: Url,
    token: String,
    http: reqwest::Client,
}

impl CertificateClient {
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_http_client(base_url, token, reqwest::Client::new())
    }

    pub fn with_http_client(
        base_url: &str,
        token: impl Into<String>,
        http: reqwest::Client,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            token: token.into(),
            http,
        })
    }

    /// Fetches the wildcard certificate. Not retried.
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    pub async fn get_certificate(&self) -> Result<Certificate, ClientError> {
        let url = endpoint(&self.base_url, "wildcard-certificate")?;
        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .send()
            .await?;
        let response = check_status(response).await?;

        let body = response.bytes().await?;
        let certificate: Certificate =
            serde_json::from_slice(&body).map_err(ClientError::Decode)?;
        debug!(
            "Fetched certificate for {:?} valid until {}",
            certificate.domains, certificate.not_after
        );
        Ok(certificate)
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
