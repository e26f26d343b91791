//! Shared HTTP helpers for the collaborator clients.

use reqwest::Url;
use tracing::debug;

use crate::error::{ApiError, ClientError};

/// Error bodies longer than this are truncated before being kept.
const MAX_ERROR_BODY_BYTES: usize = 64 * 1024;

/// Parses a collaborator base URL, normalized to end with `/`.
pub(crate) fn parse_base_url(raw: &str) -> Result<Url, ClientError> {
    let invalid = |reason: String| ClientError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };

    let mut url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Resolves `path` against a base URL returned by [`parse_base_url`].
pub(crate) fn endpoint(base: &Url, path: &str) -> Result<Url, ClientError> {
    base.join(path).map_err(|e| ClientError::InvalidUrl {
        url: format!("{base}{path}"),
        reason: e.to_string(),
    })
}

/// Passes success responses through, turning any other status into [`ApiError`].
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let mut body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            debug!("Failed to read {} response body: {}", status, e);
            String::new()
        }
    };
    if body.len() > MAX_ERROR_BODY_BYTES {
        let mut cut = MAX_ERROR_BODY_BYTES;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push_str("\n...(truncated)");
    }
    Err(ApiError { status, body }.into())
}
