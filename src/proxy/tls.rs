//! mTLS setup for the proxy client.

use reqwest::tls::Version;
use reqwest::{Certificate, ClientBuilder, Identity};
use std::path::Path;

use super::MtlsPaths;
use crate::error::ClientError;

/// Trusts only the private CA and presents the agent identity, TLS 1.3 only.
pub(super) fn configure(builder: ClientBuilder, paths: &MtlsPaths) -> Result<ClientBuilder, ClientError> {
    let ca_pem = read_pem(&paths.ca)?;
    let ca = Certificate::from_pem(&ca_pem).map_err(|e| tls_error(&paths.ca, e))?;

    let mut identity_pem = read_pem(&paths.cert)?;
    if !identity_pem.ends_with(b"\n") {
        identity_pem.push(b'\n');
    }
    identity_pem.extend_from_slice(&read_pem(&paths.key)?);
    let identity = Identity::from_pem(&identity_pem).map_err(|e| tls_error(&paths.key, e))?;

    Ok(builder
        .use_rustls_tls()
        .tls_built_in_root_certs(false)
        .add_root_certificate(ca)
        .identity(identity)
        .min_tls_version(Version::TLS_1_3))
}

fn read_pem(path: &Path) -> Result<Vec<u8>, ClientError> {
    let bytes = std::fs::read(path).map_err(|e| tls_error(path, e))?;
    if bytes.is_empty() {
        return Err(tls_error(path, "file is empty"));
    }
    Ok(bytes)
}

fn tls_error(path: &Path, reason: impl ToString) -> ClientError {
    ClientError::Tls {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    #[test]
    fn test_missing_ca_names_path() {
        let paths = MtlsPaths {
            ca: fixture("does-not-exist.pem"),
            cert: fixture("agent.pem"),
            key: fixture("agent-key.pem"),
        };
        match configure(reqwest::Client::builder(), &paths) {
            Err(ClientError::Tls { path, .. }) => assert_eq!(path, paths.ca),
            other => panic!("expected Tls error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_key_without_private_key_is_rejected() {
        // A certificate where the key should be: no private key in the bundle
        let paths = MtlsPaths {
            ca: fixture("rootCA.pem"),
            cert: fixture("agent.pem"),
            key: fixture("rootCA.pem"),
        };
        match configure(reqwest::Client::builder(), &paths) {
            Err(ClientError::Tls { path, .. }) => assert_eq!(path, paths.key),
            other => panic!("expected Tls error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_fixture_material_builds() {
        let paths = MtlsPaths {
            ca: fixture("rootCA.pem"),
            cert: fixture("agent.pem"),
            key: fixture("agent-key.pem"),
        };
        let builder = configure(reqwest::Client::builder(), &paths).unwrap();
        assert!(builder.build().is_ok());
    }
}
