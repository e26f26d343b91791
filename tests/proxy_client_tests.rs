//! Integration tests for the proxy client: mTLS setup and configuration push.

use httpmock::{Method::POST, MockServer};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_rustls::rustls::pki_types::pem::PemObject;
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::rustls::server::WebPkiClientVerifier;
use tokio_rustls::rustls::{self, RootCertStore, ServerConfig};
use tokio_rustls::TlsAcceptor;
use traefik_agent_bridge::metrics::scrape_text;
use traefik_agent_bridge::{
    ClientError, ConfigVersion, MtlsPaths, ProxyClient, Scraper, Transport,
};

fn can_bind_localhost() -> bool {
    match std::net::TcpListener::bind(("127.0.0.1", 0)) {
        Ok(listener) => {
            drop(listener);
            true
        }
        Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => false,
        Err(err) => panic!("failed to bind localhost for httpmock tests: {err}"),
    }
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn mtls() -> MtlsPaths {
    MtlsPaths {
        ca: fixture("rootCA.pem"),
        cert: fixture("agent.pem"),
        key: fixture("agent-key.pem"),
    }
}

#[test]
fn mtls_client_builds_from_pem_files() {
    let client = ProxyClient::new("https://127.0.0.1:8443", &Transport::Mtls(mtls())).unwrap();
    assert_eq!(client.base_url().as_str(), "https://127.0.0.1:8443/");
}

#[test]
fn missing_tls_file_is_a_tls_error() {
    for paths in [
        MtlsPaths {
            ca: fixture("missing-ca.pem"),
            ..mtls()
        },
        MtlsPaths {
            cert: fixture("missing-cert.pem"),
            ..mtls()
        },
        MtlsPaths {
            key: fixture("missing-key.pem"),
            ..mtls()
        },
    ] {
        let err = ProxyClient::new("https://127.0.0.1:8443", &Transport::Mtls(paths.clone()))
            .unwrap_err();
        match err {
            ClientError::Tls { path, .. } => {
                assert!(path.to_string_lossy().contains("missing-"), "path: {:?}", path)
            }
            other => panic!("expected Tls error, got {:?}", other),
        }
    }
}

#[derive(Serialize)]
struct Snapshot {
    http: serde_json::Value,
}

#[tokio::test]
async fn push_dynamic_posts_versioned_snapshot_once() {
    if !can_bind_localhost() {
        return;
    }
    let snapshot = Snapshot {
        http: json!({"routers": {"whoami": {"rule": "Host(`whoami.localhost`)", "service": "whoami"}}}),
    };

    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/config")
                .header("content-type", "application/json")
                .json_body(json!({
                    "unixNano": 1_652_284_260_000_000_000i64,
                    "configuration": {
                        "http": {"routers": {"whoami": {"rule": "Host(`whoami.localhost`)", "service": "whoami"}}}
                    }
                }));
            then.status(200);
        })
        .await;

    let client = ProxyClient::new(&server.base_url(), &Transport::Insecure).unwrap();
    client
        .push_dynamic(1_652_284_260_000_000_000, &snapshot)
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn push_dynamic_rejection_is_an_api_error() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/config");
            then.status(409).body("stale configuration version");
        })
        .await;

    let client = ProxyClient::new(&server.base_url(), &Transport::Insecure).unwrap();
    let err = client
        .push_dynamic(1, &json!({"http": {}}))
        .await
        .unwrap_err();
    mock.assert_async().await;

    let api = err.api_error().expect("api error");
    assert_eq!(api.status.as_u16(), 409);
    assert_eq!(api.message(), "stale configuration version");
}

/// TLS 1.3 stand-in for the proxy that requires a client certificate
/// chaining to the test CA.
struct MtlsProxy {
    url: String,
    /// Request heads and bodies received over authenticated connections.
    requests: Arc<Mutex<Vec<String>>>,
    /// Handshakes the proxy refused.
    rejected: Arc<AtomicUsize>,
}

impl MtlsProxy {
    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    async fn wait_for_rejection(&self) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.rejected.load(Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("proxy never rejected the handshake");
    }
}

fn proxy_tls_config() -> Arc<ServerConfig> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());

    let mut roots = RootCertStore::empty();
    for cert in CertificateDer::pem_file_iter(fixture("rootCA.pem")).unwrap() {
        roots.add(cert.unwrap()).unwrap();
    }
    let verifier = WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider.clone())
        .build()
        .unwrap();

    let certs = CertificateDer::pem_file_iter(fixture("proxy.pem"))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    let key = PrivateKeyDer::from_pem_file(fixture("proxy-key.pem")).unwrap();

    let config = ServerConfig::builder_with_provider(provider)
        .with_protocol_versions(&[&rustls::version::TLS13])
        .unwrap()
        .with_client_cert_verifier(verifier)
        .with_single_cert(certs, key)
        .unwrap();
    Arc::new(config)
}

/// Reads one HTTP/1.1 request (head plus `content-length` body).
async fn read_request<S: AsyncRead + Unpin>(stream: &mut S) -> Option<String> {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        if let Some(head_end) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&data[..head_end]).into_owned();
            let body_len = head
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            let total = head_end + 4 + body_len;
            if data.len() >= total {
                return Some(String::from_utf8_lossy(&data[..total]).into_owned());
            }
        }
        let n = stream.read(&mut buf).await.ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buf[..n]);
    }
}

/// Serves `GET /metrics` from the fixture dump and answers 200 to anything else.
async fn start_mtls_proxy() -> MtlsProxy {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("https://127.0.0.1:{}", listener.local_addr().unwrap().port());
    let acceptor = TlsAcceptor::from(proxy_tls_config());
    let requests = Arc::new(Mutex::new(Vec::new()));
    let rejected = Arc::new(AtomicUsize::new(0));

    let (seen, refused) = (requests.clone(), rejected.clone());
    tokio::spawn(async move {
        while let Ok((tcp, _)) = listener.accept().await {
            let (acceptor, seen, refused) = (acceptor.clone(), seen.clone(), refused.clone());
            tokio::spawn(async move {
                let mut tls = match acceptor.accept(tcp).await {
                    Ok(tls) => tls,
                    Err(_) => {
                        refused.fetch_add(1, Ordering::SeqCst);
                        return;
                    }
                };
                let Some(request) = read_request(&mut tls).await else {
                    return;
                };
                let body = if request.starts_with("GET /metrics ") {
                    std::fs::read_to_string(fixture("traefik-metrics.txt")).unwrap()
                } else {
                    String::new()
                };
                seen.lock().unwrap().push(request);

                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = tls.write_all(response.as_bytes()).await;
                let _ = tls.shutdown().await;
            });
        }
    });

    MtlsProxy {
        url,
        requests,
        rejected,
    }
}

#[tokio::test]
async fn mtls_push_reaches_proxy_requiring_client_cert() {
    if !can_bind_localhost() {
        return;
    }
    let proxy = start_mtls_proxy().await;

    let client = ProxyClient::new(&proxy.url, &Transport::Mtls(mtls())).unwrap();
    client
        .push_dynamic(1_652_284_260_000_000_000, &json!({"http": {"routers": {}}}))
        .await
        .unwrap();

    let requests = proxy.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].starts_with("POST /config HTTP/1.1"), "{}", requests[0]);
    assert!(requests[0].ends_with(
        r#"{"unixNano":1652284260000000000,"configuration":{"http":{"routers":{}}}}"#
    ));
    assert_eq!(proxy.rejected.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn mtls_scrape_reads_proxy_metrics() {
    if !can_bind_localhost() {
        return;
    }
    let proxy = start_mtls_proxy().await;
    let expected = scrape_text(&std::fs::read_to_string(fixture("traefik-metrics.txt")).unwrap());

    let scraper = Scraper::new(ProxyClient::new(&proxy.url, &Transport::Mtls(mtls())).unwrap());
    let metrics = scraper
        .scrape(&tokio_util::sync::CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(metrics, expected);
    assert_eq!(proxy.requests().len(), 1);
}

#[tokio::test]
async fn proxy_rejects_client_without_agent_identity() {
    if !can_bind_localhost() {
        return;
    }
    let proxy = start_mtls_proxy().await;

    // Trusts the proxy but presents no client certificate
    let ca = std::fs::read(fixture("rootCA.pem")).unwrap();
    let http = reqwest::Client::builder()
        .use_rustls_tls()
        .tls_built_in_root_certs(false)
        .add_root_certificate(reqwest::Certificate::from_pem(&ca).unwrap())
        .min_tls_version(reqwest::tls::Version::TLS_1_3)
        .build()
        .unwrap();
    let client = ProxyClient::with_http_client(&proxy.url, http).unwrap();
    assert_eq!(client.base_url().as_str(), format!("{}/", proxy.url));

    let err = client
        .push_dynamic(1, &json!({"http": {}}))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)), "got {:?}", err);

    proxy.wait_for_rejection().await;
    assert!(proxy.requests().is_empty());
}

#[tokio::test]
async fn proxy_rejects_identity_from_another_ca() {
    if !can_bind_localhost() {
        return;
    }
    let proxy = start_mtls_proxy().await;

    let stranger = MtlsPaths {
        cert: fixture("stranger.pem"),
        key: fixture("stranger-key.pem"),
        ..mtls()
    };
    let client = ProxyClient::new(&proxy.url, &Transport::Mtls(stranger)).unwrap();
    let err = client.get_metrics().await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)), "got {:?}", err);

    proxy.wait_for_rejection().await;
    assert!(proxy.requests().is_empty());
}

#[test]
fn config_versions_increase() {
    let version = ConfigVersion::new();
    let first = version.next();
    let second = version.next();
    assert!(second > first);
    assert!(first > 1_600_000_000_000_000_000);
}
