//! Configuration management for traefik-agent-bridge.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use anyhow::{anyhow, bail, Context};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use traefik_agent_bridge::{CertificateClient, MtlsPaths, ProxyClient, Transport};

use crate::cli::{Args, ConfigFormat};

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 9217;
pub const DEFAULT_SCRAPE_INTERVAL: u64 = 60;
pub const DEFAULT_SCRAPE_TIMEOUT: u64 = 10;

/// Slack between the poll loop's cycle deadline and the proxy client's own
/// request timeout, so a hung proxy is reported as a cycle timeout.
pub const CLIENT_TIMEOUT_GRACE: Duration = Duration::from_secs(1);

const REDACTED: &str = "********";

/// Agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Proxy connection
    #[serde(alias = "proxy-url")]
    pub proxy_url: Option<String>,
    pub insecure: Option<bool>,
    #[serde(alias = "tls-ca-path")]
    pub tls_ca_path: Option<String>,
    #[serde(alias = "tls-cert-path")]
    pub tls_cert_path: Option<String>,
    #[serde(alias = "tls-key-path")]
    pub tls_key_path: Option<String>,

    // Scraping, in seconds
    #[serde(alias = "scrape-interval")]
    pub scrape_interval: Option<u64>,
    #[serde(alias = "scrape-timeout")]
    pub scrape_timeout: Option<u64>,

    // Platform API
    #[serde(alias = "platform-url")]
    pub platform_url: Option<String>,
    pub token: Option<String>,

    // Status server
    pub port: Option<u16>,
    pub bind: Option<String>,
    #[serde(alias = "enable-status-server")]
    pub enable_status_server: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proxy_url: None,
            insecure: Some(false),
            tls_ca_path: None,
            tls_cert_path: None,
            tls_key_path: None,
            scrape_interval: Some(DEFAULT_SCRAPE_INTERVAL),
            scrape_timeout: Some(DEFAULT_SCRAPE_TIMEOUT),
            platform_url: None,
            token: None,
            port: Some(DEFAULT_PORT),
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            enable_status_server: Some(true),
        }
    }
}

impl Config {
    pub fn scrape_interval(&self) -> Duration {
        Duration::from_secs(self.scrape_interval.unwrap_or(DEFAULT_SCRAPE_INTERVAL))
    }

    pub fn scrape_timeout(&self) -> Duration {
        Duration::from_secs(self.scrape_timeout.unwrap_or(DEFAULT_SCRAPE_TIMEOUT))
    }

    /// Request timeout of the proxy client. Outlasts `scrape_timeout`.
    pub fn request_timeout(&self) -> Duration {
        self.scrape_timeout() + CLIENT_TIMEOUT_GRACE
    }

    /// Transport to the proxy; mTLS unless `insecure` is set.
    pub fn transport(&self) -> anyhow::Result<Transport> {
        if self.insecure.unwrap_or(false) {
            return Ok(Transport::Insecure);
        }
        let path = |value: &Option<String>, name: &str| {
            value
                .as_deref()
                .map(PathBuf::from)
                .ok_or_else(|| anyhow!("{name} is required unless insecure is set"))
        };
        Ok(Transport::Mtls(MtlsPaths {
            ca: path(&self.tls_ca_path, "tls_ca_path")?,
            cert: path(&self.tls_cert_path, "tls_cert_path")?,
            key: path(&self.tls_key_path, "tls_key_path")?,
        }))
    }

    /// Builds the proxy client. Requests are bounded by [`Config::request_timeout`].
    pub fn proxy_client(&self) -> anyhow::Result<ProxyClient> {
        let url = self
            .proxy_url
            .as_deref()
            .ok_or_else(|| anyhow!("proxy_url is not set"))?;
        ProxyClient::with_timeout(url, &self.transport()?, self.request_timeout())
            .context("failed to build proxy client")
    }

    pub fn certificate_client(&self) -> anyhow::Result<CertificateClient> {
        let url = self
            .platform_url
            .as_deref()
            .ok_or_else(|| anyhow!("platform_url is not set"))?;
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| anyhow!("token is required when platform_url is set"))?;
        CertificateClient::new(url, token).context("failed to build certificate client")
    }

    /// Copy safe to print: the token is masked.
    pub fn redacted(&self) -> Config {
        let mut config = self.clone();
        if config.token.is_some() {
            config.token = Some(REDACTED.to_string());
        }
        config
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> anyhow::Result<()> {
    // Proxy endpoint
    let proxy_url = cfg
        .proxy_url
        .as_deref()
        .ok_or_else(|| anyhow!("proxy_url is not set"))?;
    validate_url("proxy_url", proxy_url)?;

    // mTLS material
    if !cfg.insecure.unwrap_or(false) {
        for (name, value) in [
            ("tls_ca_path", &cfg.tls_ca_path),
            ("tls_cert_path", &cfg.tls_cert_path),
            ("tls_key_path", &cfg.tls_key_path),
        ] {
            let Some(path) = value.as_deref() else {
                bail!("{} is required unless insecure is set", name);
            };
            validate_pem_file(name, Path::new(path))?;
        }
    }

    // Scrape timing
    let interval = cfg.scrape_interval.unwrap_or(DEFAULT_SCRAPE_INTERVAL);
    let timeout = cfg.scrape_timeout.unwrap_or(DEFAULT_SCRAPE_TIMEOUT);
    if interval == 0 {
        bail!("scrape_interval must be greater than 0");
    }
    if timeout == 0 {
        bail!("scrape_timeout must be greater than 0");
    }
    if timeout > interval {
        bail!(
            "scrape_timeout ({}s) must not exceed scrape_interval ({}s)",
            timeout,
            interval
        );
    }

    // Platform API
    if let Some(platform_url) = cfg.platform_url.as_deref() {
        validate_url("platform_url", platform_url)?;
        if cfg.token.as_deref().map_or(true, str::is_empty) {
            bail!("token is required when platform_url is set");
        }
    }

    // Status server
    if let Some(bind) = cfg.bind.as_deref() {
        bind.parse::<std::net::IpAddr>()
            .map_err(|e| anyhow!("invalid bind address '{}': {}", bind, e))?;
    }

    Ok(())
}

fn validate_url(name: &str, value: &str) -> anyhow::Result<()> {
    let url = reqwest::Url::parse(value).map_err(|e| anyhow!("invalid {} '{}': {}", name, value, e))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("invalid {} '{}': scheme must be http or https", name, value);
    }
    Ok(())
}

fn validate_pem_file(name: &str, path: &Path) -> anyhow::Result<()> {
    match fs::metadata(path) {
        Ok(meta) if meta.len() == 0 => bail!("{} file is empty: {}", name, path.display()),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            bail!("{} file not found: {}", name, path.display())
        }
        Err(e) => bail!("{} file is not readable: {} ({})", name, path.display(), e),
    }
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    // Proxy connection
    if let Some(url) = &args.proxy_url {
        config.proxy_url = Some(url.clone());
    }
    if args.insecure {
        config.insecure = Some(true);
    }
    if let Some(path) = &args.tls_ca {
        config.tls_ca_path = Some(path.to_string_lossy().to_string());
    }
    if let Some(path) = &args.tls_cert {
        config.tls_cert_path = Some(path.to_string_lossy().to_string());
    }
    if let Some(path) = &args.tls_key {
        config.tls_key_path = Some(path.to_string_lossy().to_string());
    }

    // Scraping
    if let Some(interval) = args.scrape_interval {
        config.scrape_interval = Some(interval);
    }
    if let Some(timeout) = args.scrape_timeout {
        config.scrape_timeout = Some(timeout);
    }

    // Platform API
    if let Some(url) = &args.platform_url {
        config.platform_url = Some(url.clone());
    }
    if let Some(token) = &args.token {
        config.token = Some(token.clone());
    }

    // Status server
    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }
    if let Some(cli_port) = args.port {
        config.port = Some(cli_port);
    }
    if args.disable_status_server {
        config.enable_status_server = Some(false);
    }

    Ok(config)
}

/// Configuration loading with multiple format support
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let path = match path {
        Some(p) => {
            if !p.exists() {
                bail!("config file not found: {}", p.display());
            }
            p.to_path_buf()
        }
        None => {
            // Try default locations
            let defaults = [
                "/etc/traefik-agent-bridge/config.yaml",
                "/etc/traefik-agent-bridge/config.yml",
                "/etc/traefik-agent-bridge/config.json",
                "./traefik-agent-bridge.yaml",
                "./traefik-agent-bridge.yml",
                "./traefik-agent-bridge.json",
            ];

            match defaults.iter().map(Path::new).find(|p| p.exists()) {
                Some(p) => p.to_path_buf(),
                None => return Ok(Config::default()),
            }
        }
    };

    let content = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;

    let config: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(&content)
            .with_context(|| format!("invalid JSON in {}", path.display()))?,
        Some("toml") => toml::from_str(&content)
            .with_context(|| format!("invalid TOML in {}", path.display()))?,
        // Default to YAML
        _ => serde_yaml::from_str(&content)
            .with_context(|| format!("invalid YAML in {}", path.display()))?,
    };
    info!("Loaded configuration from: {}", path.display());
    Ok(config)
}

/// Shows configuration in requested format, with the token masked
pub fn show_config(config: &Config, format: ConfigFormat) -> anyhow::Result<()> {
    let config = config.redacted();
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(&config)?,
        ConfigFormat::Toml => toml::to_string_pretty(&config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(&config)?,
    };

    println!("{output}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> String {
        format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
    }

    fn mtls_config() -> Config {
        Config {
            proxy_url: Some("https://127.0.0.1:8443".into()),
            tls_ca_path: Some(fixture("rootCA.pem")),
            tls_cert_path: Some(fixture("agent.pem")),
            tls_key_path: Some(fixture("agent-key.pem")),
            ..Config::default()
        }
    }

    #[test]
    fn test_default_config_requires_proxy_url() {
        let err = validate_effective_config(&Config::default()).unwrap_err();
        assert!(err.to_string().contains("proxy_url"));
    }

    #[test]
    fn test_mtls_config_is_valid() {
        validate_effective_config(&mtls_config()).unwrap();
        assert!(matches!(mtls_config().transport().unwrap(), Transport::Mtls(_)));
    }

    #[test]
    fn test_missing_tls_file() {
        let cfg = Config {
            tls_key_path: Some(fixture("missing-key.pem")),
            ..mtls_config()
        };
        let err = validate_effective_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("tls_key_path file not found"));
    }

    #[test]
    fn test_insecure_skips_tls_paths() {
        let cfg = Config {
            proxy_url: Some("http://127.0.0.1:8080".into()),
            insecure: Some(true),
            ..Config::default()
        };
        validate_effective_config(&cfg).unwrap();
        assert_eq!(cfg.transport().unwrap(), Transport::Insecure);
    }

    #[test]
    fn test_scrape_timing_rules() {
        let cfg = Config {
            scrape_interval: Some(0),
            ..mtls_config()
        };
        assert!(validate_effective_config(&cfg).is_err());

        let cfg = Config {
            scrape_interval: Some(5),
            scrape_timeout: Some(10),
            ..mtls_config()
        };
        let err = validate_effective_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("must not exceed"));

        let cfg = Config {
            scrape_interval: Some(10),
            scrape_timeout: Some(10),
            ..mtls_config()
        };
        validate_effective_config(&cfg).unwrap();
    }

    #[test]
    fn test_request_timeout_outlasts_scrape_timeout() {
        let cfg = Config {
            scrape_timeout: Some(3),
            ..mtls_config()
        };
        assert_eq!(cfg.request_timeout(), Duration::from_secs(4));
        assert!(cfg.request_timeout() > cfg.scrape_timeout());
        cfg.proxy_client().unwrap();
    }

    #[test]
    fn test_platform_url_requires_token() {
        let cfg = Config {
            platform_url: Some("https://platform.example.com".into()),
            ..mtls_config()
        };
        assert!(validate_effective_config(&cfg).is_err());

        let cfg = Config {
            token: Some("secret".into()),
            ..cfg
        };
        validate_effective_config(&cfg).unwrap();
        assert_eq!(cfg.redacted().token.as_deref(), Some(REDACTED));
    }

    #[test]
    fn test_load_config_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let yaml = dir.path().join("agent.yaml");
        fs::write(&yaml, "proxy_url: http://proxy:8080\nscrape-interval: 30\n").unwrap();
        let cfg = load_config(Some(&yaml)).unwrap();
        assert_eq!(cfg.proxy_url.as_deref(), Some("http://proxy:8080"));
        assert_eq!(cfg.scrape_interval, Some(30));

        let json = dir.path().join("agent.json");
        fs::write(&json, r#"{"insecure": true, "port": 9300}"#).unwrap();
        let cfg = load_config(Some(&json)).unwrap();
        assert_eq!(cfg.insecure, Some(true));
        assert_eq!(cfg.port, Some(9300));

        let toml_path = dir.path().join("agent.toml");
        fs::write(&toml_path, "scrape_timeout = 3\n").unwrap();
        assert_eq!(load_config(Some(&toml_path)).unwrap().scrape_timeout, Some(3));

        assert!(load_config(Some(&dir.path().join("missing.yaml"))).is_err());
    }
}
