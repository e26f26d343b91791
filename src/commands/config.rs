//! Config command implementation.
//!
//! Generates configuration files in various formats.

use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;
use crate::config::Config;

/// Generates configuration files.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> anyhow::Result<()> {
    let config = Config::default();
    let output = output.unwrap_or_else(|| PathBuf::from("traefik-agent-bridge.yaml"));

    let content = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(&config)?,
        ConfigFormat::Toml => toml::to_string_pretty(&config)?,
        ConfigFormat::Yaml => {
            let content = serde_yaml::to_string(&config)?;
            if commented {
                add_config_comments(content)
            } else {
                content
            }
        }
    };

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# Traefik Agent Bridge Configuration
# ===================================
#
# Proxy Connection
# ----------------
# proxy_url: "https://traefik:8484"  # Base URL of the proxy agent endpoints
# insecure: false              # Skip mTLS (local testing only)
# tls_ca_path: null            # CA the proxy certificate chains to (PEM)
# tls_cert_path: null          # Agent client certificate (PEM)
# tls_key_path: null           # Agent private key (PEM)
#
# Scraping
# --------
# scrape_interval: 60          # Seconds between scrape cycles
# scrape_timeout: 10           # Seconds before a cycle is cancelled (<= interval)
#
# Platform API
# ------------
# platform_url: null           # Base URL serving /wildcard-certificate
# token: null                  # Bearer token (or TRAEFIK_AGENT_TOKEN)
#
# Status Server
# -------------
# bind: "0.0.0.0"              # Bind IP (0.0.0.0 = all interfaces)
# port: 9217                   # HTTP port
# enable_status_server: true   # Serve /health, /aggregates and /metrics
"#;

    format!("{comments}\n{yaml}")
}
