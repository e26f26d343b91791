//! CLI arguments and subcommands for traefik-agent-bridge.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Output format for scrape results
#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
    Table,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "traefik-agent-bridge",
    about = "Agent-side metrics and configuration bridge for Traefik",
    long_about = "Agent-side metrics and configuration bridge for Traefik.\n\n\
                  Scrapes the proxy's Prometheus metrics and normalizes them into per-service \
                  and per-ingress aggregates, pushes versioned dynamic configuration over mTLS \
                  and fetches the wildcard certificate from the platform API.",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Proxy agent endpoint base URL
    #[arg(long)]
    pub proxy_url: Option<String>,

    /// Talk to the proxy without mTLS
    #[arg(long)]
    pub insecure: bool,

    /// CA certificate the proxy must present a chain to (PEM)
    #[arg(long)]
    pub tls_ca: Option<PathBuf>,

    /// Agent client certificate (PEM)
    #[arg(long)]
    pub tls_cert: Option<PathBuf>,

    /// Agent private key (PEM)
    #[arg(long)]
    pub tls_key: Option<PathBuf>,

    /// Seconds between scrape cycles
    #[arg(long)]
    pub scrape_interval: Option<u64>,

    /// Seconds after which a scrape cycle is cancelled
    #[arg(long)]
    pub scrape_timeout: Option<u64>,

    /// Platform API base URL
    #[arg(long)]
    pub platform_url: Option<String>,

    /// Platform API token
    #[arg(long, env = "TRAEFIK_AGENT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Status server port
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Bind the status server to a specific interface/IP
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Do not start the status server
    #[arg(long)]
    pub disable_status_server: bool,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate configuration and probe the proxy metrics endpoint
    Check,

    /// Generate configuration files
    Config {
        /// Output file path
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },

    /// Run one scrape cycle and print the aggregates
    Scrape {
        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Fetch the wildcard certificate from the platform
    Certificate {
        /// Write cert.pem and key.pem into this directory
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Push a dynamic configuration snapshot to the proxy
    Push {
        /// Snapshot file (JSON, or YAML by extension)
        #[arg(short = 'f', long)]
        file: PathBuf,
    },
}
