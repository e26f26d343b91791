//! traefik-agent-bridge
//!
//! Agent-side bridge between a Traefik instance and its control plane.
//! This is the main entry point that runs the poll loop and status server
//! and handles subcommands.

mod cli;
mod commands;
mod config;
mod handlers;
mod poller;
mod state;
mod telemetry;

use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};

use traefik_agent_bridge::Scraper;

use cli::{Args, Commands, LogLevel};
use commands::{command_certificate, command_check, command_config, command_push, command_scrape};
use config::{
    resolve_config, show_config, validate_effective_config, Config, DEFAULT_BIND_ADDR, DEFAULT_PORT,
};
use state::{AppState, SharedState};

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(args: &Args) {
    let log_level = match args.log_level {
        LogLevel::Off => None,
        LogLevel::Error => Some(Level::ERROR),
        LogLevel::Warn => Some(Level::WARN),
        LogLevel::Info => Some(Level::INFO),
        LogLevel::Debug => Some(Level::DEBUG),
        LogLevel::Trace => Some(Level::TRACE),
    };
    let Some(log_level) = log_level else {
        return;
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return;
    }

    info!("Logging initialized with level: {:?}", args.log_level);
}

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> anyhow::Result<Config> {
    let config = resolve_config(args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {:#}", e);
        std::process::exit(1);
    }
    Ok(config)
}

/// Resolves once SIGINT or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

/// Main application entry point.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {:#}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, args.config_format.clone());
    }

    // Handle subcommands
    if let Some(command) = &args.command {
        if let Commands::Config {
            output,
            format,
            commented,
        } = command
        {
            return command_config(output.clone(), format.clone(), *commented);
        }

        setup_logging(&args);

        // Check reports invalid configuration itself
        if let Commands::Check = command {
            return command_check(&resolve_config(&args)?).await;
        }

        let config = load_validated_config(&args)?;

        return match command {
            Commands::Scrape { format } => command_scrape(format.clone(), &config).await,
            Commands::Certificate { out_dir } => command_certificate(out_dir.clone(), &config).await,
            Commands::Push { file } => command_push(file, &config).await,
            Commands::Config { .. } | Commands::Check => unreachable!("handled above"),
        };
    }

    // Load configuration for agent mode
    let config = load_validated_config(&args)?;

    setup_logging(&args);

    info!("Starting traefik-agent-bridge");

    let scraper = Scraper::new(config.proxy_client()?);
    let state: SharedState = Arc::new(AppState::new(config.clone())?);
    let shutdown = CancellationToken::new();

    let poller = tokio::spawn(poller::run_poll_loop(
        state.clone(),
        scraper,
        shutdown.clone(),
    ));

    if config.enable_status_server.unwrap_or(true) {
        let bind_ip_str = config.bind.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        let port = config.port.unwrap_or(DEFAULT_PORT);
        let addr: SocketAddr = format!("{}:{}", bind_ip_str, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", bind_ip_str, port))?;

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind status server to {}", addr))?;
        info!("Status server listening on http://{}", addr);

        let app = handlers::router(state.clone());
        let server = axum::serve(listener, app).with_graceful_shutdown({
            let shutdown = shutdown.clone();
            async move { shutdown.cancelled().await }
        });

        tokio::select! {
            result = server => {
                if let Err(e) = result {
                    error!("Server error: {}", e);
                    shutdown.cancel();
                    return Err(e.into());
                }
            }
            _ = shutdown_signal() => {
                info!("Shutdown signal received, exiting...");
            }
        }
    } else {
        info!("Status server disabled");
        shutdown_signal().await;
    }

    shutdown.cancel();
    if let Err(e) = poller.await {
        warn!("Poll loop ended abnormally: {}", e);
    }

    info!("traefik-agent-bridge stopped gracefully");
    Ok(())
}
