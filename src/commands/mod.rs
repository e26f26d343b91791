//! CLI command implementations for traefik-agent-bridge.
//!
//! This module provides implementations for all CLI subcommands:
//! - `check`: Configuration validation and proxy probe
//! - `config`: Configuration file generation
//! - `scrape`: One scrape cycle with printed aggregates
//! - `certificate`: Wildcard certificate retrieval
//! - `push`: Dynamic configuration push

pub mod certificate;
pub mod check;
pub mod config;
pub mod push;
pub mod scrape;

// Re-export command functions
pub use certificate::command_certificate;
pub use check::command_check;
pub use config::command_config;
pub use push::command_push;
pub use scrape::command_scrape;
