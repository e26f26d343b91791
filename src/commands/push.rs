//! Push command implementation.
//!
//! Reads a dynamic configuration snapshot from disk and pushes it to the proxy.

use anyhow::Context;
use std::fs;
use std::path::Path;

use traefik_agent_bridge::ConfigVersion;

use crate::config::Config;

/// Pushes the snapshot in `file` with a fresh version.
pub async fn command_push(file: &Path, config: &Config) -> anyhow::Result<()> {
    let snapshot = load_snapshot(file)?;
    let client = config.proxy_client()?;

    let version = ConfigVersion::new().next();
    client
        .push_dynamic(version, &snapshot)
        .await
        .with_context(|| format!("failed to push {}", file.display()))?;

    println!("✅ Configuration pushed (version {})", version);
    Ok(())
}

/// Loads a JSON snapshot, or YAML for `.yaml`/`.yml` files.
pub fn load_snapshot(file: &Path) -> anyhow::Result<serde_json::Value> {
    let content =
        fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;

    let snapshot = match file.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
            .with_context(|| format!("invalid YAML in {}", file.display()))?,
        _ => serde_json::from_str(&content)
            .with_context(|| format!("invalid JSON in {}", file.display()))?,
    };
    Ok(snapshot)
}
