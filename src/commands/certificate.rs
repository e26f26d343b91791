//! Certificate command implementation.
//!
//! Fetches the wildcard certificate and optionally writes it to disk.

use anyhow::Context;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

use traefik_agent_bridge::Certificate;

use crate::config::Config;

pub const CERT_FILE: &str = "cert.pem";
pub const KEY_FILE: &str = "key.pem";

/// Fetches the wildcard certificate from the platform.
pub async fn command_certificate(out_dir: Option<PathBuf>, config: &Config) -> anyhow::Result<()> {
    let client = config.certificate_client()?;
    let certificate = client
        .get_certificate()
        .await
        .context("failed to fetch certificate")?;

    println!("🔐 Wildcard certificate");
    println!("   Domains:    {}", certificate.domains.join(", "));
    println!("   Not before: {}", certificate.not_before.to_rfc3339());
    println!("   Not after:  {}", certificate.not_after.to_rfc3339());
    if certificate.is_valid_at(Utc::now()) {
        println!("   ✅ Currently valid");
    } else {
        println!("   ⚠️  Not valid at the current time");
    }

    if let Some(dir) = out_dir {
        write_pem_files(&certificate, &dir)?;
        println!("✅ Certificate written to: {}", dir.display());
    }
    Ok(())
}

/// Writes `cert.pem` and `key.pem` into `dir`, creating it if needed.
pub fn write_pem_files(certificate: &Certificate, dir: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let cert_path = dir.join(CERT_FILE);
    fs::write(&cert_path, &certificate.certificate)
        .with_context(|| format!("failed to write {}", cert_path.display()))?;

    let key_path = dir.join(KEY_FILE);
    fs::write(&key_path, &certificate.private_key)
        .with_context(|| format!("failed to write {}", key_path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&key_path, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("failed to restrict {}", key_path.display()))?;
    }
    Ok(())
}
