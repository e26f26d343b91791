//! Check command implementation.
//!
//! Validates the configuration and probes the proxy metrics endpoint once.

use std::time::Instant;
use tokio_util::sync::CancellationToken;

use traefik_agent_bridge::Scraper;

use crate::config::{validate_effective_config, Config};

/// Validates configuration and proxy reachability.
pub async fn command_check(config: &Config) -> anyhow::Result<()> {
    println!("🔍 Traefik Agent Bridge - Check");
    println!("===============================");

    let mut all_ok = true;

    // Check configuration
    println!("\n⚙️  Checking configuration...");
    match validate_effective_config(config) {
        Ok(_) => println!("   ✅ Configuration is valid"),
        Err(e) => {
            println!("   ❌ Configuration invalid: {}", e);
            all_ok = false;
        }
    }

    // Check proxy
    println!("\n📡 Checking proxy metrics endpoint...");
    match config.proxy_client() {
        Ok(client) => {
            println!("   ✅ Client ready for {}", client.base_url());
            let scraper = Scraper::new(client);
            let start = Instant::now();
            match scraper.scrape(&CancellationToken::new()).await {
                Ok(metrics) => println!(
                    "   ✅ Scraped {} aggregates in {:.3}s",
                    metrics.len(),
                    start.elapsed().as_secs_f64()
                ),
                Err(e) => {
                    println!("   ❌ {}", e);
                    all_ok = false;
                }
            }
        }
        Err(e) => {
            println!("   ❌ {:#}", e);
            all_ok = false;
        }
    }

    // Check platform
    if config.platform_url.is_some() {
        println!("\n🔐 Checking platform client...");
        match config.certificate_client() {
            Ok(_) => println!("   ✅ Platform client configured"),
            Err(e) => {
                println!("   ❌ {:#}", e);
                all_ok = false;
            }
        }
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed - agent is ready");
        Ok(())
    } else {
        println!("   ❌ Some checks failed - please review the output above");
        std::process::exit(1);
    }
}
