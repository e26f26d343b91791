//! Scrape command implementation.
//!
//! Runs a single scrape cycle and prints the aggregates.

use std::time::Instant;
use tokio_util::sync::CancellationToken;

use traefik_agent_bridge::{Metric, Scraper};

use crate::cli::OutputFormat;
use crate::config::Config;

/// Runs one scrape cycle, bounded by the configured scrape timeout.
pub async fn command_scrape(format: OutputFormat, config: &Config) -> anyhow::Result<()> {
    let scraper = Scraper::new(config.proxy_client()?);

    let cancel = CancellationToken::new();
    let timeout = config.scrape_timeout();
    let timer = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            cancel.cancel();
        })
    };

    let start = Instant::now();
    let result = scraper.scrape(&cancel).await;
    timer.abort();
    let metrics = result?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&metrics)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&metrics)?),
        OutputFormat::Table => {
            print!("{}", render_table(&metrics));
            println!(
                "\n✅ {} aggregates in {:.3}s",
                metrics.len(),
                start.elapsed().as_secs_f64()
            );
        }
    }
    Ok(())
}

/// Renders aggregates as a plain-text table.
fn render_table(metrics: &[Metric]) -> String {
    let mut out = format!("{:24} | {:60} | {:>14}\n", "Kind", "Entity", "Value");
    out.push_str(&"-".repeat(104));
    out.push('\n');
    for metric in metrics {
        let value = match metric {
            Metric::Counter(c) => format!("{}", c.value),
            Metric::Histogram(h) => format!("{:.6}s/{}", h.sum, h.count),
        };
        out.push_str(&format!(
            "{:24} | {:60} | {:>14}\n",
            metric.kind(),
            metric.entity().to_string(),
            value
        ));
    }
    out
}
