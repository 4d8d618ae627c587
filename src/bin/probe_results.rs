//! Probe: results strip scraping
//!
//! Connects to the WebDriver endpoint, opens the game page, and dumps a few
//! snapshot cycles to verify:
//! - The iframe chain and results XPath still match the page
//! - Raw text shape and which tokens parse as outcomes
//! - Snapshot diffing across cycles (what would be fed to the engine)

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use bacbo_signals::config::{AppConfig, CONFIG_PATH};
use bacbo_signals::scraper::{ResultScraper, diff_new_outcomes, parse_results_text};
use bacbo_signals::types::Outcome;

const CYCLES: usize = 5;
const CYCLE_DELAY: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load(Path::new(CONFIG_PATH))?;
    let snapshot_len = config.scraper.snapshot_len;

    println!("=== Probe: results strip ===");
    println!("WebDriver: {}", config.scraper.webdriver_url);
    println!("Game URL:  {}", config.scraper.game_url);
    println!();

    let mut scraper = ResultScraper::connect(config.scraper).await?;
    let mut prev: Vec<Outcome> = Vec::new();

    for cycle in 1..=CYCLES {
        println!("--- Cycle {cycle}/{CYCLES} ---");
        match scraper.raw_results_text().await {
            Ok(text) => {
                println!("Raw text: {text:?}");
                let snapshot = parse_results_text(&text, snapshot_len);
                let rendered: Vec<String> = snapshot.iter().map(Outcome::to_string).collect();
                println!("Parsed ({}): {}", snapshot.len(), rendered.join(" "));
                let new = diff_new_outcomes(&prev, &snapshot);
                let new_rendered: Vec<String> = new.iter().map(Outcome::to_string).collect();
                println!("New vs previous: [{}]", new_rendered.join(" "));
                prev = snapshot;
            }
            Err(e) => {
                println!("Scrape failed: {e:#}");
            }
        }
        println!();
        if cycle < CYCLES {
            tokio::time::sleep(CYCLE_DELAY).await;
        }
    }

    scraper.close().await?;
    Ok(())
}
