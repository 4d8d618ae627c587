use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use bacbo_signals::config::{AppConfig, CONFIG_PATH, build_rules};
use bacbo_signals::engine::StrategyEngine;
use bacbo_signals::notifier::{TelegramNotifier, format_signal};
use bacbo_signals::reporter;
use bacbo_signals::scraper::{ResultScraper, diff_new_outcomes};
use bacbo_signals::state::SessionState;
use bacbo_signals::types::{Outcome, RoundEvent};

/// How many times to retry the initial snapshot before giving up.
const SEED_ATTEMPTS: u32 = 5;

/// Delay between initial snapshot attempts.
const SEED_RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "signals", about = "Bac Bo pattern signal bot")]
struct Args {
    /// Run without Telegram delivery (signals go to the log and stdout only)
    #[arg(long, conflicts_with = "live")]
    dry_run: bool,

    /// Run in live mode (delivers signals to the Telegram chat)
    #[arg(long, conflicts_with = "dry_run")]
    live: bool,

    /// Config file path
    #[arg(long, default_value = CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Require exactly one mode
    if !args.dry_run && !args.live {
        anyhow::bail!("Must specify either --dry-run or --live");
    }

    // Load config; TELEGRAM_BOT_TOKEN from the environment wins over the file
    let mut config = AppConfig::load(&args.config)?;
    info!("Loaded config from {}", args.config.display());
    if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
        if !token.is_empty() {
            config.telegram.bot_token = token;
        }
    }

    let rules = build_rules(&config.rules)?;
    info!("Rule table ({} rules):", rules.len());
    for rule in &rules {
        info!(
            "  {} -> bet {} (max {} gales)",
            rule.trigger_str(),
            rule.bet,
            rule.max_gales
        );
    }
    let mut engine = StrategyEngine::new(rules)?;
    let mut state = SessionState::new();

    let mode = if args.dry_run { "dry-run" } else { "live" };
    let poll_interval_secs = config.settings.poll_interval_secs;
    info!(
        "Starting signal bot ({mode}) — game={} poll={}s",
        config.scraper.game_url, poll_interval_secs
    );

    // Validate Telegram delivery up front in live mode
    let notifier = if args.live {
        let tg = TelegramNotifier::new(&config.telegram.bot_token, &config.telegram.chat_id);
        let username = tg.check_token().await?;
        info!("Telegram bot @{username} ready, chat {}", config.telegram.chat_id);
        Some(tg)
    } else {
        None
    };

    info!("Connecting to WebDriver at {}...", config.scraper.webdriver_url);
    let mut scraper = ResultScraper::connect(config.scraper.clone()).await?;
    info!("Game page open");

    // --- Seed history from the rounds already on the board ---
    let mut prev_snapshot = seed_history(&mut scraper, &mut engine).await?;

    // --- Polling loop ---
    info!("Entering polling loop (interval: {poll_interval_secs}s). Press Ctrl+C to stop.");
    let poll_duration = Duration::from_secs(poll_interval_secs);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
            _ = tokio::time::sleep(poll_duration) => {
                if let Err(e) = poll_cycle(
                    &mut scraper,
                    &mut engine,
                    &mut state,
                    &mut prev_snapshot,
                    notifier.as_ref(),
                ).await {
                    warn!("Poll cycle error: {e}");
                }
            }
        }
    }

    // --- Session summary ---
    let summary = state.summary();
    reporter::report_session_summary(&summary);

    if let Err(e) = scraper.close().await {
        warn!("Failed to close browser session: {e}");
    }

    Ok(())
}

/// Fetch the initial snapshot (with retries while the board is still
/// loading) and seed the engine history without firing signals.
async fn seed_history(
    scraper: &mut ResultScraper,
    engine: &mut StrategyEngine,
) -> Result<Vec<Outcome>> {
    for attempt in 1..=SEED_ATTEMPTS {
        match scraper.latest_outcomes().await {
            Ok(snapshot) if !snapshot.is_empty() => {
                engine.seed(snapshot.iter().copied());
                info!("Seeded {} historical round(s)", snapshot.len());
                return Ok(snapshot);
            }
            Ok(_) => {
                warn!("Results strip empty (attempt {attempt}/{SEED_ATTEMPTS}), retrying...");
            }
            Err(e) => {
                warn!("Initial scrape failed (attempt {attempt}/{SEED_ATTEMPTS}): {e}");
            }
        }
        tokio::time::sleep(SEED_RETRY_DELAY).await;
    }
    anyhow::bail!("could not read an initial results snapshot after {SEED_ATTEMPTS} attempts")
}

/// One polling cycle: scrape the board, diff against the previous snapshot,
/// feed each new round to the engine, deliver and report any signals.
async fn poll_cycle(
    scraper: &mut ResultScraper,
    engine: &mut StrategyEngine,
    state: &mut SessionState,
    prev_snapshot: &mut Vec<Outcome>,
    notifier: Option<&TelegramNotifier>,
) -> Result<()> {
    let snapshot = scraper.latest_outcomes().await?;
    if snapshot.is_empty() {
        warn!("Empty results snapshot, skipping cycle");
        return Ok(());
    }

    let new_outcomes = diff_new_outcomes(prev_snapshot, &snapshot);
    if new_outcomes.len() == snapshot.len() && !prev_snapshot.is_empty() {
        warn!(
            "No overlap with previous snapshot — page may have reloaded, treating {} round(s) as new",
            new_outcomes.len()
        );
    }
    *prev_snapshot = snapshot;

    if new_outcomes.is_empty() {
        info!("No new rounds (seen: {})", engine.rounds_seen());
        return Ok(());
    }
    info!("Detected {} new round(s)", new_outcomes.len());

    for outcome in new_outcomes {
        let signal = engine.on_new_outcome(outcome);
        state.record_round(signal.as_ref());

        if let Some(signal) = &signal {
            let message = format_signal(signal);
            info!("{message}");
            if let Some(tg) = notifier {
                if let Err(e) = tg.send_message(&message).await {
                    warn!("Telegram delivery failed: {e}");
                }
            }
        }

        let event = RoundEvent {
            timestamp: chrono::Utc::now().to_rfc3339(),
            round: state.rounds_observed,
            outcome,
            signal,
            greens: state.greens,
            reds: state.reds,
        };
        reporter::report_event(&event);
    }

    Ok(())
}
