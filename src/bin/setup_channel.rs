//! setup-channel — First-time setup for the Bac Bo signal bot.
//!
//! Expects `config.toml` to already exist (copied from `config.toml.template`).
//! Validates the Telegram bot token against `getMe`, sends a test message to
//! the configured chat, and updates the token in the existing config file.
//!
//! By default, reads the bot token interactively (hidden input) to avoid
//! leaking it into shell history. Use `--bot-token` only for scripted/CI use.

use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Parser;

use bacbo_signals::config::{AppConfig, CONFIG_PATH};
use bacbo_signals::notifier::TelegramNotifier;

#[derive(Parser)]
#[command(
    name = "setup-channel",
    about = "Validate the Telegram bot token, send a test message, and save it to config.toml"
)]
struct Cli {
    /// Telegram bot token (from @BotFather).
    /// If omitted, reads interactively with hidden input (recommended).
    #[arg(long)]
    bot_token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = Path::new(CONFIG_PATH);

    // Load existing config
    let mut app_config = AppConfig::load(config_path).with_context(|| {
        format!(
            "{} not found — copy config.toml.template to config.toml first",
            config_path.display()
        )
    })?;

    println!("=== Bac Bo Signals — Channel Setup ===\n");

    // ── Step 1: Read bot token ─────────────────────────────────────
    let bot_token = match cli.bot_token {
        Some(token) => token,
        None => {
            let token = rpassword::prompt_password("Enter bot token: ")
                .context("failed to read bot token")?;
            if token.trim().is_empty() {
                bail!("bot token cannot be empty");
            }
            token.trim().to_string()
        }
    };

    // ── Step 2: Validate token ─────────────────────────────────────
    println!("Validating bot token...");
    let notifier = TelegramNotifier::new(&bot_token, &app_config.telegram.chat_id);
    let username = notifier
        .check_token()
        .await
        .context("token validation failed — check the token from @BotFather")?;
    println!("  Bot: @{username}");
    println!();

    // ── Step 3: Send test message ──────────────────────────────────
    println!(
        "Sending test message to chat {}...",
        app_config.telegram.chat_id
    );
    notifier
        .send_message("Bac Bo signal bot connected.")
        .await
        .context("test message failed — is the bot an admin of the chat?")?;
    println!("  Test message delivered");
    println!();

    // ── Step 4: Update token in config.toml ────────────────────────
    println!("Updating bot token in {}...", config_path.display());
    app_config.telegram.bot_token = bot_token;
    app_config.save(config_path)?;
    println!("  Config updated successfully");
    println!();

    // ── Summary ────────────────────────────────────────────────────
    println!("=== Setup Complete ===");
    println!();
    println!("Channel:");
    println!("  Bot:  @{username}");
    println!("  Chat: {}", app_config.telegram.chat_id);
    println!();
    println!("Next steps:");
    println!("  chromedriver --port=9515 &");
    println!("  cargo run --bin signals -- --dry-run");

    Ok(())
}
