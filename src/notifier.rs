use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::TELEGRAM_API_BASE;
use crate::types::{Outcome, Signal};

/// Telegram Bot API response envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    description: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct BotInfo {
    username: String,
}

/// Sends signal messages to a Telegram chat via the Bot API.
pub struct TelegramNotifier {
    http: reqwest::Client,
    base_url: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, chat_id: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("{TELEGRAM_API_BASE}/bot{bot_token}"),
            chat_id: chat_id.to_string(),
        }
    }

    /// Validate the bot token against `getMe`, returning the bot username.
    pub async fn check_token(&self) -> Result<String> {
        let url = format!("{}/getMe", self.base_url);
        let resp: ApiResponse<BotInfo> = self
            .http
            .get(&url)
            .send()
            .await
            .context("getMe request failed")?
            .json()
            .await
            .context("getMe returned invalid JSON")?;
        if !resp.ok {
            return Err(anyhow!(
                "getMe rejected: {}",
                resp.description.unwrap_or_else(|| "unknown error".into())
            ));
        }
        resp.result
            .map(|info| info.username)
            .ok_or_else(|| anyhow!("getMe returned no bot info"))
    }

    /// Deliver one plain-text message to the configured chat.
    pub async fn send_message(&self, text: &str) -> Result<()> {
        let url = format!("{}/sendMessage", self.base_url);
        let resp: ApiResponse<serde_json::Value> = self
            .http
            .post(&url)
            .json(&json!({
                "chat_id": self.chat_id,
                "text": text,
            }))
            .send()
            .await
            .context("sendMessage request failed")?
            .json()
            .await
            .context("sendMessage returned invalid JSON")?;
        if !resp.ok {
            return Err(anyhow!(
                "sendMessage rejected: {}",
                resp.description.unwrap_or_else(|| "unknown error".into())
            ));
        }
        debug!("Delivered message to chat {}", self.chat_id);
        Ok(())
    }
}

/// Format a signal as the plain-text message delivered to the channel.
pub fn format_signal(signal: &Signal) -> String {
    match signal {
        Signal::Entry {
            bet,
            trigger,
            max_gales,
        } => {
            let pattern: String = trigger.iter().map(Outcome::to_string).collect::<Vec<_>>().join("-");
            format!(
                "🎯 Entry on {} (pattern {pattern}) — protect up to {max_gales} gale(s)",
                bet.label()
            )
        }
        Signal::Gale {
            bet,
            attempt,
            max_gales,
        } => format!("⚠️ GALE {attempt}/{max_gales} — stay on {}", bet.label()),
        Signal::Win { by_tie: true, .. } => "✅ GREEN — tie".to_string(),
        Signal::Win {
            bet, gales_used, ..
        } => format!("✅ GREEN — {} hit after {gales_used} gale(s)", bet.label()),
        Signal::Loss { bet, gales_used } => format!(
            "❌ RED — {} missed, gale limit reached ({gales_used})",
            bet.label()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Outcome::{Banker as B, Player as P};

    #[test]
    fn entry_message() {
        let msg = format_signal(&Signal::Entry {
            bet: B,
            trigger: [P, P, P],
            max_gales: 2,
        });
        assert_eq!(
            msg,
            "🎯 Entry on Banker (pattern P-P-P) — protect up to 2 gale(s)"
        );
    }

    #[test]
    fn gale_message() {
        let msg = format_signal(&Signal::Gale {
            bet: P,
            attempt: 1,
            max_gales: 2,
        });
        assert_eq!(msg, "⚠️ GALE 1/2 — stay on Player");
    }

    #[test]
    fn green_message() {
        let msg = format_signal(&Signal::Win {
            bet: B,
            gales_used: 1,
            by_tie: false,
        });
        assert_eq!(msg, "✅ GREEN — Banker hit after 1 gale(s)");
    }

    #[test]
    fn green_by_tie_message() {
        let msg = format_signal(&Signal::Win {
            bet: B,
            gales_used: 0,
            by_tie: true,
        });
        assert_eq!(msg, "✅ GREEN — tie");
    }

    #[test]
    fn red_message() {
        let msg = format_signal(&Signal::Loss {
            bet: P,
            gales_used: 2,
        });
        assert_eq!(msg, "❌ RED — Player missed, gale limit reached (2)");
    }
}
