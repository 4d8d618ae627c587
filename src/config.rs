use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::types::{Rule, default_rules};
use crate::{DEFAULT_WEBDRIVER_URL, GAME_URL};

/// Default config file path.
pub const CONFIG_PATH: &str = "config.toml";

/// Top-level application config deserialized from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub settings: SettingsConfig,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// Telegram delivery credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

/// Page scraping parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    #[serde(default = "default_game_url")]
    pub game_url: String,
    /// Iframe chain to descend, outermost first.
    #[serde(default = "default_iframe_xpaths")]
    pub iframe_xpaths: Vec<String>,
    /// XPath of the element whose text holds the results strip.
    #[serde(default = "default_results_xpath")]
    pub results_xpath: String,
    /// How many of the most recent rounds each snapshot keeps.
    #[serde(default = "default_snapshot_len")]
    pub snapshot_len: usize,
}

fn default_webdriver_url() -> String {
    DEFAULT_WEBDRIVER_URL.to_string()
}

fn default_game_url() -> String {
    GAME_URL.to_string()
}

fn default_iframe_xpaths() -> Vec<String> {
    vec![
        "/html/body/div[2]/div[1]/div[3]/div/div/div/div[2]/div[2]/div/iframe".to_string(),
        "/html/body/iframe".to_string(),
        "/html/body/div[5]/div[2]/iframe".to_string(),
    ]
}

fn default_results_xpath() -> String {
    "/html/body/div[4]/div/div/div[2]/div[6]/div/div[1]/div/div/div".to_string()
}

fn default_snapshot_len() -> usize {
    10
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            game_url: default_game_url(),
            iframe_xpaths: default_iframe_xpaths(),
            results_xpath: default_results_xpath(),
            snapshot_len: default_snapshot_len(),
        }
    }
}

/// Runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsConfig {
    /// Polling interval in seconds for round detection.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_poll_interval() -> u64 {
    5
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
        }
    }
}

/// One `[[rules]]` entry: trigger pattern, predicted bet, gale budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Trigger string, e.g. `"PPB"`.
    pub trigger: String,
    /// Outcome to bet when the trigger matches, `"P"` or `"B"`.
    pub bet: String,
    #[serde(default = "default_max_gales")]
    pub max_gales: u8,
}

fn default_max_gales() -> u8 {
    2
}

impl RuleConfig {
    pub fn to_rule(&self) -> Result<Rule> {
        let bet = self
            .bet
            .parse()
            .with_context(|| format!("rule {:?}: invalid bet {:?}", self.trigger, self.bet))?;
        Rule::from_spec(&self.trigger, bet, self.max_gales)
    }
}

/// Build the engine rule table from config, falling back to the default
/// table when no rules are configured. Fails on the first invalid entry.
pub fn build_rules(configs: &[RuleConfig]) -> Result<Vec<Rule>> {
    if configs.is_empty() {
        return Ok(default_rules());
    }
    configs.iter().map(RuleConfig::to_rule).collect()
}

impl AppConfig {
    /// Load config from the given TOML file path.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Write config to the given TOML file path.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("failed to serialize config")?;
        std::fs::write(path, contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}
