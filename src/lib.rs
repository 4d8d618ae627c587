pub mod config;
pub mod engine;
pub mod notifier;
pub mod reporter;
pub mod scraper;
pub mod state;
pub mod types;

/// Default Bac Bo live table URL.
pub const GAME_URL: &str = "https://www.bettilt504.com/pt/game/bac-bo/real";

/// Telegram Bot API base URL.
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Default local WebDriver endpoint (chromedriver).
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";
