use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use fantoccini::wd::WindowHandle;
use fantoccini::{Client, ClientBuilder, Locator};
use tracing::{debug, warn};

use crate::config::ScraperConfig;
use crate::types::Outcome;

/// How long to wait for an iframe or the results element to appear.
const ELEMENT_WAIT: Duration = Duration::from_secs(10);

/// Poll interval while waiting for elements.
const ELEMENT_POLL: Duration = Duration::from_millis(500);

/// WebDriver-backed reader for the Bac Bo results strip.
///
/// The game board lives inside a chain of nested iframes; every snapshot
/// re-enters the chain from the top-level window because the casino page
/// re-renders the frames between rounds.
pub struct ResultScraper {
    client: Client,
    main_window: WindowHandle,
    cfg: ScraperConfig,
}

impl ResultScraper {
    /// Connect to the WebDriver endpoint and open the game page.
    pub async fn connect(cfg: ScraperConfig) -> Result<Self> {
        let client = ClientBuilder::native()
            .connect(&cfg.webdriver_url)
            .await
            .with_context(|| format!("failed to connect to WebDriver at {}", cfg.webdriver_url))?;
        client
            .goto(&cfg.game_url)
            .await
            .with_context(|| format!("failed to open {}", cfg.game_url))?;
        let main_window = client.window().await.context("failed to get main window")?;
        Ok(Self {
            client,
            main_window,
            cfg,
        })
    }

    /// Raw text of the results element, after descending the iframe chain.
    pub async fn raw_results_text(&mut self) -> Result<String> {
        self.client
            .switch_to_window(self.main_window.clone())
            .await
            .context("failed to switch to main window")?;

        for xpath in &self.cfg.iframe_xpaths {
            let iframe = self
                .client
                .wait()
                .at_most(ELEMENT_WAIT)
                .every(ELEMENT_POLL)
                .for_element(Locator::XPath(xpath))
                .await
                .with_context(|| format!("iframe not found: {xpath}"))?;
            iframe
                .enter_frame()
                .await
                .with_context(|| format!("failed to enter iframe: {xpath}"))?;
        }

        let element = self
            .client
            .wait()
            .at_most(ELEMENT_WAIT)
            .every(ELEMENT_POLL)
            .for_element(Locator::XPath(&self.cfg.results_xpath))
            .await
            .context("results element not found")?;
        let text = element.text().await.context("failed to read results text")?;
        Ok(text)
    }

    /// Latest outcome snapshot in chronological order (oldest first),
    /// truncated to the configured snapshot length.
    pub async fn latest_outcomes(&mut self) -> Result<Vec<Outcome>> {
        let text = self.raw_results_text().await?;
        let outcomes = parse_results_text(&text, self.cfg.snapshot_len);
        debug!("Scraped {} outcomes from results strip", outcomes.len());
        Ok(outcomes)
    }

    /// End the WebDriver session.
    pub async fn close(self) -> Result<()> {
        self.client
            .close()
            .await
            .context("failed to close WebDriver session")
    }
}

/// Parse the results strip text into chronological outcomes.
///
/// The page lists rounds oldest-first; tokens that are not outcome symbols
/// (score digits, labels) are skipped. At most `snapshot_len` of the most
/// recent rounds are kept.
pub fn parse_results_text(text: &str, snapshot_len: usize) -> Vec<Outcome> {
    let mut outcomes: Vec<Outcome> = text
        .split_whitespace()
        .filter_map(|token| match Outcome::from_str(token) {
            Ok(o) => Some(o),
            Err(_) => {
                warn!("Skipping unrecognized results token {token:?}");
                None
            }
        })
        .collect();
    if outcomes.len() > snapshot_len {
        outcomes.drain(..outcomes.len() - snapshot_len);
    }
    outcomes
}

/// Diff two chronological snapshots of the results window, returning only
/// the genuinely new rounds at the tail of `cur`.
///
/// The window slides: old rounds drop off the front as new ones append. The
/// longest suffix of `prev` matching a prefix of `cur` is treated as overlap,
/// which is the conservative choice — a round is never delivered twice, per
/// the engine's dedup contract. With no overlap at all (page reload, table
/// change) the whole of `cur` is returned.
pub fn diff_new_outcomes(prev: &[Outcome], cur: &[Outcome]) -> Vec<Outcome> {
    if prev.is_empty() {
        return cur.to_vec();
    }
    let max_k = prev.len().min(cur.len());
    for k in (1..=max_k).rev() {
        if prev[prev.len() - k..] == cur[..k] {
            return cur[k..].to_vec();
        }
    }
    cur.to_vec()
}
