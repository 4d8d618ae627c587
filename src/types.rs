use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Number of outcomes in a rule trigger window.
pub const TRIGGER_LEN: usize = 3;

/// One observed round result on the Bac Bo board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(rename = "P")]
    Player,
    #[serde(rename = "B")]
    Banker,
    #[serde(rename = "T")]
    Tie,
}

impl Outcome {
    /// Human-readable name for notification messages.
    pub fn label(self) -> &'static str {
        match self {
            Outcome::Player => "Player",
            Outcome::Banker => "Banker",
            Outcome::Tie => "Tie",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Outcome::Player => 'P',
            Outcome::Banker => 'B',
            Outcome::Tie => 'T',
        };
        write!(f, "{c}")
    }
}

impl FromStr for Outcome {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "P" | "p" => Ok(Outcome::Player),
            "B" | "b" => Ok(Outcome::Banker),
            "T" | "t" => Ok(Outcome::Tie),
            other => bail!("unknown outcome symbol {other:?} (expected P, B or T)"),
        }
    }
}

/// One betting rule: when the last [`TRIGGER_LEN`] outcomes equal `trigger`,
/// signal an entry on `bet`, protecting up to `max_gales` martingale retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub trigger: [Outcome; TRIGGER_LEN],
    pub bet: Outcome,
    pub max_gales: u8,
}

impl Rule {
    /// Build a rule from a trigger string such as `"PPB"`.
    ///
    /// The string must contain exactly [`TRIGGER_LEN`] valid outcome symbols.
    pub fn from_spec(trigger: &str, bet: Outcome, max_gales: u8) -> Result<Self> {
        let symbols: Vec<Outcome> = trigger
            .trim()
            .chars()
            .map(|c| Outcome::from_str(&c.to_string()))
            .collect::<Result<_>>()
            .with_context(|| format!("invalid trigger {trigger:?}"))?;
        let trigger_arr: [Outcome; TRIGGER_LEN] = symbols.try_into().map_err(|v: Vec<_>| {
            anyhow::anyhow!(
                "trigger {trigger:?} has {} symbols, expected {TRIGGER_LEN}",
                v.len()
            )
        })?;
        Ok(Rule {
            trigger: trigger_arr,
            bet,
            max_gales,
        })
    }

    /// Trigger rendered as a compact string, e.g. `PPB`.
    pub fn trigger_str(&self) -> String {
        self.trigger.iter().map(Outcome::to_string).collect()
    }
}

/// Default rule table used when no `[[rules]]` entries are configured.
pub fn default_rules() -> Vec<Rule> {
    use Outcome::{Banker as B, Player as P};
    vec![
        Rule { trigger: [P, P, P], bet: B, max_gales: 2 },
        Rule { trigger: [B, B, B], bet: P, max_gales: 2 },
        Rule { trigger: [B, B, P], bet: P, max_gales: 2 },
        Rule { trigger: [P, P, B], bet: B, max_gales: 2 },
    ]
}

/// Engine output per round, when the round changes signal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Signal {
    /// A trigger matched: predict `bet` on the next round.
    Entry {
        bet: Outcome,
        trigger: [Outcome; TRIGGER_LEN],
        max_gales: u8,
    },
    /// The predicted outcome missed but gales remain; `attempt` is 1-based.
    Gale {
        bet: Outcome,
        attempt: u8,
        max_gales: u8,
    },
    /// The predicted outcome hit (or a tie landed while pending) — "green".
    Win {
        bet: Outcome,
        gales_used: u8,
        by_tie: bool,
    },
    /// Gale budget exhausted without a hit — "red".
    Loss { bet: Outcome, gales_used: u8 },
}

/// One reported round: the observed outcome plus any signal it produced,
/// with a snapshot of the running score.
#[derive(Debug, Clone, Serialize)]
pub struct RoundEvent {
    pub timestamp: String,
    pub round: u64,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<Signal>,
    pub greens: u64,
    pub reds: u64,
}

/// Final session statistics, reported at shutdown.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub rounds_observed: u64,
    pub signals_opened: u64,
    pub greens: u64,
    pub greens_by_tie: u64,
    pub reds: u64,
    pub gales_fired: u64,
    /// Green count keyed by how many gales the signal needed (0 = straight hit).
    pub wins_by_stage: std::collections::BTreeMap<u8, u64>,
    pub hit_rate_percent: f64,
}
