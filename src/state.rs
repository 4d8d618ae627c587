use std::collections::BTreeMap;

use crate::types::{SessionSummary, Signal};

/// Tracks the running session score: rounds, signals, greens, reds, gales.
#[derive(Debug, Default)]
pub struct SessionState {
    pub rounds_observed: u64,
    pub signals_opened: u64,
    pub greens: u64,
    pub greens_by_tie: u64,
    pub reds: u64,
    pub gales_fired: u64,
    /// Greens keyed by how many gales the signal needed.
    pub wins_by_stage: BTreeMap<u8, u64>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observed round and whatever signal (if any) it produced.
    pub fn record_round(&mut self, signal: Option<&Signal>) {
        self.rounds_observed += 1;
        match signal {
            Some(Signal::Entry { .. }) => self.signals_opened += 1,
            Some(Signal::Gale { .. }) => self.gales_fired += 1,
            Some(Signal::Win {
                gales_used, by_tie, ..
            }) => {
                self.greens += 1;
                if *by_tie {
                    self.greens_by_tie += 1;
                }
                *self.wins_by_stage.entry(*gales_used).or_insert(0) += 1;
            }
            Some(Signal::Loss { .. }) => self.reds += 1,
            None => {}
        }
    }

    /// Final session statistics. Hit rate is greens over resolved signals.
    pub fn summary(&self) -> SessionSummary {
        let resolved = self.greens + self.reds;
        let hit_rate_percent = if resolved > 0 {
            (self.greens as f64 / resolved as f64) * 100.0
        } else {
            0.0
        };
        SessionSummary {
            rounds_observed: self.rounds_observed,
            signals_opened: self.signals_opened,
            greens: self.greens,
            greens_by_tie: self.greens_by_tie,
            reds: self.reds,
            gales_fired: self.gales_fired,
            wins_by_stage: self.wins_by_stage.clone(),
            hit_rate_percent,
        }
    }
}
