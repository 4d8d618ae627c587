use anyhow::{Result, bail};
use tracing::debug;

use crate::types::{Outcome, Rule, Signal, TRIGGER_LEN};

/// The one pending signal. Only a single signal may be live at a time;
/// new triggers are not evaluated until it resolves.
struct ActiveSignal {
    rule: Rule,
    gales_used: u8,
    /// History index of the round that opened the signal.
    opened_at: usize,
}

/// Pattern-matching signal engine over the observed outcome sequence.
///
/// Holds the rule table, the append-only outcome history, and at most one
/// pending signal. Performs no I/O: callers feed outcomes strictly in
/// observation order via [`StrategyEngine::on_new_outcome`] and deliver any
/// returned [`Signal`] themselves.
pub struct StrategyEngine {
    rules: Vec<Rule>,
    history: Vec<Outcome>,
    active: Option<ActiveSignal>,
}

impl StrategyEngine {
    /// Create an engine with the given rule table. Fails on any invalid rule;
    /// no partial table is ever installed.
    pub fn new(rules: Vec<Rule>) -> Result<Self> {
        let mut engine = Self {
            rules: Vec::new(),
            history: Vec::new(),
            active: None,
        };
        engine.configure(rules)?;
        Ok(engine)
    }

    /// Replace the rule table. Rules are evaluated in list order; the first
    /// matching trigger wins. Validation is atomic: on error the previous
    /// table stays in place.
    pub fn configure(&mut self, rules: Vec<Rule>) -> Result<()> {
        for (i, rule) in rules.iter().enumerate() {
            if rule.bet == Outcome::Tie {
                bail!(
                    "rule {} ({}): betting on Tie is not supported",
                    i + 1,
                    rule.trigger_str()
                );
            }
        }
        self.rules = rules;
        Ok(())
    }

    /// Append historical outcomes without evaluating triggers.
    ///
    /// Used at startup to load the rounds already on the board, so the bot
    /// does not fire signals for games that finished before it was watching.
    pub fn seed<I: IntoIterator<Item = Outcome>>(&mut self, outcomes: I) {
        self.history.extend(outcomes);
    }

    /// Process one genuinely new round outcome.
    ///
    /// Resolution of a pending signal always takes precedence: a win (the
    /// predicted outcome, or a tie while pending), a gale while budget
    /// remains, or a loss once gales are exhausted. The same outcome never
    /// both resolves a signal and opens a new one. With no pending signal,
    /// the last [`TRIGGER_LEN`] outcomes are compared against each rule's
    /// trigger in table order.
    pub fn on_new_outcome(&mut self, outcome: Outcome) -> Option<Signal> {
        self.history.push(outcome);

        if let Some(active) = self.active.as_mut() {
            if outcome == active.rule.bet || outcome == Outcome::Tie {
                let signal = Signal::Win {
                    bet: active.rule.bet,
                    gales_used: active.gales_used,
                    by_tie: outcome == Outcome::Tie,
                };
                debug!(
                    "Signal resolved green after {} round(s)",
                    self.history.len() - active.opened_at
                );
                self.active = None;
                return Some(signal);
            }
            if active.gales_used < active.rule.max_gales {
                active.gales_used += 1;
                return Some(Signal::Gale {
                    bet: active.rule.bet,
                    attempt: active.gales_used,
                    max_gales: active.rule.max_gales,
                });
            }
            let signal = Signal::Loss {
                bet: active.rule.bet,
                gales_used: active.gales_used,
            };
            debug!(
                "Signal resolved red after {} round(s)",
                self.history.len() - active.opened_at
            );
            self.active = None;
            return Some(signal);
        }

        if self.history.len() < TRIGGER_LEN {
            return None;
        }
        let window = &self.history[self.history.len() - TRIGGER_LEN..];
        for rule in &self.rules {
            if window == rule.trigger {
                self.active = Some(ActiveSignal {
                    rule: rule.clone(),
                    gales_used: 0,
                    opened_at: self.history.len() - 1,
                });
                return Some(Signal::Entry {
                    bet: rule.bet,
                    trigger: rule.trigger,
                    max_gales: rule.max_gales,
                });
            }
        }
        None
    }

    /// Whether a signal is currently pending resolution.
    pub fn has_active_signal(&self) -> bool {
        self.active.is_some()
    }

    /// Total rounds observed (seeded + live).
    pub fn rounds_seen(&self) -> usize {
        self.history.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::default_rules;
    use Outcome::{Banker as B, Player as P, Tie as T};

    fn rule(trigger: &str, bet: Outcome, max_gales: u8) -> Rule {
        Rule::from_spec(trigger, bet, max_gales).unwrap()
    }

    fn engine(rules: Vec<Rule>) -> StrategyEngine {
        StrategyEngine::new(rules).unwrap()
    }

    fn feed(engine: &mut StrategyEngine, outcomes: &[Outcome]) -> Vec<Option<Signal>> {
        outcomes.iter().map(|&o| engine.on_new_outcome(o)).collect()
    }

    // ── configure ──────────────────────────────────────────────────

    #[test]
    fn configure_rejects_tie_bet() {
        let result = StrategyEngine::new(vec![rule("PPP", T, 2)]);
        assert!(result.is_err());
    }

    #[test]
    fn configure_is_atomic() {
        let mut e = engine(vec![rule("PPP", B, 2)]);
        let bad = vec![rule("BBB", P, 2), rule("PPB", T, 2)];
        assert!(e.configure(bad).is_err());
        // Previous table still active
        feed(&mut e, &[P, P]);
        let s = e.on_new_outcome(P);
        assert!(matches!(s, Some(Signal::Entry { bet: B, .. })));
    }

    #[test]
    fn configure_accepts_empty_table() {
        let mut e = engine(Vec::new());
        assert_eq!(feed(&mut e, &[P, P, P, B, B, B]), vec![None; 6]);
    }

    // ── entry evaluation ───────────────────────────────────────────

    #[test]
    fn no_entry_before_three_rounds() {
        let mut e = engine(default_rules());
        assert_eq!(e.on_new_outcome(P), None);
        assert_eq!(e.on_new_outcome(P), None);
        assert!(!e.has_active_signal());
    }

    #[test]
    fn entry_on_exact_trigger() {
        let mut e = engine(vec![rule("PPP", B, 2)]);
        let signals = feed(&mut e, &[P, P, P]);
        assert_eq!(
            signals[2],
            Some(Signal::Entry {
                bet: B,
                trigger: [P, P, P],
                max_gales: 2
            })
        );
        assert!(e.has_active_signal());
    }

    #[test]
    fn entry_uses_sliding_window() {
        // Trigger sits at the tail of a longer history
        let mut e = engine(vec![rule("BBP", P, 2)]);
        let signals = feed(&mut e, &[P, T, B, B, P]);
        assert!(signals[..4].iter().all(Option::is_none));
        assert!(matches!(signals[4], Some(Signal::Entry { bet: P, .. })));
    }

    #[test]
    fn no_entry_on_non_matching_window() {
        let mut e = engine(vec![rule("PPP", B, 2)]);
        assert_eq!(feed(&mut e, &[P, B, P, B]), vec![None; 4]);
    }

    #[test]
    fn tie_in_window_blocks_default_triggers() {
        let mut e = engine(default_rules());
        let signals = feed(&mut e, &[P, P, T]);
        assert_eq!(signals, vec![None; 3]);
    }

    #[test]
    fn first_listed_rule_wins() {
        // Both rules trigger on PPP; table order decides
        let first = rule("PPP", B, 1);
        let second = rule("PPP", P, 2);
        let mut e = engine(vec![first, second]);
        let s = feed(&mut e, &[P, P, P]).pop().unwrap();
        assert!(matches!(s, Some(Signal::Entry { bet: B, max_gales: 1, .. })));
    }

    // ── single pending signal ──────────────────────────────────────

    #[test]
    fn no_second_signal_while_pending() {
        // BBB keeps matching while the first signal is pending
        let mut e = engine(vec![rule("BBB", P, 5)]);
        let signals = feed(&mut e, &[B, B, B, B, B, B]);
        assert!(matches!(signals[2], Some(Signal::Entry { .. })));
        assert!(matches!(signals[3], Some(Signal::Gale { attempt: 1, .. })));
        assert!(matches!(signals[4], Some(Signal::Gale { attempt: 2, .. })));
        assert!(matches!(signals[5], Some(Signal::Gale { attempt: 3, .. })));
    }

    #[test]
    fn resolution_round_never_opens_new_signal() {
        // The winning B also completes the PPB trigger; it must only resolve
        let mut e = engine(vec![rule("PPP", B, 2), rule("PPB", B, 2)]);
        let signals = feed(&mut e, &[P, P, P, B]);
        assert!(matches!(signals[2], Some(Signal::Entry { .. })));
        assert!(matches!(signals[3], Some(Signal::Win { .. })));
        assert!(!e.has_active_signal());
    }

    // ── gale progression ───────────────────────────────────────────

    #[test]
    fn straight_win_without_gale() {
        let mut e = engine(vec![rule("PPP", B, 2)]);
        feed(&mut e, &[P, P, P]);
        let s = e.on_new_outcome(B);
        assert_eq!(
            s,
            Some(Signal::Win {
                bet: B,
                gales_used: 0,
                by_tie: false
            })
        );
        assert!(!e.has_active_signal());
    }

    #[test]
    fn win_at_first_gale() {
        let mut e = engine(vec![rule("PPP", B, 2)]);
        feed(&mut e, &[P, P, P]);
        assert!(matches!(
            e.on_new_outcome(P),
            Some(Signal::Gale { attempt: 1, .. })
        ));
        assert_eq!(
            e.on_new_outcome(B),
            Some(Signal::Win {
                bet: B,
                gales_used: 1,
                by_tie: false
            })
        );
    }

    #[test]
    fn win_at_last_gale() {
        let mut e = engine(vec![rule("PPP", B, 2)]);
        feed(&mut e, &[P, P, P, P, P]);
        assert_eq!(
            e.on_new_outcome(B),
            Some(Signal::Win {
                bet: B,
                gales_used: 2,
                by_tie: false
            })
        );
    }

    #[test]
    fn loss_when_gales_exhausted() {
        let mut e = engine(vec![rule("PPP", B, 2)]);
        let signals = feed(&mut e, &[P, P, P, P, P, P]);
        assert!(matches!(
            signals[3],
            Some(Signal::Gale { attempt: 1, max_gales: 2, .. })
        ));
        assert!(matches!(signals[4], Some(Signal::Gale { attempt: 2, .. })));
        assert_eq!(signals[5], Some(Signal::Loss { bet: B, gales_used: 2 }));
        assert!(!e.has_active_signal());
    }

    #[test]
    fn zero_gales_loses_immediately() {
        let mut e = engine(vec![rule("PPP", B, 0)]);
        feed(&mut e, &[P, P, P]);
        assert_eq!(
            e.on_new_outcome(P),
            Some(Signal::Loss { bet: B, gales_used: 0 })
        );
    }

    #[test]
    fn tie_resolves_pending_signal_green() {
        let mut e = engine(vec![rule("PPP", B, 2)]);
        feed(&mut e, &[P, P, P]);
        assert_eq!(
            e.on_new_outcome(T),
            Some(Signal::Win {
                bet: B,
                gales_used: 0,
                by_tie: true
            })
        );
        assert!(!e.has_active_signal());
    }

    #[test]
    fn tie_green_at_gale_stage() {
        let mut e = engine(vec![rule("BBB", P, 2)]);
        feed(&mut e, &[B, B, B, B]);
        assert_eq!(
            e.on_new_outcome(T),
            Some(Signal::Win {
                bet: P,
                gales_used: 1,
                by_tie: true
            })
        );
    }

    // ── seeding ────────────────────────────────────────────────────

    #[test]
    fn seed_does_not_fire_signals() {
        let mut e = engine(default_rules());
        e.seed([P, P, P]);
        assert!(!e.has_active_signal());
        assert_eq!(e.rounds_seen(), 3);
    }

    #[test]
    fn seeded_history_feeds_trigger_window() {
        // Seeded B,P,P plus a live P completes the PPP trigger
        let mut e = engine(vec![rule("PPP", B, 2)]);
        e.seed([B, P, P]);
        assert!(matches!(
            e.on_new_outcome(P),
            Some(Signal::Entry { bet: B, .. })
        ));
    }

    // ── full sequences ─────────────────────────────────────────────

    #[test]
    fn walkthrough_entry_then_win() {
        let mut e = engine(vec![rule("PPP", B, 2), rule("BBB", P, 2)]);
        let signals = feed(&mut e, &[P, P, P, P]);
        assert!(matches!(signals[2], Some(Signal::Entry { bet: B, .. })));
        assert!(matches!(signals[3], Some(Signal::Gale { attempt: 1, .. })));
        assert_eq!(
            e.on_new_outcome(B),
            Some(Signal::Win {
                bet: B,
                gales_used: 1,
                by_tie: false
            })
        );
    }

    #[test]
    fn walkthrough_entry_then_exhaustion() {
        let mut e = engine(vec![rule("PPP", B, 2), rule("BBB", P, 2)]);
        let signals = feed(&mut e, &[P, P, P, P, P, P]);
        let kinds: Vec<_> = signals
            .iter()
            .map(|s| match s {
                Some(Signal::Entry { .. }) => "entry",
                Some(Signal::Gale { .. }) => "gale",
                Some(Signal::Win { .. }) => "win",
                Some(Signal::Loss { .. }) => "loss",
                None => "none",
            })
            .collect();
        assert_eq!(kinds, vec!["none", "none", "entry", "gale", "gale", "loss"]);
        // Engine is free for new entries again
        assert!(!e.has_active_signal());
    }

    #[test]
    fn new_signal_can_open_after_resolution() {
        let mut e = engine(vec![rule("PPP", B, 0)]);
        feed(&mut e, &[P, P, P]); // entry
        e.on_new_outcome(P); // loss, window is now ...P,P,P
        // Next P completes a fresh PPP window
        assert!(matches!(
            e.on_new_outcome(P),
            Some(Signal::Entry { bet: B, .. })
        ));
    }
}
