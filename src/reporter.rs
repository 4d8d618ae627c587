use crate::types::{RoundEvent, SessionSummary};

/// Emit a round event as a single JSON line to stdout.
pub fn report_event(event: &RoundEvent) {
    if let Ok(json) = serde_json::to_string(event) {
        println!("{json}");
    }
}

/// Emit the session summary as pretty-printed JSON to stdout.
pub fn report_session_summary(summary: &SessionSummary) {
    if let Ok(json) = serde_json::to_string_pretty(summary) {
        println!("{json}");
    }
}
