use crate::state::WorkflowState;
use chrono::{DateTime, Duration, Utc};

/// Session ids that carry no identity. Two of these never match each other.
const UNKNOWN_SESSION: &str = "unknown";

fn is_known(session_id: &str) -> bool {
    let id = session_id.trim();
    !id.is_empty() && id != UNKNOWN_SESSION
}

/// True only when both sides carry a real session id and they are equal.
pub fn is_same_session(state: &WorkflowState, caller_session_id: &str) -> bool {
    if !is_known(&state.session_id) || !is_known(caller_session_id) {
        return false;
    }
    state.session_id.trim() == caller_session_id.trim()
}

/// A workflow with no usable timestamp, or whose last activity is older than
/// `threshold`, is stale. A threshold reaching past the representable range
/// never expires.
pub fn is_stale(state: &WorkflowState, now: DateTime<Utc>, threshold: Duration) -> bool {
    let Some(seen) = state.last_seen() else {
        return true;
    };
    match now.checked_sub_signed(threshold) {
        Some(cutoff) => seen < cutoff,
        None => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Owned,
    ForeignSession,
    Stale,
}

/// Decide whether the caller may act on `state`. Ownership is checked first.
pub fn check(
    state: &WorkflowState,
    caller_session_id: &str,
    now: DateTime<Utc>,
    threshold: Duration,
) -> Verdict {
    if !is_same_session(state, caller_session_id) {
        return Verdict::ForeignSession;
    }
    if is_stale(state, now, threshold) {
        return Verdict::Stale;
    }
    Verdict::Owned
}
