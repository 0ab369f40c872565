use serde::Serialize;

/// Lifecycle of a multi-file resolution session.
///
/// `Active → Committing → Closed` on success, `Active → Aborted → Closed` on
/// cancel. A failed commit goes `Committing → Active`. File-level mutation is
/// only allowed while `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Active,
    Committing,
    Aborted,
    Closed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionState::Active => "active",
            SessionState::Committing => "committing",
            SessionState::Aborted => "aborted",
            SessionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// How a closed session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    Committed,
    Aborted,
}
