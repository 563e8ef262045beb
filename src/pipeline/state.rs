//! Run state for the estimation pipeline

use serde::{Deserialize, Serialize};

/// Stage reached by a run. Strictly linear; there is no way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RunState {
    /// Settings accepted, nothing resolved yet
    Configured,
    /// Factor sets built
    Resolved,
    /// Per-structure and vehicle rows computed
    Computed,
    /// Summary tables built
    Aggregated,
    /// Outputs handed back to the caller
    Done,
}

impl RunState {
    /// The state that follows this one. `Done` is terminal.
    pub fn next(self) -> Self {
        match self {
            RunState::Configured => RunState::Resolved,
            RunState::Resolved => RunState::Computed,
            RunState::Computed => RunState::Aggregated,
            RunState::Aggregated | RunState::Done => RunState::Done,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == RunState::Done
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Configured => write!(f, "Configured"),
            RunState::Resolved => write!(f, "Resolved"),
            RunState::Computed => write!(f, "Computed"),
            RunState::Aggregated => write!(f, "Aggregated"),
            RunState::Done => write!(f, "Done"),
        }
    }
}
