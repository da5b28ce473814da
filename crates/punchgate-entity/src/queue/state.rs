//! Queue entry state enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a queued attendance record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "queue_state", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QueueState {
    /// Waiting for delivery to the upstream ERP.
    Pending,
    /// Accepted by the upstream; never mutated again, only pruned.
    Synced,
    /// Retry budget exhausted; requires an operator reset to re-enter
    /// the pipeline.
    FailedTerminal,
}

impl QueueState {
    /// Whether the entry has left the delivery pipeline.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Synced | Self::FailedTerminal)
    }

    /// Return the state as its wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Synced => "synced",
            Self::FailedTerminal => "failed_terminal",
        }
    }
}

impl fmt::Display for QueueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_classification() {
        assert!(!QueueState::Pending.is_terminal());
        assert!(QueueState::Synced.is_terminal());
        assert!(QueueState::FailedTerminal.is_terminal());
    }

    #[test]
    fn wire_strings() {
        assert_eq!(
            serde_json::to_string(&QueueState::FailedTerminal).unwrap(),
            "\"failed_terminal\""
        );
        assert_eq!(QueueState::Pending.to_string(), "pending");
    }
}
