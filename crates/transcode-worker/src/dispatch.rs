//! Dispatch outcomes.

use std::time::Duration;

/// Terminal state of one message dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Handler succeeded and the delivery was deleted.
    Deleted,
    /// Handler succeeded but the delete call failed; the message will be
    /// redelivered after its visibility timeout.
    DeleteFailed,
    /// Handler failed; nothing was deleted.
    LeftForRedelivery,
}

impl DispatchOutcome {
    pub fn handler_succeeded(&self) -> bool {
        matches!(self, DispatchOutcome::Deleted | DispatchOutcome::DeleteFailed)
    }

    pub fn deleted(&self) -> bool {
        matches!(self, DispatchOutcome::Deleted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchOutcome::Deleted => "deleted",
            DispatchOutcome::DeleteFailed => "delete_failed",
            DispatchOutcome::LeftForRedelivery => "left_for_redelivery",
        }
    }
}

impl std::fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emitted once per finished dispatch to an observer, if one is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub receipt_token: String,
    pub message_id: Option<String>,
    pub body: String,
    pub outcome: DispatchOutcome,
    pub elapsed: Duration,
}
