use std::fmt;

use serde::Serialize;

/// What is known about one candidate after it has been handed to the network.
///
/// Outcomes only move forward: `NotSent < Sent < ObservedInMempool <
/// ObservedConfirmed`. `Rejected` can only follow `Sent`, and nothing follows it.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum BroadcastOutcome {
    #[default]
    NotSent,
    Sent,
    Rejected {
        reason: String,
    },
    ObservedInMempool,
    ObservedConfirmed {
        block: u32,
    },
}

impl BroadcastOutcome {
    fn rank(&self) -> Option<u8> {
        match self {
            Self::NotSent => Some(0),
            Self::Sent => Some(1),
            Self::ObservedInMempool => Some(2),
            Self::ObservedConfirmed { .. } => Some(3),
            Self::Rejected { .. } => None,
        }
    }

    /// Confirmed and rejected outcomes will not change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ObservedConfirmed { .. } | Self::Rejected { .. })
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::ObservedConfirmed { .. })
    }

    pub fn can_advance_to(&self, next: &Self) -> bool {
        match (self, next) {
            (Self::Rejected { .. }, _) => false,
            (Self::Sent, Self::Rejected { .. }) => true,
            (_, Self::Rejected { .. }) => false,
            _ => next.rank() > self.rank(),
        }
    }

    /// Applies `next` if it moves the outcome forward. Returns whether anything changed.
    pub fn advance(&mut self, next: Self) -> bool {
        if self.can_advance_to(&next) {
            *self = next;
            true
        } else {
            false
        }
    }
}

impl fmt::Display for BroadcastOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSent => f.write_str("not sent"),
            Self::Sent => f.write_str("sent"),
            Self::Rejected { reason } => write!(f, "rejected: {reason}"),
            Self::ObservedInMempool => f.write_str("in mempool"),
            Self::ObservedConfirmed { block } => write!(f, "confirmed in block {block}"),
        }
    }
}
