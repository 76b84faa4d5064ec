//! Approval state machine.
//!
//! ```text
//! PendingApproval ──approve────▶ ApprovedPendingIT
//!        └────────disapprove───▶ Disapproved
//! ```
//!
//! Both targets are terminal. This module is pure; persistence and the
//! compare-and-set that makes a transition stick live in the store.

use thiserror::Error;

use crate::models::RequestStatus;

/// A manager's decision, carried by the link they clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Disapprove,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Approve => "approve",
            Decision::Disapprove => "disapprove",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("request already {from}, cannot {decision}")]
pub struct TransitionError {
    pub from: RequestStatus,
    pub decision: Decision,
}

impl RequestStatus {
    /// Target state for `decision`, or an error when `self` is terminal.
    pub fn apply(self, decision: Decision) -> Result<RequestStatus, TransitionError> {
        match (self, decision) {
            (RequestStatus::PendingApproval, Decision::Approve) => {
                Ok(RequestStatus::ApprovedPendingIT)
            }
            (RequestStatus::PendingApproval, Decision::Disapprove) => {
                Ok(RequestStatus::Disapproved)
            }
            (from, decision) => Err(TransitionError { from, decision }),
        }
    }
}
