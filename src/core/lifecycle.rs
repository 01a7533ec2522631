//! Joint request/match status lifecycle.
//!
//! A parent request moves `pending -> matched` or `pending -> rejected`; a match
//! moves `pending -> accepted` or `pending -> rejected`. One tutor decision
//! moves both together, so the two machines are planned as one transition and
//! every store applies the plan as a single write.

use crate::models::{Decision, MatchStatus, RequestStatus};
use thiserror::Error;

/// A decision arrived for something no longer pending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("request already {0}")]
    RequestClosed(RequestStatus),

    #[error("match already {0}")]
    MatchClosed(MatchStatus),
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }

    /// Status after `decision`, if this request can still take one
    pub fn after(self, decision: Decision) -> Result<RequestStatus, LifecycleError> {
        match self {
            RequestStatus::Pending => Ok(decision.request_status()),
            closed => Err(LifecycleError::RequestClosed(closed)),
        }
    }
}

impl MatchStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, MatchStatus::Pending)
    }

    /// Status after `decision`, if this match can still take one
    pub fn after(self, decision: Decision) -> Result<MatchStatus, LifecycleError> {
        match self {
            MatchStatus::Pending => Ok(decision.match_status()),
            closed => Err(LifecycleError::MatchClosed(closed)),
        }
    }
}

impl Decision {
    pub fn request_status(&self) -> RequestStatus {
        match self {
            Decision::Accept => RequestStatus::Matched,
            Decision::Reject => RequestStatus::Rejected,
        }
    }

    pub fn match_status(&self) -> MatchStatus {
        match self {
            Decision::Accept => MatchStatus::Accepted,
            Decision::Reject => MatchStatus::Rejected,
        }
    }
}

/// Target statuses of one joint write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JointTransition {
    pub request: RequestStatus,
    pub matched: MatchStatus,
}

/// Plan the joint transition for `decision`.
///
/// `existing_match` is `None` when the match will be created by the write.
/// The request is checked first so a lost race reports the request state.
pub fn plan(
    request: RequestStatus,
    existing_match: Option<MatchStatus>,
    decision: Decision,
) -> Result<JointTransition, LifecycleError> {
    let request = request.after(decision)?;
    let matched = match existing_match {
        Some(status) => status.after(decision)?,
        None => decision.match_status(),
    };

    Ok(JointTransition { request, matched })
}
