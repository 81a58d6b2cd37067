//! Moderation state machine for professional registrations.
//!
//! ```text
//! pending --approve--> approved --reject(retain)--> rejected
//!    \------------------reject(retain)-----------------^
//! any status --reject(delete)--> removed
//! ```
//!
//! Nothing leads back to `pending`; re-review takes a fresh registration.

use serde::{Deserialize, Serialize};

use super::domain::{Professional, ProfessionalStatus};

/// What happens to a registration when an administrator rejects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectPolicy {
    /// Keep the record with status `rejected`, hidden from every listing.
    #[default]
    Retain,
    /// Delete the record outright.
    Delete,
}

impl RejectPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "retain" | "keep" | "status" => Some(Self::Retain),
            "delete" | "remove" => Some(Self::Delete),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            RejectPolicy::Retain => "retain",
            RejectPolicy::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationAction {
    Approve,
    Reject,
}

impl ModerationAction {
    pub const fn label(self) -> &'static str {
        match self {
            ModerationAction::Approve => "approve",
            ModerationAction::Reject => "reject",
        }
    }
}

/// Store mutation required to carry out an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transition {
    Move(ProfessionalStatus),
    /// The action was already applied; repeat administrator clicks land here.
    Skip,
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ModerationError {
    #[error("cannot {} a registration that is already {from}", .action.label())]
    InvalidTransition {
        action: ModerationAction,
        from: ProfessionalStatus,
    },
}

pub(crate) fn plan(
    current: ProfessionalStatus,
    action: ModerationAction,
    policy: RejectPolicy,
) -> Result<Transition, ModerationError> {
    use ProfessionalStatus::{Approved, Pending, Rejected};

    match (action, policy, current) {
        (ModerationAction::Approve, _, Pending) => Ok(Transition::Move(Approved)),
        (ModerationAction::Approve, _, Approved) => Ok(Transition::Skip),
        (ModerationAction::Approve, _, Rejected) => Err(ModerationError::InvalidTransition {
            action,
            from: Rejected,
        }),
        (ModerationAction::Reject, RejectPolicy::Delete, _) => Ok(Transition::Remove),
        (ModerationAction::Reject, RejectPolicy::Retain, Rejected) => Ok(Transition::Skip),
        (ModerationAction::Reject, RejectPolicy::Retain, Pending | Approved) => {
            Ok(Transition::Move(Rejected))
        }
    }
}

/// Result of a moderation action, carrying the affected record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "professional", rename_all = "snake_case")]
pub enum ModerationOutcome {
    Applied(Professional),
    Unchanged(Professional),
    Removed(Professional),
}

impl ModerationOutcome {
    pub fn professional(&self) -> &Professional {
        match self {
            ModerationOutcome::Applied(professional)
            | ModerationOutcome::Unchanged(professional)
            | ModerationOutcome::Removed(professional) => professional,
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            ModerationOutcome::Applied(_) => "applied",
            ModerationOutcome::Unchanged(_) => "unchanged",
            ModerationOutcome::Removed(_) => "removed",
        }
    }
}
