use serde::{Deserialize, Serialize};

use super::domain::{Application, EventId, EventListing, Session, UserRole};
use super::lifecycle::{session_state, LifecycleState};

/// Why a host may not apply to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefusalReason {
    #[error("sign in to apply for events")]
    NotAuthenticated,
    #[error("only host accounts can apply for events")]
    WrongRole,
    #[error("finish onboarding before applying: your account is not ready yet")]
    AccountNotReady,
    #[error("you have already applied for this event")]
    AlreadyApplied,
}

impl RefusalReason {
    pub const fn code(self) -> &'static str {
        match self {
            RefusalReason::NotAuthenticated => "NOT_AUTHENTICATED",
            RefusalReason::WrongRole => "WRONG_ROLE",
            RefusalReason::AccountNotReady => "ACCOUNT_NOT_READY",
            RefusalReason::AlreadyApplied => "ALREADY_APPLIED",
        }
    }

    pub fn message(self) -> String {
        self.to_string()
    }
}

/// Outcome of the eligibility gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EligibilityVerdict {
    pub event_id: EventId,
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RefusalReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifecycle: Option<LifecycleState>,
}

impl EligibilityVerdict {
    pub fn into_result(self) -> Result<(), RefusalReason> {
        match self.reason {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }
}

/// Decide whether the session may apply to `event`. Checks short-circuit in order:
/// authentication, role, onboarding state, duplicate application.
pub fn can_apply(
    session: Option<&Session>,
    event: &EventListing,
    already_applied: bool,
) -> EligibilityVerdict {
    let refuse = |reason, lifecycle| EligibilityVerdict {
        event_id: event.id.clone(),
        allowed: false,
        reason: Some(reason),
        lifecycle,
    };

    let Some(session) = session else {
        return refuse(RefusalReason::NotAuthenticated, None);
    };

    if session.role != UserRole::Host {
        return refuse(RefusalReason::WrongRole, None);
    }

    let lifecycle = session_state(session);
    if !lifecycle.is_ready() {
        return refuse(RefusalReason::AccountNotReady, Some(lifecycle));
    }

    if already_applied {
        return refuse(RefusalReason::AlreadyApplied, Some(lifecycle));
    }

    EligibilityVerdict {
        event_id: event.id.clone(),
        allowed: true,
        reason: None,
        lifecycle: Some(lifecycle),
    }
}

/// Whether any of the host's applications targets `event_id`.
pub fn has_applied<'a, I>(applications: I, event_id: &EventId) -> bool
where
    I: IntoIterator<Item = &'a Application>,
{
    applications
        .into_iter()
        .any(|application| &application.event_id == event_id)
}
