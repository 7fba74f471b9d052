//! Host onboarding state, derived on every read from the account flags.

use serde::{Deserialize, Serialize};

use super::domain::{Eligibility, HostAccount, Session, UserRole};

/// Onboarding state of a host account. Never stored; always recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Blocked,
    NeedsCoc,
    Pending,
    Inactive,
    Ready,
}

impl LifecycleState {
    pub const fn label(self) -> &'static str {
        match self {
            LifecycleState::Blocked => "blocked",
            LifecycleState::NeedsCoc => "needs_coc",
            LifecycleState::Pending => "pending",
            LifecycleState::Inactive => "inactive",
            LifecycleState::Ready => "ready",
        }
    }

    pub fn is_ready(self) -> bool {
        self == LifecycleState::Ready
    }
}

/// Evaluate a host account. Rules are checked in order and the first match wins.
pub fn evaluate(account: &HostAccount) -> LifecycleState {
    let coc = account.code_of_conduct_accepted;
    match account.eligibility {
        Eligibility::Blocked => LifecycleState::Blocked,
        Eligibility::Pending if !coc => LifecycleState::NeedsCoc,
        Eligibility::Pending => LifecycleState::Pending,
        Eligibility::Approved if !coc => LifecycleState::NeedsCoc,
        Eligibility::Approved if account.is_active => LifecycleState::Ready,
        Eligibility::Approved => LifecycleState::Inactive,
        Eligibility::Unknown if coc && account.is_active => LifecycleState::Ready,
        Eligibility::Unknown => LifecycleState::Pending,
    }
}

/// Lifecycle for an arbitrary session. Only hosts go through onboarding; a host
/// session without an account snapshot is not ready.
pub fn session_state(session: &Session) -> LifecycleState {
    match session.role {
        UserRole::Host => session
            .host
            .as_ref()
            .map(evaluate)
            .unwrap_or(LifecycleState::Pending),
        UserRole::Client | UserRole::Admin => LifecycleState::Ready,
    }
}
