mod conflicts;

pub use conflicts::{find_conflicts, Assignment, ScheduleConflict};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::domain::{
    Application, ApplicationId, ApplicationStatus, EventListing, StaffRole, ValidationError,
};

/// Admin decision on a submitted application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AdminDecision {
    /// Accept into `role`, or into the requested role when omitted.
    Accept {
        #[serde(default)]
        role: Option<StaffRole>,
    },
    Reject,
}

/// What a decision did to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Accepted,
    RoleChanged { from: StaffRole, to: StaffRole },
    Rejected,
    Unchanged,
}

/// Application after a decision, plus the follow-up work it implies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedApplication {
    pub application: Application,
    pub transition: Transition,
    /// The event's ride demand changed and its transportation summary must be recomputed.
    pub transportation_stale: bool,
}

/// Conflicting bookings that prevented an acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("host is already booked for {}", describe(.conflicts))]
pub struct ConflictError {
    pub application_id: ApplicationId,
    pub conflicts: Vec<ScheduleConflict>,
}

fn describe(conflicts: &[ScheduleConflict]) -> String {
    conflicts
        .iter()
        .map(ScheduleConflict::describe)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdjudicationError {
    #[error(transparent)]
    Conflict(#[from] ConflictError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl AdjudicationError {
    pub const fn code(&self) -> &'static str {
        match self {
            AdjudicationError::Conflict(_) => "SCHEDULING_CONFLICT",
            AdjudicationError::Validation(_) => "VALIDATION_ERROR",
        }
    }
}

/// Apply an admin decision to `application` for `event`.
///
/// `host_assignments` holds the host's other applications with their events; the
/// input application is never mutated, so a refused acceptance leaves state as it was.
pub fn decide<'a, I>(
    application: &Application,
    event: &EventListing,
    decision: AdminDecision,
    host_assignments: I,
) -> Result<AppliedApplication, AdjudicationError>
where
    I: IntoIterator<Item = Assignment<'a>>,
{
    if application.event_id != event.id {
        return Err(ValidationError::EventMismatch {
            application_id: application.id.clone(),
            expected: application.event_id.clone(),
            found: event.id.clone(),
        }
        .into());
    }

    match decision {
        AdminDecision::Reject => Ok(reject(application)),
        AdminDecision::Accept { role } => {
            let role = role.unwrap_or(application.requested_role);
            accept(application, event, role, host_assignments)
        }
    }
}

fn reject(application: &Application) -> AppliedApplication {
    let mut updated = application.clone();
    let changed = application.status != ApplicationStatus::Rejected;
    updated.status = ApplicationStatus::Rejected;
    updated.assigned_role = None;

    AppliedApplication {
        transportation_stale: changed && application.needs_ride,
        application: updated,
        transition: if changed {
            Transition::Rejected
        } else {
            Transition::Unchanged
        },
    }
}

fn accept<'a, I>(
    application: &Application,
    event: &EventListing,
    role: StaffRole,
    host_assignments: I,
) -> Result<AppliedApplication, AdjudicationError>
where
    I: IntoIterator<Item = Assignment<'a>>,
{
    let transition = match (application.status, application.assigned_role) {
        (ApplicationStatus::Rejected, _) => {
            return Err(ValidationError::ApplicationClosed {
                application_id: application.id.clone(),
            }
            .into())
        }
        (ApplicationStatus::Accepted, Some(current)) if current == role => {
            debug!(application_id = %application.id, "acceptance unchanged");
            return Ok(AppliedApplication {
                application: application.clone(),
                transition: Transition::Unchanged,
                transportation_stale: false,
            });
        }
        (ApplicationStatus::Accepted, Some(current)) => Transition::RoleChanged {
            from: current,
            to: role,
        },
        (ApplicationStatus::Accepted, None) | (ApplicationStatus::Pending, _) => {
            Transition::Accepted
        }
    };

    let window = event
        .schedule
        .ok_or_else(|| ValidationError::MissingSchedule {
            event_id: event.id.clone(),
        })?;

    let conflicts = find_conflicts(application, &window, host_assignments);
    if !conflicts.is_empty() {
        warn!(
            application_id = %application.id,
            host_id = %application.host_id,
            conflicts = conflicts.len(),
            "acceptance blocked by scheduling conflict"
        );
        return Err(ConflictError {
            application_id: application.id.clone(),
            conflicts,
        }
        .into());
    }

    let mut updated = application.clone();
    let status_changed = updated.status != ApplicationStatus::Accepted;
    updated.status = ApplicationStatus::Accepted;
    updated.assigned_role = Some(role);

    Ok(AppliedApplication {
        application: updated,
        transition,
        transportation_stale: status_changed && application.needs_ride,
    })
}
