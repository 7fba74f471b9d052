use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::adjudication::{
    self, AdjudicationError, AdminDecision, AppliedApplication, Assignment, ConflictError,
    Transition,
};
use super::domain::{
    Application, ApplicationDraft, ApplicationId, ApplicationStatus, Eligibility, EventId,
    EventListing, EventWindow, HostAccount, HostId, Review, ReviewVisibility, Session, Trip,
    UserRole, ValidationError,
};
use super::eligibility::{can_apply, has_applied, EligibilityVerdict, RefusalReason};
use super::lifecycle::{evaluate, LifecycleState};
use super::repository::{
    DecisionNotice, NotificationError, NotificationPublisher, RepositoryError, StaffingRepository,
};
use super::reviews::{self, ReviewDraft, ReviewError};
use super::roster::{self, RosterView};
use super::transportation::{TransportationPlan, TransportationPlanner, TransportationPolicy};

/// Service composing the rule engine with the external stores.
pub struct StaffingService<R, N> {
    repository: Arc<R>,
    notifications: Arc<N>,
    planner: Arc<TransportationPlanner>,
}

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static EVENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("app-{id:06}"))
}

fn next_event_id() -> EventId {
    let id = EVENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    EventId(format!("evt-{id:06}"))
}

/// Client request for a new staffed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRequest {
    pub title: String,
    pub event_type: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub nb_of_hosts: u32,
    #[serde(default)]
    pub outfit: Option<String>,
}

impl<R, N> StaffingService<R, N>
where
    R: StaffingRepository + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(repository: Arc<R>, notifications: Arc<N>, policy: TransportationPolicy) -> Self {
        Self {
            repository,
            notifications,
            planner: Arc::new(TransportationPlanner::new(policy)),
        }
    }

    /// Build a session from caller claims, attaching a fresh account snapshot for hosts.
    pub fn resolve_session(
        &self,
        user_id: &str,
        role: UserRole,
    ) -> Result<Session, ServiceError> {
        let host = match role {
            UserRole::Host => self
                .repository
                .fetch_account(&HostId(user_id.to_string()))?,
            UserRole::Client | UserRole::Admin => None,
        };

        Ok(Session {
            user_id: user_id.to_string(),
            role,
            host,
        })
    }

    /// Register a new host account in its initial onboarding state.
    pub fn sign_up(
        &self,
        host_id: HostId,
        clothing_size: Option<String>,
        spoken_languages: Vec<String>,
    ) -> Result<HostAccount, ServiceError> {
        if host_id.0.trim().is_empty() {
            return Err(ValidationError::Blank("host id").into());
        }
        if self.repository.fetch_account(&host_id)?.is_some() {
            return Err(RepositoryError::Conflict.into());
        }

        let account = HostAccount::sign_up(host_id, clothing_size, spoken_languages);
        self.repository.save_account(account.clone())?;
        info!(host_id = %account.id, "host signed up");
        Ok(account)
    }

    /// Hosts accept the code of conduct for their own account only.
    pub fn accept_code_of_conduct(
        &self,
        session: &Session,
        host_id: &HostId,
    ) -> Result<HostAccount, ServiceError> {
        if session.role != UserRole::Host || session.user_id != host_id.0 {
            return Err(ServiceError::Forbidden {
                action: "accept the code of conduct for another account",
            });
        }
        self.update_account(host_id, |account| account.code_of_conduct_accepted = true)
    }

    pub fn set_eligibility(
        &self,
        session: &Session,
        host_id: &HostId,
        eligibility: Eligibility,
    ) -> Result<HostAccount, ServiceError> {
        require_admin(session, "change host eligibility")?;
        self.update_account(host_id, |account| account.eligibility = eligibility)
    }

    pub fn set_active(
        &self,
        session: &Session,
        host_id: &HostId,
        is_active: bool,
    ) -> Result<HostAccount, ServiceError> {
        require_admin(session, "toggle host activity")?;
        self.update_account(host_id, |account| account.is_active = is_active)
    }

    /// Apply an eligibility and/or activity change as a single write.
    pub fn set_standing(
        &self,
        session: &Session,
        host_id: &HostId,
        eligibility: Option<Eligibility>,
        is_active: Option<bool>,
    ) -> Result<HostAccount, ServiceError> {
        require_admin(session, "change host standing")?;
        if eligibility.is_none() && is_active.is_none() {
            return Err(ValidationError::EmptyChange.into());
        }
        self.update_account(host_id, |account| {
            if let Some(eligibility) = eligibility {
                account.eligibility = eligibility;
            }
            if let Some(is_active) = is_active {
                account.is_active = is_active;
            }
        })
    }

    pub fn lifecycle(&self, host_id: &HostId) -> Result<LifecycleState, ServiceError> {
        let account = self
            .repository
            .fetch_account(host_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(evaluate(&account))
    }

    /// Gate used to render the "Apply" affordance.
    pub fn eligibility(
        &self,
        session: Option<&Session>,
        event_id: &EventId,
    ) -> Result<EligibilityVerdict, ServiceError> {
        let event = self.fetch_event(event_id)?;
        let already_applied = match session {
            Some(session) if session.role == UserRole::Host => {
                let applications = self
                    .repository
                    .applications_for_host(&HostId(session.user_id.clone()))?;
                has_applied(&applications, event_id)
            }
            _ => false,
        };
        Ok(can_apply(session, &event, already_applied))
    }

    /// Submit an application. The gate is evaluated again against a snapshot fetched
    /// now, so a stale session cannot slip past a change made since the page rendered.
    pub fn submit_application(
        &self,
        session: Option<&Session>,
        event_id: &EventId,
        draft: ApplicationDraft,
    ) -> Result<Application, ServiceError> {
        let fresh = match session {
            Some(session) => Some(self.resolve_session(&session.user_id, session.role)?),
            None => None,
        };

        let verdict = self.eligibility(fresh.as_ref(), event_id)?;
        if let Some(reason) = verdict.reason {
            warn!(%event_id, code = reason.code(), "application refused");
            return Err(ServiceError::Refused(reason));
        }

        let Some(session) = fresh else {
            return Err(ServiceError::Refused(RefusalReason::NotAuthenticated));
        };

        let application = Application {
            id: next_application_id(),
            host_id: HostId(session.user_id),
            event_id: event_id.clone(),
            requested_role: draft.requested_role,
            status: ApplicationStatus::Pending,
            assigned_role: None,
            request_dress: draft.request_dress,
            needs_ride: draft.needs_ride,
        };

        let stored = match self.repository.insert_application(application) {
            Ok(stored) => stored,
            Err(RepositoryError::DuplicateApplication) => {
                warn!(%event_id, "store refused duplicate application");
                return Err(ServiceError::Refused(RefusalReason::AlreadyApplied));
            }
            Err(err) => return Err(err.into()),
        };
        info!(application_id = %stored.id, %event_id, "application submitted");
        Ok(stored)
    }

    /// Apply an admin decision and persist it.
    pub fn decide_application(
        &self,
        session: &Session,
        application_id: &ApplicationId,
        decision: AdminDecision,
    ) -> Result<AppliedApplication, ServiceError> {
        require_admin(session, "decide applications")?;

        let application = self
            .repository
            .fetch_application(application_id)?
            .ok_or(RepositoryError::NotFound)?;
        let event = self.fetch_event(&application.event_id)?;

        let mut bookings = Vec::new();
        for other in self.repository.applications_for_host(&application.host_id)? {
            if let Some(other_event) = self.repository.fetch_event(&other.event_id)? {
                bookings.push((other, other_event));
            }
        }
        let assignments = bookings
            .iter()
            .map(|(other, other_event)| Assignment::new(other, other_event));

        let applied = adjudication::decide(&application, &event, decision, assignments)?;
        if applied.transition == Transition::Unchanged {
            return Ok(applied);
        }

        match self.repository.update_application(applied.application.clone()) {
            Ok(()) => {}
            Err(RepositoryError::ScheduleConflict(conflicts)) => {
                warn!(%application_id, "store refused acceptance with scheduling conflict");
                return Err(AdjudicationError::from(ConflictError {
                    application_id: application_id.clone(),
                    conflicts,
                })
                .into());
            }
            Err(err) => return Err(err.into()),
        }

        let accepted = self.repository.refresh_accepted_count(&event.id)?;

        info!(
            %application_id,
            host_id = %applied.application.host_id,
            transition = ?applied.transition,
            accepted_hosts = accepted,
            "application decided"
        );
        self.notify(&applied)?;

        Ok(applied)
    }

    /// Transportation summary, recomputed from the current accepted applications.
    pub fn transportation(&self, event_id: &EventId) -> Result<TransportationPlan, ServiceError> {
        let event = self.fetch_event(event_id)?;
        let applications = self.repository.applications_for_event(event_id)?;
        let trips = self.repository.trips_for_event(event_id)?;
        Ok(self.planner.plan(&event, &applications, &trips))
    }

    pub fn add_trip(
        &self,
        session: &Session,
        event_id: &EventId,
        trip: Trip,
    ) -> Result<TransportationPlan, ServiceError> {
        require_admin(session, "record trips")?;
        self.fetch_event(event_id)?;
        if trip.pickup_location.trim().is_empty() {
            return Err(ValidationError::Blank("pickup location").into());
        }
        if trip.return_time <= trip.departure_time {
            return Err(ValidationError::InvalidSchedule {
                starts_at: trip.departure_time,
                ends_at: trip.return_time,
            }
            .into());
        }
        self.repository.add_trip(event_id, trip)?;
        self.transportation(event_id)
    }

    pub fn roster(&self, category: &str) -> Result<RosterView, ServiceError> {
        let events = self.repository.list_events()?;
        Ok(roster::aggregate(&events, category))
    }

    /// File a new event request on behalf of a client (or an admin).
    pub fn request_event(
        &self,
        session: &Session,
        request: EventRequest,
    ) -> Result<EventListing, ServiceError> {
        if session.role == UserRole::Host {
            return Err(ServiceError::Forbidden {
                action: "request events",
            });
        }
        if request.title.trim().is_empty() {
            return Err(ValidationError::Blank("event title").into());
        }

        let window = EventWindow::new(request.starts_at, request.ends_at)?;
        let mut event = EventListing::request(
            next_event_id(),
            request.title.trim(),
            request.event_type,
            window,
            request.nb_of_hosts,
        );
        event.outfit = request.outfit;
        if session.role == UserRole::Client {
            event.client_id = Some(session.user_id.clone());
        }

        self.repository.save_event(event.clone())?;
        info!(event_id = %event.id, "event requested");
        Ok(event)
    }

    pub fn decide_event(
        &self,
        session: &Session,
        event_id: &EventId,
        accept: bool,
    ) -> Result<EventListing, ServiceError> {
        require_admin(session, "decide event requests")?;
        let mut event = self.fetch_event(event_id)?;
        event.decide(accept)?;
        self.repository.save_event(event.clone())?;
        info!(%event_id, status = event.status.label(), "event request decided");
        Ok(event)
    }

    pub fn submit_review(
        &self,
        session: &Session,
        event_id: &EventId,
        draft: ReviewDraft,
        now: DateTime<Utc>,
    ) -> Result<Review, ServiceError> {
        if session.role != UserRole::Host {
            return Err(ReviewError::NotTeamLeader.into());
        }
        let author = HostId(session.user_id.clone());
        let event = self.fetch_event(event_id)?;
        let assignment = self
            .repository
            .applications_for_event(event_id)?
            .into_iter()
            .find(|application| application.host_id == author && application.is_accepted());
        let existing = self.repository.fetch_review(event_id)?;

        let review = reviews::submit_review(
            &event,
            &author,
            assignment.as_ref(),
            draft,
            now,
            existing.as_ref(),
        )?;
        self.repository.save_review(review.clone())?;
        info!(%event_id, rating = review.star_rating.value(), "review submitted");
        Ok(review)
    }

    pub fn set_review_visibility(
        &self,
        session: &Session,
        event_id: &EventId,
        visibility: ReviewVisibility,
    ) -> Result<Review, ServiceError> {
        let review = self
            .repository
            .fetch_review(event_id)?
            .ok_or(RepositoryError::NotFound)?;
        let updated = reviews::set_visibility(session, &review, visibility)?;
        self.repository.save_review(updated.clone())?;
        Ok(updated)
    }

    fn fetch_event(&self, event_id: &EventId) -> Result<EventListing, ServiceError> {
        let event = self
            .repository
            .fetch_event(event_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(event)
    }

    fn update_account<F>(&self, host_id: &HostId, change: F) -> Result<HostAccount, ServiceError>
    where
        F: FnOnce(&mut HostAccount),
    {
        let mut account = self
            .repository
            .fetch_account(host_id)?
            .ok_or(RepositoryError::NotFound)?;
        change(&mut account);
        self.repository.save_account(account.clone())?;
        info!(%host_id, lifecycle = evaluate(&account).label(), "host account updated");
        Ok(account)
    }

    fn notify(&self, applied: &AppliedApplication) -> Result<(), ServiceError> {
        let application = &applied.application;
        let template = match applied.transition {
            Transition::Accepted => "application_accepted",
            Transition::RoleChanged { .. } => "application_role_changed",
            Transition::Rejected => "application_rejected",
            Transition::Unchanged => return Ok(()),
        };

        let mut details = BTreeMap::new();
        details.insert("event_id".to_string(), application.event_id.0.clone());
        details.insert("status".to_string(), application.status.label().to_string());
        if let Some(role) = application.assigned_role {
            details.insert("assigned_role".to_string(), role.label().to_string());
        }

        self.notifications.publish(DecisionNotice {
            template: template.to_string(),
            application_id: application.id.clone(),
            host_id: application.host_id.clone(),
            details,
        })?;
        Ok(())
    }
}

fn require_admin(session: &Session, action: &'static str) -> Result<(), ServiceError> {
    if session.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::Forbidden { action })
    }
}

/// Error raised by the staffing service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    Refused(RefusalReason),
    #[error("not permitted to {action}")]
    Forbidden { action: &'static str },
    #[error(transparent)]
    Adjudication(#[from] AdjudicationError),
    #[error(transparent)]
    Review(#[from] ReviewError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
}

impl ServiceError {
    /// Stable code surfaced to clients alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Refused(reason) => reason.code(),
            ServiceError::Forbidden { .. } => "FORBIDDEN",
            ServiceError::Adjudication(err) => err.code(),
            ServiceError::Review(ReviewError::Validation(_)) | ServiceError::Validation(_) => {
                "VALIDATION_ERROR"
            }
            ServiceError::Review(_) => "REVIEW_REFUSED",
            ServiceError::Repository(RepositoryError::NotFound) => "NOT_FOUND",
            ServiceError::Repository(RepositoryError::Conflict) => "ALREADY_EXISTS",
            ServiceError::Repository(RepositoryError::DuplicateApplication) => "ALREADY_APPLIED",
            ServiceError::Repository(RepositoryError::ScheduleConflict(_)) => {
                "SCHEDULING_CONFLICT"
            }
            ServiceError::Repository(RepositoryError::Unavailable(_))
            | ServiceError::Notification(_) => "UNAVAILABLE",
        }
    }
}

impl From<RefusalReason> for ServiceError {
    fn from(reason: RefusalReason) -> Self {
        Self::Refused(reason)
    }
}
