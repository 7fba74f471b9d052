use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::adjudication::ScheduleConflict;
use super::domain::{
    Application, ApplicationId, EventId, EventListing, HostAccount, HostId, Review, Trip,
};

/// Account store supplying host snapshots.
pub trait AccountRepository: Send + Sync {
    fn fetch_account(&self, id: &HostId) -> Result<Option<HostAccount>, RepositoryError>;
    fn save_account(&self, account: HostAccount) -> Result<(), RepositoryError>;
}

/// Event, application and review store.
///
/// `insert_application` must refuse a second application by the same host for the
/// same event, answering `DuplicateApplication`. `update_application` must refuse to
/// persist an acceptance that collides with another accepted booking of the same
/// host, answering `ScheduleConflict`. Both checks run under the lock that persists
/// the write.
pub trait EventRepository: Send + Sync {
    fn fetch_event(&self, id: &EventId) -> Result<Option<EventListing>, RepositoryError>;
    fn save_event(&self, event: EventListing) -> Result<(), RepositoryError>;
    fn list_events(&self) -> Result<Vec<EventListing>, RepositoryError>;

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError>;
    fn insert_application(&self, application: Application)
        -> Result<Application, RepositoryError>;
    fn update_application(&self, application: Application) -> Result<(), RepositoryError>;
    /// Recount the accepted applications of `event_id` and store the count on the
    /// event, leaving every other event field as currently stored.
    fn refresh_accepted_count(&self, event_id: &EventId) -> Result<u32, RepositoryError>;
    fn applications_for_host(&self, host_id: &HostId)
        -> Result<Vec<Application>, RepositoryError>;
    fn applications_for_event(
        &self,
        event_id: &EventId,
    ) -> Result<Vec<Application>, RepositoryError>;

    fn fetch_review(&self, event_id: &EventId) -> Result<Option<Review>, RepositoryError>;
    fn save_review(&self, review: Review) -> Result<(), RepositoryError>;
}

/// Shuttle trip store.
pub trait TripRepository: Send + Sync {
    fn trips_for_event(&self, event_id: &EventId) -> Result<Vec<Trip>, RepositoryError>;
    fn add_trip(&self, event_id: &EventId, trip: Trip) -> Result<(), RepositoryError>;
}

/// Everything the staffing service reads and writes.
pub trait StaffingRepository: AccountRepository + EventRepository + TripRepository {}

impl<T> StaffingRepository for T where T: AccountRepository + EventRepository + TripRepository {}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("host already applied to this event")]
    DuplicateApplication,
    #[error("record not found")]
    NotFound,
    #[error("host is already booked for {} overlapping event(s)", .0.len())]
    ScheduleConflict(Vec<ScheduleConflict>),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook for decision notifications (e-mail, push, chat adapters).
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, notice: DecisionNotice) -> Result<(), NotificationError>;
}

/// Notification payload so routes/tests can assert integration boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionNotice {
    pub template: String,
    pub application_id: ApplicationId,
    pub host_id: HostId,
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
