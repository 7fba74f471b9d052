use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::staffing::adjudication::{find_conflicts, Assignment};
use crate::staffing::domain::{
    Application, ApplicationId, ApplicationStatus, Eligibility, EventId, EventListing,
    EventStatus, EventWindow, HostAccount, HostId, Review, StaffRole, Trip,
};
use crate::staffing::repository::{
    AccountRepository, DecisionNotice, EventRepository, NotificationError, NotificationPublisher,
    RepositoryError, TripRepository,
};
use crate::staffing::{StaffingService, TransportationPolicy};

pub(super) fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, day, hour, minute, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn window(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> EventWindow {
    EventWindow::new(starts_at, ends_at).expect("valid window")
}

pub(super) fn account(
    id: &str,
    eligibility: Eligibility,
    code_of_conduct_accepted: bool,
    is_active: bool,
) -> HostAccount {
    HostAccount {
        id: HostId(id.to_string()),
        eligibility,
        is_active,
        code_of_conduct_accepted,
        clothing_size: Some("M".to_string()),
        spoken_languages: ["English".to_string(), "French".to_string()]
            .into_iter()
            .collect(),
    }
}

pub(super) fn ready_host(id: &str) -> HostAccount {
    account(id, Eligibility::Approved, true, true)
}

pub(super) fn event(
    id: &str,
    title: &str,
    event_type: &str,
    schedule: Option<EventWindow>,
    nb_of_hosts: u32,
) -> EventListing {
    EventListing {
        id: EventId(id.to_string()),
        title: title.to_string(),
        event_type: event_type.to_string(),
        schedule,
        date_label: None,
        nb_of_hosts,
        accepted_hosts_count: 0,
        status: EventStatus::Accepted,
        outfit: None,
        client_id: None,
    }
}

/// Event P from the overlap scenario: 2026-01-15 18:00 to 23:00.
pub(super) fn event_p() -> EventListing {
    event(
        "evt-p",
        "Event P",
        "corporate",
        Some(window(at(15, 18, 0), at(15, 23, 0))),
        6,
    )
}

/// Event Q from the overlap scenario: 2026-01-15 20:00 to 22:00.
pub(super) fn event_q() -> EventListing {
    event(
        "evt-q",
        "Event Q",
        "luxury",
        Some(window(at(15, 20, 0), at(15, 22, 0))),
        4,
    )
}

pub(super) fn application(
    id: &str,
    host: &str,
    event_id: &str,
    status: ApplicationStatus,
    needs_ride: bool,
) -> Application {
    Application {
        id: ApplicationId(id.to_string()),
        host_id: HostId(host.to_string()),
        event_id: EventId(event_id.to_string()),
        requested_role: StaffRole::Host,
        status,
        assigned_role: (status == ApplicationStatus::Accepted).then_some(StaffRole::Host),
        request_dress: false,
        needs_ride,
    }
}

pub(super) fn trip() -> Trip {
    Trip {
        pickup_location: "Central Station".to_string(),
        departure_time: at(15, 16, 30),
        return_time: at(15, 23, 45),
        payment: "agency".to_string(),
    }
}

#[derive(Default)]
pub(super) struct MemoryState {
    pub(super) accounts: HashMap<HostId, HostAccount>,
    pub(super) events: Vec<EventListing>,
    pub(super) applications: BTreeMap<ApplicationId, Application>,
    pub(super) reviews: HashMap<EventId, Review>,
    pub(super) trips: HashMap<EventId, Vec<Trip>>,
}

/// In-memory store. Accepting an application runs the shared conflict rule, like the
/// backend does. `stale_host_reads` hides the host's bookings from reads to simulate a
/// client working from an outdated view.
#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) state: Arc<Mutex<MemoryState>>,
    pub(super) stale_host_reads: bool,
}

impl MemoryRepository {
    pub(super) fn with_events(events: Vec<EventListing>) -> Self {
        let repository = Self::default();
        repository.state.lock().expect("state mutex poisoned").events = events;
        repository
    }

    pub(super) fn put_account(&self, account: HostAccount) {
        self.save_account(account).expect("account saved");
    }

    pub(super) fn put_application(&self, application: Application) {
        self.state
            .lock()
            .expect("state mutex poisoned")
            .applications
            .insert(application.id.clone(), application);
    }

    pub(super) fn application(&self, id: &str) -> Application {
        self.state
            .lock()
            .expect("state mutex poisoned")
            .applications
            .get(&ApplicationId(id.to_string()))
            .cloned()
            .expect("application present")
    }

    pub(super) fn event(&self, id: &str) -> EventListing {
        self.state
            .lock()
            .expect("state mutex poisoned")
            .events
            .iter()
            .find(|event| event.id.0 == id)
            .cloned()
            .expect("event present")
    }
}

impl AccountRepository for MemoryRepository {
    fn fetch_account(&self, id: &HostId) -> Result<Option<HostAccount>, RepositoryError> {
        let guard = self.state.lock().expect("state mutex poisoned");
        Ok(guard.accounts.get(id).cloned())
    }

    fn save_account(&self, account: HostAccount) -> Result<(), RepositoryError> {
        let mut guard = self.state.lock().expect("state mutex poisoned");
        guard.accounts.insert(account.id.clone(), account);
        Ok(())
    }
}

impl EventRepository for MemoryRepository {
    fn fetch_event(&self, id: &EventId) -> Result<Option<EventListing>, RepositoryError> {
        let guard = self.state.lock().expect("state mutex poisoned");
        Ok(guard.events.iter().find(|event| &event.id == id).cloned())
    }

    fn save_event(&self, event: EventListing) -> Result<(), RepositoryError> {
        let mut guard = self.state.lock().expect("state mutex poisoned");
        match guard.events.iter_mut().find(|existing| existing.id == event.id) {
            Some(existing) => *existing = event,
            None => guard.events.push(event),
        }
        Ok(())
    }

    fn list_events(&self) -> Result<Vec<EventListing>, RepositoryError> {
        let guard = self.state.lock().expect("state mutex poisoned");
        Ok(guard.events.clone())
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        let guard = self.state.lock().expect("state mutex poisoned");
        Ok(guard.applications.get(id).cloned())
    }

    fn insert_application(
        &self,
        application: Application,
    ) -> Result<Application, RepositoryError> {
        let mut guard = self.state.lock().expect("state mutex poisoned");
        if guard.applications.contains_key(&application.id) {
            return Err(RepositoryError::Conflict);
        }
        let duplicate = guard.applications.values().any(|existing| {
            existing.host_id == application.host_id && existing.event_id == application.event_id
        });
        if duplicate {
            return Err(RepositoryError::DuplicateApplication);
        }
        guard
            .applications
            .insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn update_application(&self, application: Application) -> Result<(), RepositoryError> {
        let mut guard = self.state.lock().expect("state mutex poisoned");
        if application.is_accepted() {
            let window = guard
                .events
                .iter()
                .find(|event| event.id == application.event_id)
                .and_then(|event| event.schedule);
            if let Some(window) = window {
                let state = &*guard;
                let assignments = state.applications.values().filter_map(|other| {
                    state
                        .events
                        .iter()
                        .find(|event| event.id == other.event_id)
                        .map(|event| Assignment::new(other, event))
                });
                let conflicts = find_conflicts(&application, &window, assignments);
                if !conflicts.is_empty() {
                    return Err(RepositoryError::ScheduleConflict(conflicts));
                }
            }
        }
        guard
            .applications
            .insert(application.id.clone(), application);
        Ok(())
    }

    fn refresh_accepted_count(&self, event_id: &EventId) -> Result<u32, RepositoryError> {
        let mut guard = self.state.lock().expect("state mutex poisoned");
        let accepted = guard
            .applications
            .values()
            .filter(|application| {
                &application.event_id == event_id && application.is_accepted()
            })
            .count() as u32;
        let event = guard
            .events
            .iter_mut()
            .find(|event| &event.id == event_id)
            .ok_or(RepositoryError::NotFound)?;
        event.accepted_hosts_count = accepted;
        Ok(accepted)
    }

    fn applications_for_host(
        &self,
        host_id: &HostId,
    ) -> Result<Vec<Application>, RepositoryError> {
        if self.stale_host_reads {
            return Ok(Vec::new());
        }
        let guard = self.state.lock().expect("state mutex poisoned");
        Ok(guard
            .applications
            .values()
            .filter(|application| &application.host_id == host_id)
            .cloned()
            .collect())
    }

    fn applications_for_event(
        &self,
        event_id: &EventId,
    ) -> Result<Vec<Application>, RepositoryError> {
        let guard = self.state.lock().expect("state mutex poisoned");
        Ok(guard
            .applications
            .values()
            .filter(|application| &application.event_id == event_id)
            .cloned()
            .collect())
    }

    fn fetch_review(&self, event_id: &EventId) -> Result<Option<Review>, RepositoryError> {
        let guard = self.state.lock().expect("state mutex poisoned");
        Ok(guard.reviews.get(event_id).cloned())
    }

    fn save_review(&self, review: Review) -> Result<(), RepositoryError> {
        let mut guard = self.state.lock().expect("state mutex poisoned");
        guard.reviews.insert(review.event_id.clone(), review);
        Ok(())
    }
}

impl TripRepository for MemoryRepository {
    fn trips_for_event(&self, event_id: &EventId) -> Result<Vec<Trip>, RepositoryError> {
        let guard = self.state.lock().expect("state mutex poisoned");
        Ok(guard.trips.get(event_id).cloned().unwrap_or_default())
    }

    fn add_trip(&self, event_id: &EventId, trip: Trip) -> Result<(), RepositoryError> {
        let mut guard = self.state.lock().expect("state mutex poisoned");
        guard.trips.entry(event_id.clone()).or_default().push(trip);
        Ok(())
    }
}

/// Store whose backend is down.
pub(super) struct UnavailableRepository;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl AccountRepository for UnavailableRepository {
    fn fetch_account(&self, _id: &HostId) -> Result<Option<HostAccount>, RepositoryError> {
        offline()
    }

    fn save_account(&self, _account: HostAccount) -> Result<(), RepositoryError> {
        offline()
    }
}

impl EventRepository for UnavailableRepository {
    fn fetch_event(&self, _id: &EventId) -> Result<Option<EventListing>, RepositoryError> {
        offline()
    }

    fn save_event(&self, _event: EventListing) -> Result<(), RepositoryError> {
        offline()
    }

    fn list_events(&self) -> Result<Vec<EventListing>, RepositoryError> {
        offline()
    }

    fn fetch_application(
        &self,
        _id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        offline()
    }

    fn insert_application(
        &self,
        _application: Application,
    ) -> Result<Application, RepositoryError> {
        offline()
    }

    fn update_application(&self, _application: Application) -> Result<(), RepositoryError> {
        offline()
    }

    fn refresh_accepted_count(&self, _event_id: &EventId) -> Result<u32, RepositoryError> {
        offline()
    }

    fn applications_for_host(
        &self,
        _host_id: &HostId,
    ) -> Result<Vec<Application>, RepositoryError> {
        offline()
    }

    fn applications_for_event(
        &self,
        _event_id: &EventId,
    ) -> Result<Vec<Application>, RepositoryError> {
        offline()
    }

    fn fetch_review(&self, _event_id: &EventId) -> Result<Option<Review>, RepositoryError> {
        offline()
    }

    fn save_review(&self, _review: Review) -> Result<(), RepositoryError> {
        offline()
    }
}

impl TripRepository for UnavailableRepository {
    fn trips_for_event(&self, _event_id: &EventId) -> Result<Vec<Trip>, RepositoryError> {
        offline()
    }

    fn add_trip(&self, _event_id: &EventId, _trip: Trip) -> Result<(), RepositoryError> {
        offline()
    }
}

type UpdateHook = Box<dyn Fn(&MemoryRepository) + Send + Sync>;

/// Delegates to a `MemoryRepository`, running `before_update` against the same store
/// just before each application write and counting account saves.
pub(super) struct ObservedRepository {
    pub(super) inner: MemoryRepository,
    before_update: Option<UpdateHook>,
    account_saves: AtomicUsize,
}

impl ObservedRepository {
    pub(super) fn new(inner: MemoryRepository) -> Self {
        Self {
            inner,
            before_update: None,
            account_saves: AtomicUsize::new(0),
        }
    }

    pub(super) fn before_update<F>(mut self, hook: F) -> Self
    where
        F: Fn(&MemoryRepository) + Send + Sync + 'static,
    {
        self.before_update = Some(Box::new(hook));
        self
    }

    pub(super) fn account_saves(&self) -> usize {
        self.account_saves.load(Ordering::SeqCst)
    }
}

impl AccountRepository for ObservedRepository {
    fn fetch_account(&self, id: &HostId) -> Result<Option<HostAccount>, RepositoryError> {
        self.inner.fetch_account(id)
    }

    fn save_account(&self, account: HostAccount) -> Result<(), RepositoryError> {
        self.account_saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save_account(account)
    }
}

impl EventRepository for ObservedRepository {
    fn fetch_event(&self, id: &EventId) -> Result<Option<EventListing>, RepositoryError> {
        self.inner.fetch_event(id)
    }

    fn save_event(&self, event: EventListing) -> Result<(), RepositoryError> {
        self.inner.save_event(event)
    }

    fn list_events(&self) -> Result<Vec<EventListing>, RepositoryError> {
        self.inner.list_events()
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        self.inner.fetch_application(id)
    }

    fn insert_application(
        &self,
        application: Application,
    ) -> Result<Application, RepositoryError> {
        self.inner.insert_application(application)
    }

    fn update_application(&self, application: Application) -> Result<(), RepositoryError> {
        if let Some(hook) = &self.before_update {
            hook(&self.inner);
        }
        self.inner.update_application(application)
    }

    fn refresh_accepted_count(&self, event_id: &EventId) -> Result<u32, RepositoryError> {
        self.inner.refresh_accepted_count(event_id)
    }

    fn applications_for_host(
        &self,
        host_id: &HostId,
    ) -> Result<Vec<Application>, RepositoryError> {
        self.inner.applications_for_host(host_id)
    }

    fn applications_for_event(
        &self,
        event_id: &EventId,
    ) -> Result<Vec<Application>, RepositoryError> {
        self.inner.applications_for_event(event_id)
    }

    fn fetch_review(&self, event_id: &EventId) -> Result<Option<Review>, RepositoryError> {
        self.inner.fetch_review(event_id)
    }

    fn save_review(&self, review: Review) -> Result<(), RepositoryError> {
        self.inner.save_review(review)
    }
}

impl TripRepository for ObservedRepository {
    fn trips_for_event(&self, event_id: &EventId) -> Result<Vec<Trip>, RepositoryError> {
        self.inner.trips_for_event(event_id)
    }

    fn add_trip(&self, event_id: &EventId, trip: Trip) -> Result<(), RepositoryError> {
        self.inner.add_trip(event_id, trip)
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifications {
    notices: Arc<Mutex<Vec<DecisionNotice>>>,
}

impl MemoryNotifications {
    pub(super) fn notices(&self) -> Vec<DecisionNotice> {
        self.notices
            .lock()
            .expect("notification mutex poisoned")
            .clone()
    }
}

impl NotificationPublisher for MemoryNotifications {
    fn publish(&self, notice: DecisionNotice) -> Result<(), NotificationError> {
        self.notices
            .lock()
            .expect("notification mutex poisoned")
            .push(notice);
        Ok(())
    }
}

pub(super) type TestService = StaffingService<MemoryRepository, MemoryNotifications>;

pub(super) fn build_service(
    repository: MemoryRepository,
) -> (TestService, Arc<MemoryRepository>, Arc<MemoryNotifications>) {
    let repository = Arc::new(repository);
    let notifications = Arc::new(MemoryNotifications::default());
    let service = StaffingService::new(
        repository.clone(),
        notifications.clone(),
        TransportationPolicy::default(),
    );
    (service, repository, notifications)
}

pub(super) fn build_observed_service(
    repository: ObservedRepository,
) -> (
    StaffingService<ObservedRepository, MemoryNotifications>,
    Arc<ObservedRepository>,
) {
    let repository = Arc::new(repository);
    let service = StaffingService::new(
        repository.clone(),
        Arc::new(MemoryNotifications::default()),
        TransportationPolicy::default(),
    );
    (service, repository)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
