use gatherly::staffing::{
    find_conflicts, AccountRepository, Application, ApplicationId, Assignment, DecisionNotice,
    EventId, EventListing, EventRepository, HostAccount, HostId, NotificationError,
    NotificationPublisher, RepositoryError, Review, Trip, TripRepository,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct StaffingTables {
    accounts: HashMap<HostId, HostAccount>,
    events: Vec<EventListing>,
    applications: BTreeMap<ApplicationId, Application>,
    reviews: HashMap<EventId, Review>,
    trips: HashMap<EventId, Vec<Trip>>,
}

/// Process-local store. Acceptances are checked against the host's other bookings
/// under the same lock that persists them.
#[derive(Default, Clone)]
pub(crate) struct InMemoryStaffingRepository {
    tables: Arc<Mutex<StaffingTables>>,
}

impl InMemoryStaffingRepository {
    pub(crate) fn with_events(events: Vec<EventListing>) -> Self {
        let repository = Self::default();
        repository
            .tables
            .lock()
            .expect("repository mutex poisoned")
            .events = events;
        repository
    }
}

impl AccountRepository for InMemoryStaffingRepository {
    fn fetch_account(&self, id: &HostId) -> Result<Option<HostAccount>, RepositoryError> {
        let guard = self.tables.lock().expect("repository mutex poisoned");
        Ok(guard.accounts.get(id).cloned())
    }

    fn save_account(&self, account: HostAccount) -> Result<(), RepositoryError> {
        let mut guard = self.tables.lock().expect("repository mutex poisoned");
        guard.accounts.insert(account.id.clone(), account);
        Ok(())
    }
}

impl EventRepository for InMemoryStaffingRepository {
    fn fetch_event(&self, id: &EventId) -> Result<Option<EventListing>, RepositoryError> {
        let guard = self.tables.lock().expect("repository mutex poisoned");
        Ok(guard.events.iter().find(|event| &event.id == id).cloned())
    }

    fn save_event(&self, event: EventListing) -> Result<(), RepositoryError> {
        let mut guard = self.tables.lock().expect("repository mutex poisoned");
        match guard.events.iter_mut().find(|existing| existing.id == event.id) {
            Some(existing) => *existing = event,
            None => guard.events.push(event),
        }
        Ok(())
    }

    fn list_events(&self) -> Result<Vec<EventListing>, RepositoryError> {
        let guard = self.tables.lock().expect("repository mutex poisoned");
        Ok(guard.events.clone())
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        let guard = self.tables.lock().expect("repository mutex poisoned");
        Ok(guard.applications.get(id).cloned())
    }

    fn insert_application(
        &self,
        application: Application,
    ) -> Result<Application, RepositoryError> {
        let mut guard = self.tables.lock().expect("repository mutex poisoned");
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
        let mut guard = self.tables.lock().expect("repository mutex poisoned");
        if !guard.applications.contains_key(&application.id) {
            return Err(RepositoryError::NotFound);
        }

        if application.is_accepted() {
            let tables = &*guard;
            let window = tables
                .events
                .iter()
                .find(|event| event.id == application.event_id)
                .and_then(|event| event.schedule);
            if let Some(window) = window {
                let assignments = tables.applications.values().filter_map(|other| {
                    tables
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
        let mut guard = self.tables.lock().expect("repository mutex poisoned");
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
        let guard = self.tables.lock().expect("repository mutex poisoned");
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
        let guard = self.tables.lock().expect("repository mutex poisoned");
        Ok(guard
            .applications
            .values()
            .filter(|application| &application.event_id == event_id)
            .cloned()
            .collect())
    }

    fn fetch_review(&self, event_id: &EventId) -> Result<Option<Review>, RepositoryError> {
        let guard = self.tables.lock().expect("repository mutex poisoned");
        Ok(guard.reviews.get(event_id).cloned())
    }

    fn save_review(&self, review: Review) -> Result<(), RepositoryError> {
        let mut guard = self.tables.lock().expect("repository mutex poisoned");
        guard.reviews.insert(review.event_id.clone(), review);
        Ok(())
    }
}

impl TripRepository for InMemoryStaffingRepository {
    fn trips_for_event(&self, event_id: &EventId) -> Result<Vec<Trip>, RepositoryError> {
        let guard = self.tables.lock().expect("repository mutex poisoned");
        Ok(guard.trips.get(event_id).cloned().unwrap_or_default())
    }

    fn add_trip(&self, event_id: &EventId, trip: Trip) -> Result<(), RepositoryError> {
        let mut guard = self.tables.lock().expect("repository mutex poisoned");
        guard.trips.entry(event_id.clone()).or_default().push(trip);
        Ok(())
    }
}

/// Keeps decision notices in memory and logs them; stands in for the mail adapter.
#[derive(Default, Clone)]
pub(crate) struct InMemoryNotificationPublisher {
    notices: Arc<Mutex<Vec<DecisionNotice>>>,
}

impl NotificationPublisher for InMemoryNotificationPublisher {
    fn publish(&self, notice: DecisionNotice) -> Result<(), NotificationError> {
        info!(
            template = %notice.template,
            application_id = %notice.application_id,
            host_id = %notice.host_id,
            "decision notice queued"
        );
        let mut guard = self.notices.lock().expect("notification mutex poisoned");
        guard.push(notice);
        Ok(())
    }
}

impl InMemoryNotificationPublisher {
    pub(crate) fn notices(&self) -> Vec<DecisionNotice> {
        self.notices
            .lock()
            .expect("notification mutex poisoned")
            .clone()
    }
}
