use serde::Serialize;

use super::super::domain::{EventId, EventListing, EventStatus};

/// Headline numbers shown above the event list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RosterStats {
    pub active_events: usize,
    pub pending_requests: usize,
    pub confirmed_events: usize,
    /// Open host seats; over-staffed events count as zero, never negative.
    pub hosts_needed: u64,
}

impl RosterStats {
    pub fn from_events(events: &[EventListing]) -> Self {
        events.iter().fold(Self::default(), |mut stats, event| {
            stats.active_events += 1;
            match event.status {
                EventStatus::Pending => stats.pending_requests += 1,
                EventStatus::Accepted => stats.confirmed_events += 1,
                EventStatus::Rejected => {}
            }
            stats.hosts_needed +=
                u64::from(event.nb_of_hosts.saturating_sub(event.accepted_hosts_count));
            stats
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageEntry {
    pub event_id: EventId,
    pub title: String,
    pub category: String,
    pub accepted: u32,
    pub required: u32,
    pub coverage_percent: f64,
}

impl CoverageEntry {
    pub fn for_event(event: &EventListing) -> Self {
        let coverage_percent = if event.nb_of_hosts == 0 {
            100.0
        } else {
            f64::from(event.accepted_hosts_count) / f64::from(event.nb_of_hosts) * 100.0
        };

        Self {
            event_id: event.id.clone(),
            title: event.title.clone(),
            category: super::category::normalize_category(&event.event_type),
            accepted: event.accepted_hosts_count,
            required: event.nb_of_hosts,
            coverage_percent,
        }
    }
}

/// Aggregated roster for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterView {
    pub sorted: Vec<EventListing>,
    pub filtered: Vec<EventListing>,
    pub coverage: Vec<CoverageEntry>,
    pub stats: RosterStats,
}
