use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::domain::{Application, EventId, EventListing, EventWindow};

/// An application paired with the event it targets.
#[derive(Debug, Clone, Copy)]
pub struct Assignment<'a> {
    pub application: &'a Application,
    pub event: &'a EventListing,
}

impl<'a> Assignment<'a> {
    pub fn new(application: &'a Application, event: &'a EventListing) -> Self {
        Self { application, event }
    }
}

/// Event already holding the host when a new acceptance was attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConflict {
    pub event_id: EventId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<DateTime<Utc>>,
}

impl ScheduleConflict {
    fn from_event(event: &EventListing) -> Self {
        Self {
            event_id: event.id.clone(),
            title: event.title.clone(),
            starts_at: event.schedule.map(|window| window.starts_at()),
            ends_at: event.schedule.map(|window| window.ends_at()),
        }
    }

    pub fn describe(&self) -> String {
        match (self.starts_at, self.ends_at) {
            (Some(starts_at), Some(ends_at)) => format!(
                "{} ({} to {})",
                self.title,
                starts_at.format("%Y-%m-%d %H:%M"),
                ends_at.format("%H:%M")
            ),
            _ => self.title.clone(),
        }
    }
}

/// Accepted assignments of the same host that block accepting `candidate` for an
/// event running during `window`.
///
/// A blocking assignment is another accepted application of the same host either
/// for the same event or for an event whose window overlaps. Stores persisting
/// decisions call this as well, so the client pre-check and the server rule agree.
pub fn find_conflicts<'a, I>(
    candidate: &Application,
    window: &EventWindow,
    assignments: I,
) -> Vec<ScheduleConflict>
where
    I: IntoIterator<Item = Assignment<'a>>,
{
    assignments
        .into_iter()
        .filter(|assignment| {
            let other = assignment.application;
            other.id != candidate.id && other.host_id == candidate.host_id && other.is_accepted()
        })
        .filter(|assignment| {
            assignment.application.event_id == candidate.event_id
                || assignment
                    .event
                    .schedule
                    .map(|other| other.overlaps(window))
                    .unwrap_or(false)
        })
        .map(|assignment| ScheduleConflict::from_event(assignment.event))
        .collect()
}
