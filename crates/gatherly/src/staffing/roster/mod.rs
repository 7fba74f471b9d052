mod category;
pub mod import;
mod views;

pub use category::{is_all, normalize_category};
pub use import::{import_events, import_events_from_path, RosterImportError};
pub use views::{CoverageEntry, RosterStats, RosterView};

use chrono::{DateTime, NaiveDate, Utc};
use std::cmp::Ordering;

use super::domain::EventListing;

/// Build the display roster: chronological order, category filter, coverage and stats.
pub fn aggregate(events: &[EventListing], category: &str) -> RosterView {
    let sorted = sort_by_start(events);
    let filtered = filter_by_category(&sorted, category);
    let coverage = filtered.iter().map(CoverageEntry::for_event).collect();

    RosterView {
        stats: RosterStats::from_events(events),
        sorted,
        filtered,
        coverage,
    }
}

/// Stable ascending sort by start time. Events without a schedule fall back to
/// their display date; events with neither come last, in input order.
pub fn sort_by_start(events: &[EventListing]) -> Vec<EventListing> {
    let mut keyed: Vec<(Option<DateTime<Utc>>, &EventListing)> =
        events.iter().map(|event| (sort_key(event), event)).collect();

    keyed.sort_by(|(left, _), (right, _)| match (left, right) {
        (Some(left), Some(right)) => left.cmp(right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    keyed.into_iter().map(|(_, event)| event.clone()).collect()
}

/// Events whose normalized category matches `category`, in input order. `all` keeps everything.
pub fn filter_by_category(events: &[EventListing], category: &str) -> Vec<EventListing> {
    if is_all(category) {
        return events.to_vec();
    }

    let wanted = normalize_category(category);
    events
        .iter()
        .filter(|event| normalize_category(&event.event_type) == wanted)
        .cloned()
        .collect()
}

fn sort_key(event: &EventListing) -> Option<DateTime<Utc>> {
    event
        .schedule
        .map(|window| window.starts_at())
        .or_else(|| event.date_label.as_deref().and_then(parse_date_label))
}

pub(crate) fn parse_date_label(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
