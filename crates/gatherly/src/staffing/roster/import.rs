//! CSV import of event listings for offline roster reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::super::domain::{EventId, EventListing, EventStatus, EventWindow, ValidationError};
use super::parse_date_label;

#[derive(Debug)]
pub enum RosterImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Row { line: usize, reason: String },
    Validation { line: usize, source: ValidationError },
}

impl std::fmt::Display for RosterImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RosterImportError::Io(err) => write!(f, "failed to read event export: {}", err),
            RosterImportError::Csv(err) => write!(f, "invalid event CSV data: {}", err),
            RosterImportError::Row { line, reason } => {
                write!(f, "event row {}: {}", line, reason)
            }
            RosterImportError::Validation { line, source } => {
                write!(f, "event row {}: {}", line, source)
            }
        }
    }
}

impl std::error::Error for RosterImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RosterImportError::Io(err) => Some(err),
            RosterImportError::Csv(err) => Some(err),
            RosterImportError::Row { .. } => None,
            RosterImportError::Validation { source, .. } => Some(source),
        }
    }
}

impl From<std::io::Error> for RosterImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for RosterImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Read event listings from a CSV file.
pub fn import_events_from_path<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<EventListing>, RosterImportError> {
    let file = File::open(path)?;
    import_events(file)
}

/// Read event listings from CSV with headers
/// `id,title,type,starts_at,ends_at,date,nb_of_hosts,accepted_hosts_count,status`.
/// Missing `status` defaults to pending; `starts_at`/`ends_at` must come as a pair.
pub fn import_events<R: Read>(reader: R) -> Result<Vec<EventListing>, RosterImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut events = Vec::new();

    for (index, record) in csv_reader.deserialize::<EventRow>().enumerate() {
        // header is line 1
        let line = index + 2;
        let row = record?;
        events.push(row.into_listing(line)?);
    }

    Ok(events)
}

#[derive(Debug, Deserialize)]
struct EventRow {
    id: String,
    title: String,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    starts_at: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    ends_at: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    date: Option<String>,
    nb_of_hosts: u32,
    #[serde(default)]
    accepted_hosts_count: u32,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    status: Option<String>,
}

impl EventRow {
    fn into_listing(self, line: usize) -> Result<EventListing, RosterImportError> {
        let schedule = match (self.starts_at.as_deref(), self.ends_at.as_deref()) {
            (Some(starts_at), Some(ends_at)) => {
                let starts_at = parse_timestamp(starts_at, line, "starts_at")?;
                let ends_at = parse_timestamp(ends_at, line, "ends_at")?;
                Some(
                    EventWindow::new(starts_at, ends_at)
                        .map_err(|source| RosterImportError::Validation { line, source })?,
                )
            }
            (None, None) => None,
            _ => {
                return Err(RosterImportError::Row {
                    line,
                    reason: "starts_at and ends_at must both be set".to_string(),
                })
            }
        };

        let status = match self.status.as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("pending") => EventStatus::Pending,
            Some("accepted") => EventStatus::Accepted,
            Some("rejected") => EventStatus::Rejected,
            Some(other) => {
                return Err(RosterImportError::Row {
                    line,
                    reason: format!("unknown status '{other}'"),
                })
            }
        };

        Ok(EventListing {
            id: EventId(self.id),
            title: self.title,
            event_type: self.event_type,
            schedule,
            date_label: self.date,
            nb_of_hosts: self.nb_of_hosts,
            accepted_hosts_count: self.accepted_hosts_count,
            status,
            outfit: None,
            client_id: None,
        })
    }
}

fn parse_timestamp(
    raw: &str,
    line: usize,
    column: &str,
) -> Result<DateTime<Utc>, RosterImportError> {
    parse_date_label(raw).ok_or_else(|| RosterImportError::Row {
        line,
        reason: format!("{column} '{raw}' is not an RFC 3339 timestamp or YYYY-MM-DD date"),
    })
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
