use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for host accounts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HostId(pub String);

/// Identifier wrapper for event listings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub String);

/// Identifier wrapper for event applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

macro_rules! display_id {
    ($($name:ident),+) => {
        $(impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        })+
    };
}

display_id!(HostId, EventId, ApplicationId);

/// Admin-controlled account standing, independent of activity and code of conduct flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Eligibility {
    Pending,
    Approved,
    Blocked,
    /// Any standing the backend reports that this engine does not recognise.
    #[serde(other)]
    Unknown,
}

impl Eligibility {
    pub const fn label(self) -> &'static str {
        match self {
            Eligibility::Pending => "pending",
            Eligibility::Approved => "approved",
            Eligibility::Blocked => "blocked",
            Eligibility::Unknown => "unknown",
        }
    }
}

/// Snapshot of a host account as supplied by the account store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostAccount {
    pub id: HostId,
    pub eligibility: Eligibility,
    pub is_active: bool,
    pub code_of_conduct_accepted: bool,
    #[serde(default)]
    pub clothing_size: Option<String>,
    #[serde(default)]
    pub spoken_languages: BTreeSet<String>,
}

impl HostAccount {
    /// Account state right after sign-up: pending, inactive, code of conduct not yet accepted.
    pub fn sign_up(
        id: HostId,
        clothing_size: Option<String>,
        spoken_languages: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            id,
            eligibility: Eligibility::Pending,
            is_active: false,
            code_of_conduct_accepted: false,
            clothing_size,
            spoken_languages: spoken_languages
                .into_iter()
                .map(|language| language.trim().to_string())
                .filter(|language| !language.is_empty())
                .collect(),
        }
    }
}

/// Account-level role carried by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Host,
    Client,
    Admin,
}

impl UserRole {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "host" => Some(Self::Host),
            "client" => Some(Self::Client),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            UserRole::Host => "host",
            UserRole::Client => "client",
            UserRole::Admin => "admin",
        }
    }
}

/// Authenticated caller. Host sessions carry the account snapshot they were resolved with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub role: UserRole,
    #[serde(default)]
    pub host: Option<HostAccount>,
}

impl Session {
    pub fn host(account: HostAccount) -> Self {
        Self {
            user_id: account.id.0.clone(),
            role: UserRole::Host,
            host: Some(account),
        }
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: UserRole::Admin,
            host: None,
        }
    }

    pub fn client(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: UserRole::Client,
            host: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Time range an event occupies. `ends_at` is always strictly after `starts_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEventWindow")]
pub struct EventWindow {
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
}

impl EventWindow {
    pub fn new(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Result<Self, ValidationError> {
        if ends_at <= starts_at {
            return Err(ValidationError::InvalidSchedule { starts_at, ends_at });
        }
        Ok(Self { starts_at, ends_at })
    }

    pub fn starts_at(&self) -> DateTime<Utc> {
        self.starts_at
    }

    pub fn ends_at(&self) -> DateTime<Utc> {
        self.ends_at
    }

    /// Closed-interval overlap: windows sharing a single instant overlap.
    pub fn overlaps(&self, other: &EventWindow) -> bool {
        self.starts_at <= other.ends_at && other.starts_at <= self.ends_at
    }
}

#[derive(Deserialize)]
struct RawEventWindow {
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
}

impl TryFrom<RawEventWindow> for EventWindow {
    type Error = ValidationError;

    fn try_from(raw: RawEventWindow) -> Result<Self, Self::Error> {
        EventWindow::new(raw.starts_at, raw.ends_at)
    }
}

/// Lifecycle of a client event request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Pending,
    Accepted,
    Rejected,
}

impl EventStatus {
    pub const fn label(self) -> &'static str {
        match self {
            EventStatus::Pending => "pending",
            EventStatus::Accepted => "accepted",
            EventStatus::Rejected => "rejected",
        }
    }
}

/// Event listing as seen by hosts, admins and the roster views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventListing {
    pub id: EventId,
    pub title: String,
    pub event_type: String,
    #[serde(default)]
    pub schedule: Option<EventWindow>,
    /// Display-only date used when no schedule has been set.
    #[serde(default)]
    pub date_label: Option<String>,
    pub nb_of_hosts: u32,
    #[serde(default)]
    pub accepted_hosts_count: u32,
    pub status: EventStatus,
    #[serde(default)]
    pub outfit: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
}

impl EventListing {
    /// New client request awaiting admin review.
    pub fn request(
        id: EventId,
        title: impl Into<String>,
        event_type: impl Into<String>,
        schedule: EventWindow,
        nb_of_hosts: u32,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            event_type: event_type.into(),
            schedule: Some(schedule),
            date_label: None,
            nb_of_hosts,
            accepted_hosts_count: 0,
            status: EventStatus::Pending,
            outfit: None,
            client_id: None,
        }
    }

    /// Admin decision on a pending request. Accepted and rejected are terminal.
    pub fn decide(&mut self, accept: bool) -> Result<(), ValidationError> {
        if self.status != EventStatus::Pending {
            return Err(ValidationError::EventAlreadyDecided {
                event_id: self.id.clone(),
                status: self.status,
            });
        }
        self.status = if accept {
            EventStatus::Accepted
        } else {
            EventStatus::Rejected
        };
        Ok(())
    }

    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.schedule
            .map(|window| window.ends_at() <= now)
            .unwrap_or(false)
    }
}

/// Per-event staffing role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Host,
    TeamLeader,
}

impl StaffRole {
    pub const fn label(self) -> &'static str {
        match self {
            StaffRole::Host => "host",
            StaffRole::TeamLeader => "team_leader",
        }
    }
}

/// High level status tracked for an event application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

/// A host's application to work an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub host_id: HostId,
    pub event_id: EventId,
    pub requested_role: StaffRole,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub assigned_role: Option<StaffRole>,
    #[serde(default)]
    pub request_dress: bool,
    #[serde(default)]
    pub needs_ride: bool,
}

impl Application {
    pub fn is_accepted(&self) -> bool {
        self.status == ApplicationStatus::Accepted
    }
}

/// Host-supplied fields of a new application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationDraft {
    pub requested_role: StaffRole,
    #[serde(default)]
    pub request_dress: bool,
    #[serde(default)]
    pub needs_ride: bool,
}

/// Shuttle leg recorded for an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trip {
    pub pickup_location: String,
    pub departure_time: DateTime<Utc>,
    pub return_time: DateTime<Utc>,
    pub payment: String,
}

/// Who may read a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewVisibility {
    Public,
    Private,
    Hidden,
}

/// Star rating constrained to 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct StarRating(u8);

impl StarRating {
    pub fn new(value: u8) -> Result<Self, ValidationError> {
        if (1..=5).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ValidationError::StarRatingOutOfRange(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for StarRating {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        StarRating::new(value)
    }
}

impl From<StarRating> for u8 {
    fn from(rating: StarRating) -> Self {
        rating.0
    }
}

/// Post-event review written by the event's team leader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub event_id: EventId,
    pub author_id: HostId,
    pub star_rating: StarRating,
    pub content: String,
    pub visibility: ReviewVisibility,
}

/// Malformed input rejected before any state change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("event must end after it starts (starts {starts_at}, ends {ends_at})")]
    InvalidSchedule {
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    },
    #[error("event {event_id} has no schedule")]
    MissingSchedule { event_id: EventId },
    #[error("event {event_id} was already {}", .status.label())]
    EventAlreadyDecided {
        event_id: EventId,
        status: EventStatus,
    },
    #[error("application {application_id} belongs to event {expected}, not {found}")]
    EventMismatch {
        application_id: ApplicationId,
        expected: EventId,
        found: EventId,
    },
    #[error("application {application_id} was rejected and cannot be accepted")]
    ApplicationClosed { application_id: ApplicationId },
    #[error("star rating must be between 1 and 5, got {0}")]
    StarRatingOutOfRange(u8),
    #[error("{0} must not be blank")]
    Blank(&'static str),
    #[error("request does not change anything")]
    EmptyChange,
}
