//! Host onboarding, application gating and adjudication, transportation and roster rules
//! for the staffing agency.
//!
//! Rule functions are pure and synchronous over explicit snapshots; the service layer
//! fetches those snapshots from the repositories and persists the outcomes.

pub mod adjudication;
pub mod domain;
pub mod eligibility;
pub mod lifecycle;
pub mod repository;
pub mod reviews;
pub mod roster;
pub mod router;
pub mod service;
pub mod transportation;

#[cfg(test)]
mod tests;

pub use adjudication::{
    decide, find_conflicts, AdjudicationError, AdminDecision, AppliedApplication, Assignment,
    ConflictError, ScheduleConflict, Transition,
};
pub use domain::{
    Application, ApplicationDraft, ApplicationId, ApplicationStatus, Eligibility, EventId,
    EventListing, EventStatus, EventWindow, HostAccount, HostId, Review, ReviewVisibility,
    Session, StaffRole, StarRating, Trip, UserRole, ValidationError,
};
pub use eligibility::{can_apply, has_applied, EligibilityVerdict, RefusalReason};
pub use lifecycle::{evaluate, session_state, LifecycleState};
pub use repository::{
    AccountRepository, DecisionNotice, EventRepository, NotificationError,
    NotificationPublisher, RepositoryError, StaffingRepository, TripRepository,
};
pub use reviews::{ReviewDraft, ReviewError};
pub use roster::{aggregate, CoverageEntry, RosterStats, RosterView};
pub use router::staffing_router;
pub use service::{EventRequest, ServiceError, StaffingService};
pub use transportation::{TransportationPlan, TransportationPlanner, TransportationPolicy};
