use serde::{Deserialize, Serialize};

use super::domain::{Application, EventId, EventListing, Trip};

const DEFAULT_DOWNGRADE_RATIO: f64 = 0.5;

/// Policy dial for the shuttle downgrade heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransportationPolicy {
    downgrade_ratio: f64,
}

impl TransportationPolicy {
    /// Ratios outside `(0, 1]` fall back to the default of one half.
    pub fn new(downgrade_ratio: f64) -> Self {
        let sanitized =
            if downgrade_ratio.is_finite() && downgrade_ratio > 0.0 && downgrade_ratio <= 1.0 {
                downgrade_ratio
            } else {
                DEFAULT_DOWNGRADE_RATIO
            };

        Self {
            downgrade_ratio: sanitized,
        }
    }

    pub fn downgrade_ratio(&self) -> f64 {
        self.downgrade_ratio
    }

    /// Highest ride demand that still suggests reserving less capacity.
    pub fn downgrade_ceiling(&self, worst_case_seats: u32) -> u32 {
        let ceiling = (f64::from(worst_case_seats) * self.downgrade_ratio).ceil();
        ceiling.min(f64::from(u32::MAX)) as u32
    }
}

impl Default for TransportationPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_DOWNGRADE_RATIO)
    }
}

/// Seat demand summary for an event's shuttle service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransportationPlan {
    pub event_id: EventId,
    /// Every required host seat assumed to need a ride.
    pub worst_case_seats: u32,
    pub actual_needed_seats: u32,
    pub downgrade_suggested: bool,
    pub available: bool,
    pub seat_usage_percent: f64,
    pub trips: Vec<Trip>,
}

/// Stateless planner computing transportation summaries from materialised data.
#[derive(Debug, Clone, Default)]
pub struct TransportationPlanner {
    policy: TransportationPolicy,
}

impl TransportationPlanner {
    pub fn new(policy: TransportationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &TransportationPolicy {
        &self.policy
    }

    /// Only accepted applications for `event` are counted, whatever the caller passes in.
    pub fn plan<'a, I>(
        &self,
        event: &EventListing,
        applications: I,
        trips: &[Trip],
    ) -> TransportationPlan
    where
        I: IntoIterator<Item = &'a Application>,
    {
        let worst_case_seats = event.nb_of_hosts;
        let actual_needed_seats = applications
            .into_iter()
            .filter(|application| {
                application.event_id == event.id
                    && application.is_accepted()
                    && application.needs_ride
            })
            .count() as u32;

        let downgrade_suggested = actual_needed_seats > 0
            && actual_needed_seats <= self.policy.downgrade_ceiling(worst_case_seats);

        let seat_usage_percent = if worst_case_seats == 0 {
            0.0
        } else {
            f64::from(actual_needed_seats) / f64::from(worst_case_seats) * 100.0
        };

        TransportationPlan {
            event_id: event.id.clone(),
            worst_case_seats,
            actual_needed_seats,
            downgrade_suggested,
            available: worst_case_seats > 0 && !trips.is_empty(),
            seat_usage_percent,
            trips: trips.to_vec(),
        }
    }
}
