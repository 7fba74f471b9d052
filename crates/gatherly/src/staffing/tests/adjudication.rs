use super::common::*;
use crate::staffing::adjudication::{
    decide, find_conflicts, AdjudicationError, AdminDecision, Assignment, Transition,
};
use crate::staffing::domain::{ApplicationStatus, StaffRole, ValidationError};

fn accept() -> AdminDecision {
    AdminDecision::Accept { role: None }
}

fn no_bookings<'a>() -> Vec<Assignment<'a>> {
    Vec::new()
}

#[test]
fn overlapping_acceptance_reports_the_blocking_event() {
    let p = event_p();
    let q = event_q();
    let booked = application("app-p", "host-x", "evt-p", ApplicationStatus::Accepted, false);
    let candidate = application("app-q", "host-x", "evt-q", ApplicationStatus::Pending, false);
    let before = candidate.clone();

    let result = decide(&candidate, &q, accept(), [Assignment::new(&booked, &p)]);

    match result {
        Err(AdjudicationError::Conflict(conflict)) => {
            assert_eq!(conflict.conflicts.len(), 1);
            assert_eq!(conflict.conflicts[0].event_id, p.id);
            assert_eq!(conflict.conflicts[0].title, "Event P");
            assert!(conflict.to_string().contains("Event P (2026-01-15 18:00 to 23:00)"));
        }
        other => panic!("expected scheduling conflict, got {other:?}"),
    }
    assert_eq!(candidate, before);
}

#[test]
fn conflict_error_code_is_scheduling_conflict() {
    let p = event_p();
    let booked = application("app-p", "host-x", "evt-p", ApplicationStatus::Accepted, false);
    let candidate = application("app-q", "host-x", "evt-q", ApplicationStatus::Pending, false);

    let err = decide(
        &candidate,
        &event_q(),
        accept(),
        [Assignment::new(&booked, &p)],
    )
    .expect_err("conflict");
    assert_eq!(err.code(), "SCHEDULING_CONFLICT");
}

#[test]
fn accept_defaults_to_requested_role_and_flags_rides() {
    let candidate = application("app-q", "host-x", "evt-q", ApplicationStatus::Pending, true);

    let applied = decide(&candidate, &event_q(), accept(), no_bookings()).expect("accepted");

    assert_eq!(applied.transition, Transition::Accepted);
    assert_eq!(applied.application.status, ApplicationStatus::Accepted);
    assert_eq!(applied.application.assigned_role, Some(StaffRole::Host));
    assert!(applied.transportation_stale);
}

#[test]
fn accept_can_promote_to_team_leader() {
    let candidate = application("app-q", "host-x", "evt-q", ApplicationStatus::Pending, false);

    let applied = decide(
        &candidate,
        &event_q(),
        AdminDecision::Accept {
            role: Some(StaffRole::TeamLeader),
        },
        no_bookings(),
    )
    .expect("accepted");

    assert_eq!(applied.application.assigned_role, Some(StaffRole::TeamLeader));
    assert!(!applied.transportation_stale);
}

#[test]
fn reaccepting_with_same_role_is_a_no_op() {
    let accepted = application("app-q", "host-x", "evt-q", ApplicationStatus::Accepted, true);

    let applied = decide(&accepted, &event_q(), accept(), no_bookings()).expect("no-op");

    assert_eq!(applied.transition, Transition::Unchanged);
    assert_eq!(applied.application, accepted);
    assert!(!applied.transportation_stale);
}

#[test]
fn changing_role_keeps_ride_demand() {
    let accepted = application("app-q", "host-x", "evt-q", ApplicationStatus::Accepted, true);

    let applied = decide(
        &accepted,
        &event_q(),
        AdminDecision::Accept {
            role: Some(StaffRole::TeamLeader),
        },
        no_bookings(),
    )
    .expect("role changed");

    assert_eq!(
        applied.transition,
        Transition::RoleChanged {
            from: StaffRole::Host,
            to: StaffRole::TeamLeader,
        }
    );
    assert!(!applied.transportation_stale);
}

#[test]
fn second_acceptance_for_same_event_conflicts() {
    let q = event_q();
    let first = application("app-1", "host-x", "evt-q", ApplicationStatus::Accepted, false);
    let second = application("app-2", "host-x", "evt-q", ApplicationStatus::Pending, false);

    match decide(&second, &q, accept(), [Assignment::new(&first, &q)]) {
        Err(AdjudicationError::Conflict(conflict)) => {
            assert_eq!(conflict.conflicts[0].event_id, q.id);
        }
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[test]
fn windows_touching_at_an_instant_conflict() {
    let early = event(
        "evt-early",
        "Breakfast",
        "corporate",
        Some(window(at(15, 8, 0), at(15, 12, 0))),
        2,
    );
    let late = event(
        "evt-late",
        "Lunch",
        "corporate",
        Some(window(at(15, 12, 0), at(15, 15, 0))),
        2,
    );
    let booked = application("app-1", "host-x", "evt-early", ApplicationStatus::Accepted, false);
    let candidate = application("app-2", "host-x", "evt-late", ApplicationStatus::Pending, false);

    let late_window = late.schedule.expect("scheduled");
    let conflicts = find_conflicts(
        &candidate,
        &late_window,
        [Assignment::new(&booked, &early)],
    );
    assert_eq!(conflicts.len(), 1);
}

#[test]
fn disjoint_or_unrelated_bookings_do_not_conflict() {
    let p = event_p();
    let q = event_q();
    let other_day = event(
        "evt-r",
        "Event R",
        "corporate",
        Some(window(at(16, 18, 0), at(16, 23, 0))),
        3,
    );
    let candidate = application("app-q", "host-x", "evt-q", ApplicationStatus::Pending, false);
    let other_host = application("app-1", "host-y", "evt-p", ApplicationStatus::Accepted, false);
    let still_pending = application("app-2", "host-x", "evt-p", ApplicationStatus::Pending, false);
    let next_day = application("app-3", "host-x", "evt-r", ApplicationStatus::Accepted, false);

    let applied = decide(
        &candidate,
        &q,
        accept(),
        [
            Assignment::new(&other_host, &p),
            Assignment::new(&still_pending, &p),
            Assignment::new(&next_day, &other_day),
            Assignment::new(&candidate, &q),
        ],
    )
    .expect("no conflict");
    assert_eq!(applied.transition, Transition::Accepted);
}

#[test]
fn reject_is_unconditional_and_clears_role() {
    let p = event_p();
    let q = event_q();
    let booked = application("app-p", "host-x", "evt-p", ApplicationStatus::Accepted, false);
    let accepted = application("app-q", "host-x", "evt-q", ApplicationStatus::Accepted, true);

    let applied = decide(
        &accepted,
        &q,
        AdminDecision::Reject,
        [Assignment::new(&booked, &p)],
    )
    .expect("rejected");

    assert_eq!(applied.transition, Transition::Rejected);
    assert_eq!(applied.application.status, ApplicationStatus::Rejected);
    assert_eq!(applied.application.assigned_role, None);
    assert!(applied.transportation_stale);

    let again = decide(&applied.application, &q, AdminDecision::Reject, no_bookings())
        .expect("no-op");
    assert_eq!(again.transition, Transition::Unchanged);
}

#[test]
fn rejected_application_cannot_be_accepted() {
    let rejected = application("app-q", "host-x", "evt-q", ApplicationStatus::Rejected, false);

    match decide(&rejected, &event_q(), accept(), no_bookings()) {
        Err(AdjudicationError::Validation(ValidationError::ApplicationClosed { .. })) => {}
        other => panic!("expected closed application, got {other:?}"),
    }
}

#[test]
fn decision_against_wrong_event_is_rejected() {
    let candidate = application("app-q", "host-x", "evt-q", ApplicationStatus::Pending, false);

    match decide(&candidate, &event_p(), accept(), no_bookings()) {
        Err(AdjudicationError::Validation(ValidationError::EventMismatch { .. })) => {}
        other => panic!("expected event mismatch, got {other:?}"),
    }
}

#[test]
fn unscheduled_event_cannot_be_staffed() {
    let unscheduled = event("evt-u", "Gala", "luxury", None, 4);
    let candidate = application("app-u", "host-x", "evt-u", ApplicationStatus::Pending, false);

    let err = decide(&candidate, &unscheduled, accept(), no_bookings())
        .expect_err("missing schedule");
    assert_eq!(err.code(), "VALIDATION_ERROR");
}

#[test]
fn decisions_deserialize_from_tagged_json() {
    let decision: AdminDecision =
        serde_json::from_str(r#"{"decision":"accept","role":"team_leader"}"#).expect("parses");
    assert_eq!(
        decision,
        AdminDecision::Accept {
            role: Some(StaffRole::TeamLeader)
        }
    );
    let decision: AdminDecision = serde_json::from_str(r#"{"decision":"reject"}"#).expect("parses");
    assert_eq!(decision, AdminDecision::Reject);
}
