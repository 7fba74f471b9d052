use super::common::*;
use crate::staffing::domain::{ApplicationStatus, Eligibility, EventId, Session};
use crate::staffing::eligibility::{can_apply, has_applied, RefusalReason};
use crate::staffing::lifecycle::{evaluate, LifecycleState};

#[test]
fn anonymous_callers_must_sign_in() {
    let verdict = can_apply(None, &event_p(), false);
    assert!(!verdict.allowed);
    assert_eq!(verdict.reason, Some(RefusalReason::NotAuthenticated));
    assert_eq!(verdict.lifecycle, None);
}

#[test]
fn clients_and_admins_cannot_apply() {
    for session in [Session::client("client-1"), Session::admin("admin-1")] {
        let verdict = can_apply(Some(&session), &event_p(), false);
        assert_eq!(verdict.reason, Some(RefusalReason::WrongRole));
    }
}

#[test]
fn role_is_checked_before_duplicates() {
    let verdict = can_apply(Some(&Session::client("client-1")), &event_p(), true);
    assert_eq!(verdict.reason, Some(RefusalReason::WrongRole));
}

#[test]
fn hosts_still_onboarding_are_refused_with_their_state() {
    let session = Session::host(account("host-1", Eligibility::Approved, true, false));
    let verdict = can_apply(Some(&session), &event_p(), true);

    assert_eq!(verdict.reason, Some(RefusalReason::AccountNotReady));
    assert_eq!(verdict.lifecycle, Some(LifecycleState::Inactive));
}

#[test]
fn duplicate_application_is_refused() {
    let session = Session::host(ready_host("host-1"));
    let verdict = can_apply(Some(&session), &event_p(), true);
    assert_eq!(verdict.reason, Some(RefusalReason::AlreadyApplied));
    assert_eq!(
        verdict.into_result(),
        Err(RefusalReason::AlreadyApplied)
    );
}

#[test]
fn ready_host_may_apply() {
    let session = Session::host(ready_host("host-1"));
    let verdict = can_apply(Some(&session), &event_p(), false);

    assert!(verdict.allowed);
    assert_eq!(verdict.event_id, EventId("evt-p".to_string()));
    assert_eq!(verdict.lifecycle, Some(LifecycleState::Ready));
    assert_eq!(verdict.into_result(), Ok(()));
}

#[test]
fn allowed_only_when_lifecycle_is_ready() {
    let standings = [
        Eligibility::Pending,
        Eligibility::Approved,
        Eligibility::Blocked,
        Eligibility::Unknown,
    ];
    for eligibility in standings {
        for coc in [false, true] {
            for active in [false, true] {
                let host = account("host-1", eligibility, coc, active);
                let ready = evaluate(&host).is_ready();
                let verdict = can_apply(Some(&Session::host(host)), &event_p(), false);
                assert_eq!(verdict.allowed, ready, "{eligibility:?} coc={coc} active={active}");
            }
        }
    }
}

#[test]
fn refusal_codes_and_messages_are_distinct() {
    let reasons = [
        RefusalReason::NotAuthenticated,
        RefusalReason::WrongRole,
        RefusalReason::AccountNotReady,
        RefusalReason::AlreadyApplied,
    ];
    for (index, reason) in reasons.iter().enumerate() {
        for other in &reasons[index + 1..] {
            assert_ne!(reason.code(), other.code());
            assert_ne!(reason.message(), other.message());
        }
    }
    let json = serde_json::to_value(RefusalReason::AccountNotReady).expect("serializes");
    assert_eq!(json, "ACCOUNT_NOT_READY");
}

#[test]
fn has_applied_matches_on_event() {
    let applications = vec![
        application("app-1", "host-1", "evt-q", ApplicationStatus::Rejected, false),
        application("app-2", "host-1", "evt-r", ApplicationStatus::Pending, false),
    ];
    assert!(has_applied(&applications, &EventId("evt-q".to_string())));
    assert!(!has_applied(&applications, &EventId("evt-p".to_string())));
}
