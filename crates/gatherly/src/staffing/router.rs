use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::adjudication::{AdjudicationError, AdminDecision};
use super::domain::{
    ApplicationDraft, ApplicationId, Eligibility, EventId, HostAccount, HostId, ReviewVisibility,
    Session, Trip, UserRole,
};
use super::eligibility::{EligibilityVerdict, RefusalReason};
use super::lifecycle::{evaluate, LifecycleState};
use super::repository::{NotificationPublisher, RepositoryError, StaffingRepository};
use super::reviews::{ReviewDraft, ReviewError};
use super::service::{EventRequest, ServiceError, StaffingService};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

type SharedService<R, N> = Arc<StaffingService<R, N>>;

/// Router builder exposing the staffing endpoints.
pub fn staffing_router<R, N>(service: SharedService<R, N>) -> Router
where
    R: StaffingRepository + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route("/api/v1/hosts", post(sign_up_handler::<R, N>))
        .route(
            "/api/v1/hosts/:host_id/lifecycle",
            get(lifecycle_handler::<R, N>),
        )
        .route(
            "/api/v1/hosts/:host_id/code-of-conduct",
            post(code_of_conduct_handler::<R, N>),
        )
        .route(
            "/api/v1/hosts/:host_id/standing",
            put(standing_handler::<R, N>),
        )
        .route("/api/v1/events", post(request_event_handler::<R, N>))
        .route(
            "/api/v1/events/:event_id/decision",
            post(event_decision_handler::<R, N>),
        )
        .route(
            "/api/v1/events/:event_id/eligibility",
            get(eligibility_handler::<R, N>),
        )
        .route(
            "/api/v1/events/:event_id/applications",
            post(submit_handler::<R, N>),
        )
        .route(
            "/api/v1/applications/:application_id/decision",
            post(decision_handler::<R, N>),
        )
        .route(
            "/api/v1/events/:event_id/transportation",
            get(transportation_handler::<R, N>),
        )
        .route(
            "/api/v1/events/:event_id/trips",
            post(add_trip_handler::<R, N>),
        )
        .route(
            "/api/v1/events/:event_id/review",
            post(review_handler::<R, N>),
        )
        .route(
            "/api/v1/events/:event_id/review/visibility",
            put(review_visibility_handler::<R, N>),
        )
        .route("/api/v1/roster", get(roster_handler::<R, N>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct SignUpRequest {
    pub(crate) host_id: String,
    #[serde(default)]
    pub(crate) clothing_size: Option<String>,
    #[serde(default)]
    pub(crate) spoken_languages: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StandingRequest {
    #[serde(default)]
    pub(crate) eligibility: Option<Eligibility>,
    #[serde(default)]
    pub(crate) is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EventDecisionRequest {
    pub(crate) accept: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VisibilityRequest {
    pub(crate) visibility: ReviewVisibility,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RosterQuery {
    #[serde(default)]
    pub(crate) category: Option<String>,
}

/// Account snapshot together with its derived onboarding state.
#[derive(Debug, Serialize)]
pub struct AccountView {
    pub account: HostAccount,
    pub lifecycle: LifecycleState,
}

impl From<HostAccount> for AccountView {
    fn from(account: HostAccount) -> Self {
        let lifecycle = evaluate(&account);
        Self { account, lifecycle }
    }
}

/// Gate verdict with the human-readable refusal message alongside the code.
#[derive(Debug, Serialize)]
pub struct EligibilityView {
    #[serde(flatten)]
    pub verdict: EligibilityVerdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<EligibilityVerdict> for EligibilityView {
    fn from(verdict: EligibilityVerdict) -> Self {
        let message = verdict.reason.map(RefusalReason::message);
        Self { verdict, message }
    }
}

/// Session claims carried in request headers. Missing or unrecognised claims mean
/// the caller is anonymous.
fn session_from_headers<R, N>(
    service: &StaffingService<R, N>,
    headers: &HeaderMap,
) -> Result<Option<Session>, ServiceError>
where
    R: StaffingRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    let (Some(user_id), Some(role)) = (
        header(USER_ID_HEADER),
        header(USER_ROLE_HEADER).and_then(UserRole::parse),
    ) else {
        return Ok(None);
    };

    service.resolve_session(user_id, role).map(Some)
}

fn require_session<R, N>(
    service: &StaffingService<R, N>,
    headers: &HeaderMap,
) -> Result<Session, ServiceError>
where
    R: StaffingRepository + 'static,
    N: NotificationPublisher + 'static,
{
    session_from_headers(service, headers)?
        .ok_or(ServiceError::Refused(RefusalReason::NotAuthenticated))
}

pub(crate) async fn sign_up_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Json(request): Json<SignUpRequest>,
) -> Response
where
    R: StaffingRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let SignUpRequest {
        host_id,
        clothing_size,
        spoken_languages,
    } = request;
    match service.sign_up(HostId(host_id), clothing_size, spoken_languages) {
        Ok(account) => (StatusCode::CREATED, Json(AccountView::from(account))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn lifecycle_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(host_id): Path<String>,
) -> Response
where
    R: StaffingRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.lifecycle(&HostId(host_id.clone())) {
        Ok(lifecycle) => (
            StatusCode::OK,
            Json(json!({ "host_id": host_id, "lifecycle": lifecycle })),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn code_of_conduct_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    headers: HeaderMap,
    Path(host_id): Path<String>,
) -> Response
where
    R: StaffingRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let result = require_session(&service, &headers)
        .and_then(|session| service.accept_code_of_conduct(&session, &HostId(host_id)));
    match result {
        Ok(account) => (StatusCode::OK, Json(AccountView::from(account))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn standing_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    headers: HeaderMap,
    Path(host_id): Path<String>,
    Json(request): Json<StandingRequest>,
) -> Response
where
    R: StaffingRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let host_id = HostId(host_id);
    let result = require_session(&service, &headers).and_then(|session| {
        service.set_standing(&session, &host_id, request.eligibility, request.is_active)
    });

    match result {
        Ok(account) => (StatusCode::OK, Json(AccountView::from(account))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn request_event_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    headers: HeaderMap,
    Json(request): Json<EventRequest>,
) -> Response
where
    R: StaffingRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let result = require_session(&service, &headers)
        .and_then(|session| service.request_event(&session, request));
    match result {
        Ok(event) => (StatusCode::CREATED, Json(event)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn event_decision_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    headers: HeaderMap,
    Path(event_id): Path<String>,
    Json(request): Json<EventDecisionRequest>,
) -> Response
where
    R: StaffingRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let result = require_session(&service, &headers)
        .and_then(|session| service.decide_event(&session, &EventId(event_id), request.accept));
    match result {
        Ok(event) => (StatusCode::OK, Json(event)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn eligibility_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    headers: HeaderMap,
    Path(event_id): Path<String>,
) -> Response
where
    R: StaffingRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let result = session_from_headers(&service, &headers)
        .and_then(|session| service.eligibility(session.as_ref(), &EventId(event_id)));
    match result {
        Ok(verdict) => (StatusCode::OK, Json(EligibilityView::from(verdict))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn submit_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    headers: HeaderMap,
    Path(event_id): Path<String>,
    Json(draft): Json<ApplicationDraft>,
) -> Response
where
    R: StaffingRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let result = session_from_headers(&service, &headers).and_then(|session| {
        service.submit_application(session.as_ref(), &EventId(event_id), draft)
    });
    match result {
        Ok(application) => (StatusCode::CREATED, Json(application)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn decision_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
    Json(decision): Json<AdminDecision>,
) -> Response
where
    R: StaffingRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let result = require_session(&service, &headers).and_then(|session| {
        service.decide_application(&session, &ApplicationId(application_id), decision)
    });
    match result {
        Ok(applied) => (StatusCode::OK, Json(applied)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn transportation_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(event_id): Path<String>,
) -> Response
where
    R: StaffingRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.transportation(&EventId(event_id)) {
        Ok(plan) => (StatusCode::OK, Json(plan)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn add_trip_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    headers: HeaderMap,
    Path(event_id): Path<String>,
    Json(trip): Json<Trip>,
) -> Response
where
    R: StaffingRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let result = require_session(&service, &headers)
        .and_then(|session| service.add_trip(&session, &EventId(event_id), trip));
    match result {
        Ok(plan) => (StatusCode::CREATED, Json(plan)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn review_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    headers: HeaderMap,
    Path(event_id): Path<String>,
    Json(draft): Json<ReviewDraft>,
) -> Response
where
    R: StaffingRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let result = require_session(&service, &headers).and_then(|session| {
        service.submit_review(&session, &EventId(event_id), draft, Utc::now())
    });
    match result {
        Ok(review) => (StatusCode::CREATED, Json(review)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn review_visibility_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    headers: HeaderMap,
    Path(event_id): Path<String>,
    Json(request): Json<VisibilityRequest>,
) -> Response
where
    R: StaffingRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let result = require_session(&service, &headers).and_then(|session| {
        service.set_review_visibility(&session, &EventId(event_id), request.visibility)
    });
    match result {
        Ok(review) => (StatusCode::OK, Json(review)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn roster_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Query(query): Query<RosterQuery>,
) -> Response
where
    R: StaffingRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let category = query.category.unwrap_or_else(|| "all".to_string());
    match service.roster(&category) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

/// Map a service error onto a status code and a `{code, error}` payload. Every
/// refusal keeps its own code and message.
pub(crate) fn error_response(err: ServiceError) -> Response {
    let status = match &err {
        ServiceError::Refused(RefusalReason::NotAuthenticated) => StatusCode::UNAUTHORIZED,
        ServiceError::Refused(RefusalReason::WrongRole)
        | ServiceError::Refused(RefusalReason::AccountNotReady)
        | ServiceError::Forbidden { .. }
        | ServiceError::Review(ReviewError::NotTeamLeader)
        | ServiceError::Review(ReviewError::AdminOnly) => StatusCode::FORBIDDEN,
        ServiceError::Refused(RefusalReason::AlreadyApplied)
        | ServiceError::Adjudication(AdjudicationError::Conflict(_))
        | ServiceError::Review(ReviewError::AlreadyReviewed)
        | ServiceError::Repository(RepositoryError::Conflict)
        | ServiceError::Repository(RepositoryError::DuplicateApplication)
        | ServiceError::Repository(RepositoryError::ScheduleConflict(_)) => StatusCode::CONFLICT,
        ServiceError::Adjudication(AdjudicationError::Validation(_))
        | ServiceError::Review(ReviewError::EventNotFinished)
        | ServiceError::Review(ReviewError::Validation(_))
        | ServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        ServiceError::Repository(RepositoryError::Unavailable(_))
        | ServiceError::Notification(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let mut payload = json!({
        "code": err.code(),
        "error": err.to_string(),
    });
    let conflicts = match &err {
        ServiceError::Adjudication(AdjudicationError::Conflict(conflict)) => {
            Some(&conflict.conflicts)
        }
        ServiceError::Repository(RepositoryError::ScheduleConflict(conflicts)) => Some(conflicts),
        _ => None,
    };
    if let Some(conflicts) = conflicts {
        payload["conflicts"] = json!(conflicts);
    }

    (status, Json(payload)).into_response()
}
