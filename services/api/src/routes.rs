use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use gatherly::error::AppError;
use gatherly::staffing::roster::{aggregate, import_events, RosterView};
use gatherly::staffing::{
    staffing_router, NotificationPublisher, StaffingRepository, StaffingService,
};
use serde::Deserialize;
use serde_json::json;
use std::io::Cursor;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub(crate) struct RosterReportRequest {
    /// CSV export with the event roster headers.
    pub(crate) events_csv: String,
    #[serde(default)]
    pub(crate) category: Option<String>,
}

pub(crate) fn with_staffing_routes<R, N>(service: Arc<StaffingService<R, N>>) -> axum::Router
where
    R: StaffingRepository + 'static,
    N: NotificationPublisher + 'static,
{
    staffing_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/roster/report",
            axum::routing::post(roster_report_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Roster for an uploaded export, without touching the live store.
pub(crate) async fn roster_report_endpoint(
    Json(payload): Json<RosterReportRequest>,
) -> Result<Json<RosterView>, AppError> {
    let RosterReportRequest {
        events_csv,
        category,
    } = payload;

    let events = import_events(Cursor::new(events_csv.into_bytes()))?;
    let category = category.unwrap_or_else(|| "all".to_string());
    Ok(Json(aggregate(&events, &category)))
}
