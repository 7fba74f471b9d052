use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryNotificationPublisher, InMemoryStaffingRepository};
use crate::routes::with_staffing_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use gatherly::config::AppConfig;
use gatherly::error::AppError;
use gatherly::staffing::roster::import_events_from_path;
use gatherly::staffing::StaffingService;
use gatherly::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = match args.events.take() {
        Some(path) => {
            let events = import_events_from_path(&path)?;
            info!(count = events.len(), path = %path.display(), "seeded events from export");
            InMemoryStaffingRepository::with_events(events)
        }
        None => InMemoryStaffingRepository::default(),
    };
    let notifications = Arc::new(InMemoryNotificationPublisher::default());
    let staffing_service = Arc::new(StaffingService::new(
        Arc::new(repository),
        notifications,
        config.staffing.transportation_policy(),
    ));

    let app = with_staffing_routes(staffing_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        ride_downgrade_ratio = config.staffing.ride_downgrade_ratio,
        "staffing service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
