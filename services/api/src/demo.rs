use crate::infra::{InMemoryNotificationPublisher, InMemoryStaffingRepository};
use chrono::Duration;
use clap::Args;
use gatherly::config::StaffingConfig;
use gatherly::error::AppError;
use gatherly::staffing::roster::{import_events, import_events_from_path, RosterView};
use gatherly::staffing::{
    AdminDecision, ApplicationDraft, Eligibility, EventId, HostId, ServiceError, Session,
    StaffRole, StaffingService, TransportationPlan, TransportationPolicy, Trip, UserRole,
};
use std::path::PathBuf;
use std::sync::Arc;

const DEMO_EVENTS: &str = "\
id,title,type,starts_at,ends_at,date,nb_of_hosts,accepted_hosts_count,status
evt-launch,Product Launch,corporate,2026-01-15T18:00:00Z,2026-01-15T23:00:00Z,,10,0,accepted
evt-gala,Winter Gala,luxury,2026-01-15T20:00:00Z,2026-01-15T22:00:00Z,,4,0,accepted
evt-summit,Tech Summit,corporate,2026-01-10T09:00:00Z,2026-01-10T18:00:00Z,,6,2,accepted
evt-dinner,Partner Dinner,luxury_gala,,,2026-02-01,2,0,pending
";

#[derive(Args, Debug)]
pub(crate) struct RosterArgs {
    /// Event CSV export (id,title,type,starts_at,ends_at,date,nb_of_hosts,...)
    #[arg(long)]
    pub(crate) events: PathBuf,
    /// Category filter; `all` keeps every event
    #[arg(long, default_value = "all")]
    pub(crate) category: String,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Override the shuttle downgrade ratio (0 < ratio <= 1)
    #[arg(long)]
    pub(crate) ride_downgrade_ratio: Option<f64>,
    /// Category filter applied to the closing roster
    #[arg(long, default_value = "all")]
    pub(crate) category: String,
}

impl Default for DemoArgs {
    fn default() -> Self {
        Self {
            ride_downgrade_ratio: None,
            category: "all".to_string(),
        }
    }
}

pub(crate) fn run_roster_report(args: RosterArgs) -> Result<(), AppError> {
    let RosterArgs { events, category } = args;
    let listings = import_events_from_path(&events)?;
    let view = gatherly::staffing::aggregate(&listings, &category);
    println!("Roster for {}", events.display());
    render_roster(&view, &category);
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        ride_downgrade_ratio,
        category,
    } = args;

    let ratio = ride_downgrade_ratio.unwrap_or(StaffingConfig::DEFAULT_RIDE_DOWNGRADE_RATIO);
    let events = import_events(DEMO_EVENTS.as_bytes())?;
    let repository = Arc::new(InMemoryStaffingRepository::with_events(events));
    let notifications = Arc::new(InMemoryNotificationPublisher::default());
    let service = StaffingService::new(
        repository,
        notifications.clone(),
        TransportationPolicy::new(ratio),
    );
    let admin = Session::admin("admin-demo");
    let launch = EventId("evt-launch".to_string());
    let gala = EventId("evt-gala".to_string());

    println!("Gatherly staffing demo");

    println!("\nOnboarding");
    let host_id = HostId("host-camille".to_string());
    service.sign_up(
        host_id.clone(),
        Some("M".to_string()),
        vec!["English".to_string(), "French".to_string()],
    )?;
    println!("- {} signed up -> {}", host_id, service.lifecycle(&host_id)?.label());

    let session = service.resolve_session(&host_id.0, UserRole::Host)?;
    let verdict = service.eligibility(Some(&session), &launch)?;
    if let Some(reason) = verdict.reason {
        println!("  Apply to {launch}: {} ({})", reason.code(), reason.message());
    }

    service.accept_code_of_conduct(&session, &host_id)?;
    println!("- code of conduct accepted -> {}", service.lifecycle(&host_id)?.label());
    service.set_eligibility(&admin, &host_id, Eligibility::Approved)?;
    println!("- admin approved -> {}", service.lifecycle(&host_id)?.label());
    service.set_active(&admin, &host_id, true)?;
    println!("- admin activated -> {}", service.lifecycle(&host_id)?.label());

    println!("\nApplications");
    let session = service.resolve_session(&host_id.0, UserRole::Host)?;
    let draft = ApplicationDraft {
        requested_role: StaffRole::Host,
        request_dress: true,
        needs_ride: true,
    };
    let launch_application = service.submit_application(Some(&session), &launch, draft.clone())?;
    let gala_application = service.submit_application(Some(&session), &gala, draft.clone())?;
    println!(
        "- submitted {} for {launch} and {} for {gala}",
        launch_application.id, gala_application.id
    );
    match service.submit_application(Some(&session), &launch, draft) {
        Err(ServiceError::Refused(reason)) => {
            println!("- second application to {launch} refused: {}", reason.code())
        }
        Ok(application) => println!("- unexpected duplicate {}", application.id),
        Err(err) => return Err(err.into()),
    }

    println!("\nAdjudication");
    let applied = service.decide_application(
        &admin,
        &launch_application.id,
        AdminDecision::Accept {
            role: Some(StaffRole::TeamLeader),
        },
    )?;
    println!(
        "- {} -> {} as {}",
        applied.application.id,
        applied.application.status.label(),
        applied
            .application
            .assigned_role
            .map(StaffRole::label)
            .unwrap_or("-")
    );
    match service.decide_application(
        &admin,
        &gala_application.id,
        AdminDecision::Accept { role: None },
    ) {
        Err(err @ ServiceError::Adjudication(_)) => {
            println!("- {} refused: {} ({})", gala_application.id, err.code(), err)
        }
        Ok(applied) => println!("- {} accepted", applied.application.id),
        Err(err) => return Err(err.into()),
    }

    println!("\nTransportation");
    let plan = service.transportation(&launch)?;
    render_plan(&plan);
    let launch_window = service
        .roster("all")?
        .sorted
        .into_iter()
        .find(|event| event.id == launch)
        .and_then(|event| event.schedule);
    if let Some(window) = launch_window {
        let trip = Trip {
            pickup_location: "Gare de Lyon".to_string(),
            departure_time: window.starts_at() - Duration::hours(1),
            return_time: window.ends_at() + Duration::hours(1),
            payment: "agency".to_string(),
        };
        let plan = service.add_trip(&admin, &launch, trip)?;
        println!("- shuttle booked");
        render_plan(&plan);
    }

    println!("\nNotifications");
    for notice in notifications.notices() {
        println!(
            "- {} -> {} ({})",
            notice.template, notice.host_id, notice.application_id
        );
    }

    println!();
    render_roster(&service.roster(&category)?, &category);
    Ok(())
}

fn render_plan(plan: &TransportationPlan) {
    println!(
        "- {}: {} of {} seats needed ({:.0}%) | downgrade suggested: {} | available: {}",
        plan.event_id,
        plan.actual_needed_seats,
        plan.worst_case_seats,
        plan.seat_usage_percent,
        if plan.downgrade_suggested { "yes" } else { "no" },
        if plan.available { "yes" } else { "no" }
    );
}

fn render_roster(view: &RosterView, category: &str) {
    let stats = &view.stats;
    println!(
        "Events: {} active | {} pending | {} confirmed | {} hosts needed",
        stats.active_events, stats.pending_requests, stats.confirmed_events, stats.hosts_needed
    );

    println!("Schedule:");
    for event in &view.sorted {
        let when = match (event.schedule, event.date_label.as_deref()) {
            (Some(window), _) => window.starts_at().format("%Y-%m-%d %H:%M").to_string(),
            (None, Some(label)) => label.to_string(),
            (None, None) => "unscheduled".to_string(),
        };
        println!(
            "  - {when} | {} [{}] {}",
            event.title,
            event.event_type,
            event.status.label()
        );
    }

    println!("Coverage ({category}):");
    if view.coverage.is_empty() {
        println!("  - no events match");
    }
    for entry in &view.coverage {
        println!(
            "  - {} ({}): {}/{} hosts ({:.0}%)",
            entry.title, entry.category, entry.accepted, entry.required, entry.coverage_percent
        );
    }
}
