//! EduTrace - Offline-first attendance tracking demo.
//!
//! Drives the core workflow end to end with simulated collaborators: login,
//! capture, detection, review, save, and a sync run with a forced failure
//! and retry. Real detector/auth/transport integrations plug in through the
//! same traits the simulations implement.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{Local, NaiveTime};
use clap::Parser;
use edutrace as app;

use app::auth::{Authenticator, Credentials};
use app::config::{AppConfig, ConfigLoadResult};
use app::detect::{CapturedImage, Detector, FaceMatch};
use app::geo::{GeoPoint, LocationProvider, classify_presence};
use app::models::{AttendanceStatus, Roster, Student, SyncItemKind};
use app::queue::{SyncProgress, SyncService, run_sync_background};
use app::report::{self, DailyClassAttendance};
use app::session::AttendanceSession;
use app::sim::{SimulatedAuthenticator, SimulatedDetector, SimulatedLocationProvider, SimulatedTransmitter};

/// Offline-first attendance tracking demo.
#[derive(Parser)]
#[command(name = "edutrace")]
struct Cli {
    /// Use config.toml from current directory (dev mode)
    #[arg(long)]
    dev: bool,

    /// Class to take attendance for
    #[arg(long, default_value = "Class 10A")]
    class: String,

    /// Directory to write an Excel report into
    #[arg(long)]
    export: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    tracing::info!("EduTrace starting...");

    // Determine config path based on mode
    let config_path = if cli.dev {
        tracing::info!("Dev mode: loading config from current directory");
        PathBuf::from("config.toml")
    } else {
        AppConfig::default_path()
    };

    let config = match AppConfig::try_load(&config_path) {
        ConfigLoadResult::Loaded(config) => {
            tracing::info!("Config loaded from {config_path:?}");
            config
        }
        ConfigLoadResult::Missing => {
            tracing::warn!("Config missing at {config_path:?}, using defaults");
            AppConfig::default()
        }
        ConfigLoadResult::Invalid(e) => {
            anyhow::bail!("config at {config_path:?} is invalid: {e}");
        }
    };

    let rt = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    rt.block_on(run_demo(config, cli))
}

/// Demo roster for one class; in a real deployment this comes from
/// enrollment.
fn demo_roster() -> Roster {
    let students = vec![
        Student::new("s1", "Asha Verma", "001"),
        Student::new("s2", "Kiran Joshi", "002"),
        Student::new("s3", "Meera Nair", "003"),
        Student::new("s4", "Rohan Gupta", "004"),
        Student::new("s5", "Tanvi Iyer", "005"),
        Student::new("s6", "Dev Malhotra", "006"),
    ];
    Roster::new(students).expect("demo roster is well formed")
}

async fn run_demo(config: AppConfig, cli: Cli) -> anyhow::Result<()> {
    let latency = Duration::from_millis(config.sync.simulated_latency_ms);

    // Login
    let authenticator = SimulatedAuthenticator::new(latency);
    let user = authenticator
        .authenticate(&Credentials::new("T-102", "demo-secret"))
        .await
        .context("login failed")?;
    tracing::info!("Signed in as {} ({})", user.display_name, user.role.display_name());

    // Capture and detection
    let roster = demo_roster();
    let today = Local::now().date_naive();
    let mut session = AttendanceSession::new(roster, today);
    session.start_capture(&cli.class)?;

    let detector = SimulatedDetector::new(
        vec![
            FaceMatch::new("s1", 0.95),
            FaceMatch::new("s2", 0.88),
            FaceMatch::new("s3", 0.92),
            FaceMatch::new("s4", 0.85),
        ],
        latency,
    );
    let outcome = detector.detect(&CapturedImage::new("classroom.jpg")).await?;
    tracing::info!("{} students identified in the image", outcome.detected_count);
    session.complete_detection(outcome)?;

    // Review: one correction before saving
    session.proceed_to_review()?;
    session.set_status("s5", AttendanceStatus::Present)?;
    tracing::info!(
        "Review: {}/{} present, rate {}%",
        session.present_count(),
        session.roster().len(),
        session.attendance_rate()
    );

    // Save hands one pending item to the queue
    let service = Arc::new(SyncService::new(SimulatedTransmitter::new(latency)));
    let saved_records = {
        let queue = service.queue();
        let mut queue = queue.lock().await;
        session.save(&mut queue)?;
        session.records()
    };
    service.enqueue(SyncItemKind::Report, &cli.class, today).await;

    // Sync everything, streaming progress events
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let sync_task = tokio::spawn(run_sync_background(Arc::clone(&service), tx));
    while let Some(event) = rx.recv().await {
        match event {
            SyncProgress::Started => tracing::info!("Sync started"),
            SyncProgress::Progress { percent, message } => {
                tracing::info!("[{:>3.0}%] {message}", percent * 100.0);
            }
            SyncProgress::Completed { report, .. } => tracing::info!("{}", report.summary()),
            SyncProgress::Error(e) => tracing::warn!("Sync finished with failures: {e}"),
        }
    }
    sync_task.await.context("sync task panicked")?;

    // Anything failed stays queryable and retryable
    if service.failed_count().await > 0 {
        let moved = service.retry_failed().await;
        tracing::info!("Requeued {moved} failed items");
        let report = service.sync_all().await;
        tracing::info!("Retry run: {}", report.summary());
    }

    // Reporting
    let day = DailyClassAttendance::new(
        &cli.class,
        today,
        saved_records
            .iter()
            .filter(|r| r.status == AttendanceStatus::Present)
            .count(),
        saved_records.len(),
    );
    let summary = report::summarize(std::slice::from_ref(&day));
    tracing::info!(
        "Report: {} session(s), average rate {}%",
        summary.total_sessions,
        summary.average_rate
    );

    if let Some(dir) = &cli.export {
        let path = dir.join(app::export::generate_export_filename("attendance"));
        app::export::export_attendance_summary_to_excel(std::slice::from_ref(&day), &path)
            .context("Excel export failed")?;
        tracing::info!("Report exported to {path:?}");
    }

    // Teacher geofence check against the configured school location
    let fence = config.school.geofence();
    let late_after = config
        .school
        .late_after_time()
        .unwrap_or_else(|| NaiveTime::from_hms_opt(9, 0, 0).expect("valid fallback time"));
    let provider = SimulatedLocationProvider::fixed(GeoPoint::new(
        config.school.latitude + 0.0001,
        config.school.longitude + 0.0001,
        5.0,
    ));
    match provider.current_location().await {
        Ok(point) => {
            let presence = classify_presence(Some(Local::now().time()), Some(&point), &fence, late_after);
            tracing::info!(
                "Teacher location: {:.0} m from {} -> {}",
                fence.distance_to(&point),
                config.school.name,
                presence.as_str()
            );
        }
        Err(e) => tracing::warn!("Teacher tracking skipped: {e}"),
    }

    Ok(())
}
