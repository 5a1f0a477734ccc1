//! Polls a scripted scan until it completes, including one relaunch.
//!
//! Run with: cargo run --example basic_poll

use scanpoll::backends::MockBackend;
use scanpoll::callback::RecordingNotifier;
use scanpoll::prelude::*;
use scanpoll::report::RecordingReportTrigger;

use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== Scanpoll Basic Poll Example ===\n");

    // The vendor reports a time limit once, then the relaunched scan runs to completion.
    let backend = MockBackend::new()
        .with_name("example-vendor")
        .with_statuses(["RUNNING", "TIME_LIMIT_EXCEEDED", "SUBMITTED", "RUNNING", "FINISHED"])
        .with_latency(Duration::from_millis(20));
    let notifier = Arc::new(RecordingNotifier::new());

    let registry = PollerRegistry::builder()
        .with_backend(backend)
        .with_arc_notifier(notifier.clone())
        .with_report_trigger(RecordingReportTrigger::new().with_report_path("/reports/job-1.pdf"))
        .with_config(
            PollerConfig::new("vendor.example.com")
                .with_initial_delay(Duration::from_millis(100))
                .with_poll_interval(Duration::from_millis(200))
                .with_relaunch_policy(
                    RelaunchPolicy::new().with_initial_delay(Duration::from_millis(100)),
                ),
        )
        .build()?;

    let job = ScanJob::new(
        "job-1",
        "app-1",
        ScanConfig::new("https://example.com", "default-profile").with_progressive_scan(true),
    )
    .with_scanner_scan_id("4711");

    registry.activate_default(job)?;
    println!("Polling job-1 (active: {})", registry.is_active("job-1"));

    registry.wait_until_inactive("job-1").await;

    println!("\n=== Status Updates ===");
    for update in notifier.status_updates() {
        println!(
            "{} scan={} report={}",
            update.status,
            update.scanner_scan_id.as_deref().unwrap_or("-"),
            update.report_path.as_deref().unwrap_or("-")
        );
    }

    println!("\n=== Job Log ===");
    for log in notifier.logs() {
        println!("[{}] {}", log.severity, log.message);
    }

    Ok(())
}
