use anyhow::Result;
use chrono::{Local, NaiveDate};
use daywatch::process::SweepReport;
use daywatch::{ProcessManager, ProcessTable};
use std::env;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

pub fn init_logging() -> Result<()> {
    let log_level = env::var("LOG_LEVEL")
        .map(|level| match level.to_lowercase().as_str() {
            "error" => Level::ERROR,
            "warn" => Level::WARN,
            "info" => Level::INFO,
            "debug" => Level::DEBUG,
            "trace" => Level::TRACE,
            _ => Level::INFO,
        })
        .unwrap_or(Level::INFO);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    Ok(())
}

/// Terminate every instance of the client left behind by an interrupted run
pub fn stop_leftovers(processes: Arc<dyn ProcessTable>, process_name: &str) -> SweepReport {
    let report = ProcessManager::new(processes).kill_all_by_name(process_name);
    if report.skipped.is_empty() {
        info!(terminated = report.terminated.len(), "closed client before exit");
    } else {
        warn!(skipped = ?report.skipped, "some client processes survived shutdown");
    }
    report
}

/// Tomorrow's date the way the client prints it in its status bar
pub fn tomorrow() -> String {
    format_day(Local::now().date_naive().succ_opt())
}

fn format_day(day: Option<NaiveDate>) -> String {
    day.map(|d| d.format("%d.%m.%y").to_string())
        .unwrap_or_default()
}
