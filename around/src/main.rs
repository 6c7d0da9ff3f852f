use std::fs;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info};

use around::cli::{Cli, Command, OutputFormat, Switch, get_log_path};
use around::config::Config;
use around::coordinator::ReminderEvent;
use around::domain::{Coordinate, HomeGeofence};
use around::error::ReminderError;
use around::prefs::{FilePreferenceStore, Preferences};
use around::sim::{LogNotificationSink, RecordingNotificationSink, Scenario, ScenarioReport};
use around::sources::NotificationSink;

fn setup_logging(verbose: bool) -> Result<()> {
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Log to file only; stdout belongs to command output
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .context("Failed to open log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(
        threshold = config.reminder.threshold,
        radius = config.geofence.radius_degrees,
        preferences = %config.storage.preferences_path.display(),
        "Around loaded config"
    );

    match cli.command {
        Command::Simulate { scenario, format } => cmd_simulate(&config, scenario, format).await,
        Command::Status { format } => cmd_status(&config, format),
        Command::SetHome { latitude, longitude } => cmd_set_home(&config, latitude, longitude),
        Command::ClearHome => cmd_clear_home(&config),
        Command::Tracking { state } => cmd_tracking(&config, state),
        Command::Logs { lines } => cmd_logs(lines),
    }
}

fn open_preferences(config: &Config) -> Result<Preferences> {
    let store = FilePreferenceStore::open(&config.storage.preferences_path)?;
    debug!(path = %store.path().display(), "Opened preference store");
    Ok(Preferences::new(Arc::new(store)))
}

async fn cmd_simulate(config: &Config, path: PathBuf, format: OutputFormat) -> Result<()> {
    let scenario = Scenario::from_file(&path)?;
    // Keep stdout parseable in json mode
    let notifier: Arc<dyn NotificationSink> = match format {
        OutputFormat::Json => Arc::new(RecordingNotificationSink::new()),
        OutputFormat::Text => Arc::new(LogNotificationSink),
    };
    let report = scenario.run(config, notifier).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report(&report),
    }
    Ok(())
}

fn print_report(report: &ScenarioReport) {
    let name = report.name.as_deref().unwrap_or("scenario");
    println!("{} ({} steps)", name.bold(), report.steps);
    println!("-----------------");

    for event in &report.events {
        println!("  {}", describe(event));
    }
    for rejection in &report.rejected {
        println!("  {} {}", "rejected".red(), rejection);
    }

    let snapshot = &report.snapshot;
    println!();
    println!("Authorization: {}", snapshot.authorization);
    println!("Tracking: {}", if snapshot.tracking_enabled { "on" } else { "off" });
    println!("Reminders sent: {}", snapshot.reminders_sent);
}

fn describe(event: &ReminderEvent) -> String {
    match event {
        ReminderEvent::AuthorizationChanged { from, to } => format!("authorization {} -> {}", from, to),
        ReminderEvent::TrackingChanged { enabled } => {
            format!("tracking {}", if *enabled { "enabled" } else { "disabled" })
        }
        ReminderEvent::HomeChanged { home: Some(home) } => format!("home set to {}", home.center),
        ReminderEvent::HomeChanged { home: None } => "home cleared".to_string(),
        ReminderEvent::Geofence { transition } => format!("geofence {:?}", transition),
        ReminderEvent::MotionTrackingStarted => "motion tracking started".to_string(),
        ReminderEvent::MotionTrackingStopped => "motion tracking stopped".to_string(),
        ReminderEvent::Motion { transition } => format!("motion {:?}", transition),
        ReminderEvent::ScreenTimerStarted => "screen timer started".to_string(),
        ReminderEvent::ScreenTimerStopped => "screen timer stopped".to_string(),
        ReminderEvent::ReminderSent { id } => format!("{} {}", "reminder sent".green(), id),
        ReminderEvent::SourceFailed { source, error } => format!("{} {}: {}", "source failed".yellow(), source, error),
    }
}

fn cmd_status(config: &Config, format: OutputFormat) -> Result<()> {
    let prefs = open_preferences(config)?;
    let tracking = prefs.tracking_enabled();
    let home = prefs
        .home()
        .map(|center| HomeGeofence::new(center, config.geofence.radius_degrees));

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "tracking-enabled": tracking,
                "home": home,
                "threshold": config.reminder.threshold,
                "tick-interval-ms": config.reminder.tick_interval_ms,
                "preferences-path": config.storage.preferences_path.to_string_lossy(),
                "log-path": get_log_path().to_string_lossy(),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!("Around Status");
            println!("-------------");
            println!("Tracking: {}", if tracking { "on".green() } else { "off".dimmed() });
            match home {
                Some(home) => println!("Home: {} (radius {} deg)", home.center, home.radius_degrees),
                None => println!("Home: not set"),
            }
            println!(
                "Reminder: after {} x {}ms unlocked while walking",
                config.reminder.threshold, config.reminder.tick_interval_ms
            );
            println!("Preferences: {}", config.storage.preferences_path.display());
        }
    }
    Ok(())
}

fn cmd_set_home(config: &Config, latitude: f64, longitude: f64) -> Result<()> {
    let coordinate = Coordinate::new(latitude, longitude);
    if !coordinate.is_valid() {
        return Err(ReminderError::InvalidCoordinate(coordinate).into());
    }
    open_preferences(config)?.set_home(coordinate)?;
    println!("Home set to {}", coordinate);
    Ok(())
}

fn cmd_clear_home(config: &Config) -> Result<()> {
    open_preferences(config)?.clear_home()?;
    println!("Home cleared");
    Ok(())
}

fn cmd_tracking(config: &Config, state: Switch) -> Result<()> {
    open_preferences(config)?.set_tracking_enabled(state.enabled())?;
    println!("Tracking {}", if state.enabled() { "on" } else { "off" });
    Ok(())
}

fn cmd_logs(lines: usize) -> Result<()> {
    let log_path = get_log_path();

    if !log_path.exists() {
        println!("No log file found at: {}", log_path.display());
        return Ok(());
    }

    let file = fs::File::open(&log_path).context("Failed to open log file")?;
    let reader = BufReader::new(file);
    let all_lines: Vec<String> = reader.lines().map_while(Result::ok).collect();

    let start = all_lines.len().saturating_sub(lines);
    for line in &all_lines[start..] {
        println!("{}", line);
    }

    Ok(())
}
