use anyhow::{bail, Context, Result};
use clap::Parser;
use daywatch::{
    platforms, Credentials, Profile, ProcessTable, RunController, RunOutcome,
    SystemProcessTable, TelegramNotifier, WatchSettings, Watcher,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

mod utils;

use crate::utils::{init_logging, stop_leftovers, tomorrow};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Logs into the banking client unattended and reports when its business date rolls over"
)]
struct Args {
    /// JSON profile overriding window titles, selectors, timings and retry policy
    #[arg(short, long)]
    profile: Option<PathBuf>,

    /// Business date to wait for, as shown by the client (default: tomorrow)
    #[arg(short, long)]
    expected: Option<String>,

    /// Run the workflow once and exit instead of polling
    #[arg(long)]
    once: bool,

    /// Seconds between polls that did not reach the expected date
    #[arg(long, default_value = "60")]
    poll_interval: u64,

    /// Notification text sent once the date is reached
    #[arg(long, default_value = "Business day has rolled over")]
    message: String,

    /// How many times the notification is sent
    #[arg(long, default_value = "1")]
    repeat: u32,

    /// Print the effective profile as JSON and exit
    #[arg(long)]
    print_profile: bool,

    #[arg(long, env = "DAYWATCH_USERNAME", hide_env_values = true)]
    username: Option<String>,

    #[arg(long, env = "DAYWATCH_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[arg(long, env = "TELEGRAM_TOKEN", hide_env_values = true)]
    telegram_token: Option<String>,

    #[arg(long, env = "TELEGRAM_CHAT_ID")]
    telegram_chat_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    init_logging()?;

    let profile = match &args.profile {
        Some(path) => Profile::from_json_file(path)
            .with_context(|| format!("Failed to load profile {}", path.display()))?,
        None => Profile::default(),
    };
    if args.print_profile {
        println!("{}", serde_json::to_string_pretty(&profile)?);
        return Ok(());
    }

    let (Some(username), Some(password)) = (args.username.clone(), args.password.clone()) else {
        bail!("DAYWATCH_USERNAME and DAYWATCH_PASSWORD must be set");
    };
    let expected = args.expected.clone().unwrap_or_else(tomorrow);
    info!(expected = %expected, once = args.once, "starting daywatch");

    let backend = platforms::create_backend().context("Failed to initialize the GUI backend")?;
    let processes: Arc<dyn ProcessTable> = Arc::new(SystemProcessTable::new());
    let process_name = profile.process_name.clone();
    let controller = RunController::new(
        Credentials::new(username, password),
        expected,
        profile,
        backend,
        processes.clone(),
    );

    if args.once {
        return run_once(controller).await;
    }

    let (Some(token), Some(chat_id)) = (args.telegram_token.clone(), args.telegram_chat_id.clone())
    else {
        bail!("TELEGRAM_TOKEN and TELEGRAM_CHAT_ID must be set unless --once is used");
    };
    let notifier = TelegramNotifier::new(token, chat_id)?;
    let settings = WatchSettings {
        poll_interval: Duration::from_secs(args.poll_interval),
        message: args.message.clone(),
        repeat: args.repeat,
        ..WatchSettings::default()
    };
    let mut watcher = Watcher::new(controller, notifier, settings);

    tokio::select! {
        result = watcher.run() => {
            let outcome = result?;
            info!(?outcome, "watch finished");
        }
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, stopping watch");
            // A run in progress cannot be interrupted; close the client it
            // drives and exit without waiting for the blocking task.
            stop_leftovers(processes, &process_name);
            std::process::exit(130);
        }
    }
    Ok(())
}

async fn run_once(mut controller: RunController) -> Result<()> {
    let outcome = tokio::task::spawn_blocking(move || controller.run()).await?;
    match outcome {
        RunOutcome::Success { matched } => {
            println!("{}", if matched { "reached" } else { "not reached" });
            Ok(())
        }
        RunOutcome::Retry(reason) => {
            error!(reason = %reason, "run gave up");
            bail!("run gave up: {reason}")
        }
        RunOutcome::Fatal(reason) => bail!("run failed: {reason}"),
    }
}
