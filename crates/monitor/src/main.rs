//! `triageq-monitor` -- real-time triage monitor console.
//!
//! Polls the vitals service, sounds escalation alarms, and runs the timed
//! assessment protocol. Commands are read from stdin; type `help` for the
//! list. See [`MonitorConfig::from_env`] for the environment variables.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use triageq_monitor::api::TriageApi;
use triageq_monitor::audio::{CommandPlayer, CuePlayer, SilentPlayer};
use triageq_monitor::config::{LogFormat, MonitorConfig};
use triageq_monitor::console::{ConsoleCommand, HELP};
use triageq_monitor::controller::{self, MonitorError, MonitorHandle};

/// How long to wait for the controller to tear down after shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = MonitorConfig::from_env();
    init_tracing(config.as_ref().map(|c| c.log_format).unwrap_or_default());

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    let api = match TriageApi::new(&config.api_url, config.request_timeout) {
        Ok(api) => api,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build HTTP client");
            std::process::exit(1);
        }
    };

    tracing::info!(
        api_url = %api.api_url(),
        sound_dir = %config.sound_dir.display(),
        player = config.player_cmd.as_deref().unwrap_or("silent"),
        "Starting triageq-monitor",
    );

    let player = config
        .player_cmd
        .as_deref()
        .and_then(|cmd| CommandPlayer::new(cmd, &config.sound_dir));
    match player {
        Some(player) => run(config, api, player).await,
        None => run(config, api, SilentPlayer).await,
    }
}

async fn run<P: CuePlayer>(config: MonitorConfig, api: TriageApi, player: P) {
    let (handle, join) = match controller::spawn(config.settings, api, player) {
        Ok(spawned) => spawned,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start monitor");
            std::process::exit(1);
        }
    };

    if let Err(e) = handle.start_protocol().await {
        tracing::warn!(error = %e, "Could not start assessment protocol");
    }

    let banner = tokio::spawn(print_changes(handle.clone()));

    println!("{HELP}");
    console_loop(&handle).await;

    tracing::info!("Shutting down monitor");
    handle.shutdown();
    banner.abort();
    match tokio::time::timeout(SHUTDOWN_GRACE, join).await {
        Ok(Ok(())) => tracing::info!("Graceful shutdown complete"),
        Ok(Err(e)) => tracing::error!(error = %e, "Monitor task failed"),
        Err(_) => tracing::warn!("Monitor did not stop within the grace period"),
    }
}

/// Read commands until `quit`, end of input, or a termination signal.
async fn console_loop(handle: &MonitorHandle) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            () = &mut shutdown => return,
            line = lines.next_line() => line,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::info!("End of input");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stdin");
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match line.parse::<ConsoleCommand>() {
            Ok(ConsoleCommand::Quit) => return,
            Ok(command) => {
                if let Err(e) = execute(handle, command).await {
                    tracing::error!(error = %e, "Monitor unavailable");
                    return;
                }
            }
            Err(e) => println!("{e}"),
        }
    }
}

async fn execute(handle: &MonitorHandle, command: ConsoleCommand) -> Result<(), MonitorError> {
    match command {
        ConsoleCommand::Hold => handle.set_hold(true)?,
        ConsoleCommand::Resume => handle.set_hold(false)?,
        ConsoleCommand::Vot => {
            if !handle.vot().await? {
                println!("VOT is only available during the occlusion step");
            }
        }
        ConsoleCommand::Start => match handle.start_protocol().await {
            Err(MonitorError::Protocol(e)) => println!("{e}"),
            other => other?,
        },
        ConsoleCommand::Reset => handle.reset_protocol()?,
        ConsoleCommand::Profile(profile) => handle.change_profile(profile)?,
        ConsoleCommand::Inspect(label) => match handle.inspect(label).await? {
            Some(insight) => {
                println!(
                    "{} {:.1} {} [{}]",
                    insight.label,
                    insight.current_value,
                    insight.unit,
                    insight.status.as_str(),
                );
                println!("  {}", insight.definition);
                println!("  {}", insight.interpretation);
                println!("  trend ({} samples): {:?}", insight.history.len(), insight.history);
            }
            None => println!("No samples yet"),
        },
        ConsoleCommand::Status => println!("{}", handle.snapshot().status_line()),
        ConsoleCommand::Help => println!("{HELP}"),
        ConsoleCommand::Quit => {}
    }
    Ok(())
}

/// Print the banner whenever the triage class or protocol step changes.
async fn print_changes(handle: MonitorHandle) {
    let mut snapshots = handle.subscribe();
    let mut shown = None;
    while snapshots.changed().await.is_ok() {
        let snap = snapshots.borrow_and_update().clone();
        let key = (snap.triage.class, snap.protocol.phase);
        if shown != Some(key) {
            shown = Some(key);
            println!("{}", snap.status_line());
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "triageq_monitor=info,triageq_core=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

/// Wait for SIGINT (Ctrl-C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT (Ctrl-C)"),
        () = terminate => tracing::info!("Received SIGTERM"),
    }
}
