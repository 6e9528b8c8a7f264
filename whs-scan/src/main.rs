//! Operator console (whs-scan) - Main entry point
//!
//! Drives the scan workflow from stdin: `:`-commands stand in for the
//! handset's buttons, every other line is decoded camera text. Workflow
//! events are printed as they are published.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use whs_common::api::{Mode, StatsToday};
use whs_common::config::{
    load_toml_config, resolve_config_path, resolve_ledger_url, resolve_request_timeout,
    LoggingConfig,
};
use whs_common::events::{EventBus, ScanEvent};
use whs_scan::console::{describe_state, render_event, ConsoleCommand, HELP};
use whs_scan::feedback::LogFeedback;
use whs_scan::role::RolePreference;
use whs_scan::stats::{action_order, StatsRefresher};
use whs_scan::{DecodedFrame, HttpLedger, Ledger, ScanController};

const EVENT_BUS_CAPACITY: usize = 256;
const FRAME_QUEUE: usize = 64;

/// Command-line arguments for whs-scan
#[derive(Parser, Debug)]
#[command(name = "whs-scan")]
#[command(about = "Warehouse QR scan workflow console")]
#[command(version)]
struct Args {
    /// Ledger service base URL
    #[arg(long, env = "WHS_LEDGER_URL")]
    ledger_url: Option<String>,

    /// Config file (default: ~/.config/whs/whs-scan.toml)
    #[arg(short, long, env = "WHS_CONFIG")]
    config: Option<PathBuf>,

    /// Start in this mode (receive, ship, move)
    #[arg(short, long)]
    mode: Option<String>,

    /// Role preference file (default: <data dir>/whs/role.toml)
    #[arg(long)]
    role_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref(), "whs-scan");
    let toml_config = load_toml_config(&config_path);
    init_tracing(&toml_config.logging)?;
    let ledger_url = resolve_ledger_url(args.ledger_url.as_deref(), &toml_config)
        .context("Invalid ledger URL")?;
    let timeout = resolve_request_timeout(&toml_config);

    info!(
        ledger_url = %ledger_url,
        timeout_secs = timeout.as_secs(),
        station = toml_config.station_id.as_deref().unwrap_or("-"),
        "Starting WHS scan console"
    );

    let ledger: Arc<dyn Ledger> = Arc::new(
        HttpLedger::new(ledger_url, timeout).context("Failed to build ledger client")?,
    );

    let role_pref = RolePreference::new(
        args.role_file
            .clone()
            .unwrap_or_else(RolePreference::default_path),
    );
    let mut role = role_pref.load();
    info!(role = ?role, "Operator role loaded");

    let event_bus = EventBus::new(EVENT_BUS_CAPACITY);
    let controller = Arc::new(ScanController::new(
        Arc::clone(&ledger),
        Arc::new(LogFeedback),
        event_bus.clone(),
        &toml_config.timing,
    ));
    let shutdown = CancellationToken::new();

    // Printer: show events, remember latest counters for action ordering
    let (stats_tx, stats_rx) = watch::channel::<Option<StatsToday>>(None);
    let printer = tokio::spawn(print_events(event_bus.clone(), stats_tx, shutdown.clone()));

    let refresher = StatsRefresher::new(
        Arc::clone(&ledger),
        event_bus.clone(),
        toml_config.timing.stats_refresh(),
    );
    let refresher = tokio::spawn(refresher.run(shutdown.clone()));

    let (frame_tx, frame_rx) = mpsc::channel(FRAME_QUEUE);
    let runner = tokio::spawn(Arc::clone(&controller).run(frame_rx, shutdown.clone()));

    tokio::spawn(cancel_on_signal(shutdown.clone()));

    match args.mode.as_deref().map(|m| (m, Mode::parse(m))) {
        Some((_, Some(mode))) => controller.select_mode(Some(mode)).await,
        Some((name, None)) => warn!(mode = %name, "Ignoring unknown start mode"),
        None => print_actions(&stats_rx.borrow()),
    }
    println!("Type :help for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!(error = %e, "Failed to read stdin");
                break;
            }
        };

        let command = match ConsoleCommand::parse(&line) {
            None => continue,
            Some(Ok(command)) => command,
            Some(Err(e)) => {
                println!("{}", e);
                continue;
            }
        };

        match command {
            ConsoleCommand::Frame(text) => match controller.camera_generation().await {
                Some(generation) => {
                    if frame_tx.send(DecodedFrame { generation, text }).await.is_err() {
                        break;
                    }
                }
                None => println!("Camera is off (:camera on)"),
            },
            ConsoleCommand::SelectMode(mode) => {
                controller.select_mode(Some(mode)).await;
                print_prompt(&controller).await;
            }
            ConsoleCommand::Back => {
                controller.back_to_actions().await;
                print_actions(&stats_rx.borrow());
            }
            ConsoleCommand::CameraOn => {
                if controller.start_camera().await.is_ok() {
                    print_prompt(&controller).await;
                }
            }
            ConsoleCommand::CameraOff => controller.stop_camera().await,
            ConsoleCommand::SubmitBox(box_id) => {
                controller.submit_box(&box_id).await;
            }
            ConsoleCommand::Undo => {
                let _ = controller.undo().await;
            }
            ConsoleCommand::ClearLocation => controller.clear_pending_location().await,
            ConsoleCommand::Dismiss => {
                controller.dismiss_confirmation().await;
                print_prompt(&controller).await;
            }
            ConsoleCommand::Resolve(choice) => {
                if let Err(e) = controller.resolve_occupancy(choice).await {
                    println!("{}", e);
                }
            }
            ConsoleCommand::SetRole(new_role) => match role_pref.save(new_role) {
                Ok(()) => {
                    role = new_role;
                    println!("Role: {:?}", role);
                }
                Err(e) => println!("Failed to save role: {}", e),
            },
            ConsoleCommand::Status => {
                println!("{}", describe_state(&controller.state().await, role));
            }
            ConsoleCommand::Help => println!("{}", HELP),
            ConsoleCommand::Quit => break,
        }
    }

    shutdown.cancel();
    drop(frame_tx);
    for (name, task) in [("controller", runner), ("stats", refresher), ("printer", printer)] {
        if let Err(e) = task.await {
            warn!(task = name, error = %e, "Task ended abnormally");
        }
    }

    info!("Scan console shutdown complete");
    Ok(())
}

async fn print_events(
    event_bus: EventBus,
    stats_tx: watch::Sender<Option<StatsToday>>,
    shutdown: CancellationToken,
) {
    let mut rx = event_bus.subscribe();
    loop {
        let received = tokio::select! {
            _ = shutdown.cancelled() => break,
            received = rx.recv() => received,
        };
        match received {
            Ok(event) => {
                if let ScanEvent::StatsUpdated { stats, .. } = &event {
                    let _ = stats_tx.send(Some(stats.clone()));
                }
                if let Some(line) = render_event(&event) {
                    println!("{}", line);
                }
            }
            Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Console fell behind event bus");
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn print_prompt(controller: &ScanController) {
    if let Some(prompt) = controller.prompt().await {
        println!("{}\n  {}", prompt.title, prompt.instruction);
    }
}

fn print_actions(stats: &Option<StatsToday>) {
    let actions: Vec<String> = action_order(stats.as_ref())
        .iter()
        .map(|mode| format!(":mode {}", mode.to_string().to_lowercase()))
        .collect();
    println!("Choose an action: {}", actions.join("  "));
}

/// Cancel `shutdown` on Ctrl+C or SIGTERM
async fn cancel_on_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
        _ = shutdown.cancelled() => {}
    }
    shutdown.cancel();
}

/// RUST_LOG wins; otherwise the configured level applies to the WHS crates
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("whs_scan={0},whs_common={0}", logging.level).into()
    });

    let writer = match &logging.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(writer))
        .init();
    Ok(())
}
