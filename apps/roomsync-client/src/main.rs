//! RoomSync Client - headless playback client driven by newline-delimited JSON.
//!
//! Stands in for the transport: authority events, connection signals and
//! local controls are read line by line from a file or stdin and fed into the
//! synchronization engine. Intents the engine sends back to the authority are
//! printed to stdout as JSON lines. Audio is simulated.

mod config;
mod driver;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use roomsync_core::{
    bootstrap_engine, AudioBackendChoice, BootstrapOptions, ChannelTransport, OutboundIntent,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::mpsc;

use crate::config::ClientConfig;

/// RoomSync Client - Headless multi-room playback client.
#[derive(Parser, Debug)]
#[command(name = "roomsync-client")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Input file with one JSON message per line. Reads stdin when omitted.
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "ROOMSYNC_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Output zone whose latency compensates synchronized starts (overrides config file).
    #[arg(short = 'z', long, env = "ROOMSYNC_OUTPUT_ZONE")]
    zone: Option<String>,

    /// Data directory for persistent state (zone latency).
    #[arg(short = 'd', long, env = "ROOMSYNC_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Keep running after the input ends, until Ctrl+C.
    #[arg(short = 'k', long)]
    keep_alive: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging (stderr; stdout carries intents)
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("RoomSync Client v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        ClientConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(zone) = args.zone {
        config.output_zone = Some(zone);
    }
    if let Some(data_dir) = args.data_dir {
        config.data_dir = Some(data_dir);
    }
    if args.keep_alive {
        config.keep_alive = true;
    }

    log::info!(
        "Configuration: output_zone={}, track_duration={}",
        config.output_zone.as_deref().unwrap_or("none"),
        config
            .track_duration_secs
            .map_or_else(|| "unbounded".to_string(), |s| format!("{}s", s))
    );

    match config.data_dir {
        Some(ref data_dir) => log::info!("Using data directory: {}", data_dir.display()),
        None => log::info!("No data directory configured - zone latency will not persist"),
    }

    let (transport, intents) = ChannelTransport::new();
    let services = bootstrap_engine(
        &config.to_engine_config(),
        BootstrapOptions {
            backend: AudioBackendChoice::Simulated {
                track_duration: config.track_duration_secs.map(Duration::from_secs),
            },
            transport: Arc::new(transport),
            data_dir: config.data_dir.clone(),
        },
    )
    .context("Failed to bootstrap engine")?;

    log::info!("Engine bootstrapped successfully");

    let printer = tokio::spawn(print_intents(intents));
    let ui_events = tokio::spawn(log_client_events(services.event_bridge.subscribe()));

    let input: Box<dyn AsyncBufRead + Unpin + Send> = match args.input {
        Some(ref path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open input file: {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    tokio::select! {
        result = feed_lines(&services.engine, input) => {
            result?;
            if config.keep_alive {
                log::info!("Input finished, waiting for shutdown signal");
                shutdown_signal().await;
            } else {
                log::info!("Input finished");
            }
        }
        _ = shutdown_signal() => {
            log::info!("Shutdown signal received, cleaning up...");
        }
    }

    // Graceful shutdown
    services.shutdown().await;

    // The engine has stopped, so no further intents or events will arrive
    ui_events.abort();
    printer.abort();

    log::info!("Shutdown complete");
    Ok(())
}

/// Reads input lines until EOF, feeding each into the engine.
///
/// Bad lines are logged and skipped; only read failures end the loop early.
async fn feed_lines(
    engine: &roomsync_core::EngineHandle,
    input: Box<dyn AsyncBufRead + Unpin + Send>,
) -> Result<()> {
    let mut lines = input.lines();
    let mut line_no = 0usize;
    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        line_no += 1;
        let parsed = match driver::parse_line(&line) {
            Ok(Some(parsed)) => parsed,
            Ok(None) => continue,
            Err(e) => {
                log::warn!("[Input] line {}: {:#}", line_no, e);
                continue;
            }
        };
        if let Err(e) = driver::dispatch(engine, parsed) {
            log::warn!("[Input] line {}: {:#}", line_no, e);
        }
    }
    Ok(())
}

/// Writes every outbound intent to stdout as one JSON line.
async fn print_intents(mut intents: mpsc::UnboundedReceiver<OutboundIntent>) {
    while let Some(intent) = intents.recv().await {
        let line = serde_json::json!({
            "intent": intent.name(),
            "payload": intent.payload(),
        });
        println!("{}", line);
    }
}

/// Logs UI events published by the engine.
async fn log_client_events(
    mut events: tokio::sync::broadcast::Receiver<roomsync_core::ClientEvent>,
) {
    use tokio::sync::broadcast::error::RecvError;
    loop {
        match events.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => log::info!("[Events] {}", json),
                Err(e) => log::warn!("[Events] Failed to serialize event: {}", e),
            },
            Err(RecvError::Lagged(skipped)) => {
                log::warn!("[Events] Skipped {} events", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
