//! rfid-tmreader - Multi-antenna RFID scan node
//!
//! Main entry point for the scan node binary.
//!
//! # Execution Flow
//!
//! 1. Load `rfid_node.yaml` from the config directory (first argument, default `config/`)
//!    merged with `RFID_*` environment overrides
//! 2. Initialize logging → logs/rfid_tmreader.<date>, then log the loaded config
//! 3. Create tokio runtime with 2 worker threads
//! 4. Create the `rfid/tags` publisher and, if enabled, the stdout echo consumer
//! 5. Open the reader session (create → connect → region → read plan); any failure is fatal
//! 6. Run the scan loop until Ctrl-C
//! 7. Close the reader, log metrics, shut the runtime down with a 5s timeout
//!
//! # Exit status
//!
//! Non-zero when configuration, logging or reader startup fails. Per-antenna read
//! errors while running never stop the node.

use anyhow::{Context, Result};
use rfid_tmreader::publish::spawn_echo;
use rfid_tmreader::reader::driver_for_uri;
use rfid_tmreader::{
    APP_NAME, BroadcastPublisher, ConfigManager, NodeConfig, ReaderSession, ScanLoop, VERSION,
};
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::watch;

const DEFAULT_CONFIG_DIR: &str = "config";

fn main() -> Result<ExitCode> {
    let config_dir = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_DIR.to_string());

    let config_manager = ConfigManager::new(&config_dir)?;
    let node_config = config_manager.load_node_config()?;

    // Held until main returns so buffered log lines are flushed
    let _log_guard = rfid_tmreader::logging::setup_logging(&node_config.logging)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);
    config_manager.log_loaded(&node_config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("rfid-worker")
        .build()?;

    tracing::info!("Tokio runtime initialized with {} worker threads", 2);

    let result = runtime.block_on(run_node(node_config));

    runtime.shutdown_timeout(Duration::from_secs(5));

    match result {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!("Fatal: {:#}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Open the reader and scan until a shutdown signal arrives.
async fn run_node(config: NodeConfig) -> Result<()> {
    let publisher = BroadcastPublisher::from_config(&config.publisher);
    let echo = config
        .publisher
        .echo
        .then(|| spawn_echo(publisher.subscribe(), publisher.topic().to_string()));

    let session = driver_for_uri(&config.reader.uri, &config.simulation)
        .and_then(|driver| ReaderSession::open(driver, &config.reader))
        .context("Reader startup failed")?;

    tracing::info!(
        "RFID node started: uri={}, topic={}",
        session.uri(),
        publisher.topic()
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown signal received"),
            Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
        }
        let _ = shutdown_tx.send(true);
    });

    let mut scan_loop = ScanLoop::new(session, publisher, config.reader.clone());
    scan_loop.run(shutdown_rx).await;

    // Closes the reader and drops the publisher, which ends the echo task
    let metrics = scan_loop.shutdown();
    metrics.log_summary();

    if let Some(echo) = echo {
        if let Err(e) = echo.await {
            tracing::error!("Echo task join error: {}", e);
        }
    }

    Ok(())
}
