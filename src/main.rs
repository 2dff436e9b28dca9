use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use serial_web_console::{
    build_router,
    config::{Config, ConfigLoader, LogFormat},
    AppResult, ConnectionManager, EmptyLinePolicy, LogStore, PortProvider, RebootController,
    RestContext, SyncService, SystemPorts,
};

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Streams a device's serial console to the browser.",
    long_about = "Reads newline-delimited output from a USB serial device, keeps the most recent lines in memory and serves them to web clients over a polling API. Reconnects automatically when the device re-enumerates and can hard-reset it through DTR/RTS."
)]
struct Args {
    /// Path to a configuration file (overrides the standard search).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address the HTTP server binds to.
    #[arg(long)]
    host: Option<String>,

    /// Port for the HTTP server.
    #[arg(short, long)]
    port: Option<u16>,

    /// Serial device tried first on every connect.
    #[arg(short, long)]
    serial_port: Option<String>,
}

// --- Main Application Entry Point ---
#[tokio::main]
async fn main() -> AppResult<()> {
    let args = Args::parse();

    let loader = match &args.config {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    let config_path = loader.config_path.clone();
    let mut config = loader.into_config();
    apply_args(&mut config, args);
    init_tracing(&config);

    match &config_path {
        Some(path) => info!(path = %path.display(), "configuration loaded"),
        None => info!("using built-in configuration defaults"),
    }

    let store = Arc::new(LogStore::new(config.buffer.capacity));
    let provider: Arc<dyn PortProvider> = Arc::new(SystemPorts);
    let manager = ConnectionManager::new(
        provider,
        Arc::clone(&store),
        &config.serial,
        EmptyLinePolicy::from_keep(config.buffer.keep_empty_lines),
    )?;
    let ctx = RestContext {
        sync: SyncService::new(Arc::clone(&store)),
        reboot: RebootController::new(manager.handle(), Arc::clone(&store), &config.reboot),
    };

    let (stop_tx, stop_rx) = watch::channel(false);
    let worker = manager.spawn(stop_rx);

    let listener = TcpListener::bind(config.server.bind_address()).await?;
    info!(
        addr = %listener.local_addr()?,
        preferred_port = %config.serial.preferred_port,
        baud = config.serial.baud_rate,
        "serial web console listening"
    );

    axum::serve(listener, build_router(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The worker also exits on its own if the sender is dropped.
    let _ = stop_tx.send(true);
    if let Err(e) = worker.await {
        error!(error = %e, "serial worker terminated abnormally");
    }
    info!("shutdown complete");
    Ok(())
}

/// Command-line flags take precedence over file and environment values.
fn apply_args(config: &mut Config, args: Args) {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(serial_port) = args.serial_port {
        config.serial.preferred_port = serial_port;
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.server.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

// --- Graceful Shutdown Handler ---
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("signal received, starting graceful shutdown");
}
