//! Prometheus exporter for JSON HTTP endpoints.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

use json_exporter::{ExporterConfig, ExporterMetrics, HttpServer, ProbeClient, init_tracing};

/// Prometheus exporter for JSON HTTP endpoints.
#[derive(Parser, Debug)]
#[command(name = "json-exporter")]
#[command(about = "Expose JSON HTTP endpoints as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    config: Option<String>,

    /// The address to listen on for HTTP requests (overrides config).
    #[arg(long)]
    listen_address: Option<String>,

    /// Log level (trace, debug, info, warn, error), overrides config.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        ExporterConfig::load_from_file(config_path)?
    } else {
        ExporterConfig::default()
    };

    if let Some(listen) = args.listen_address {
        config.http.listen = listen;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    config.validate()?;

    init_tracing(&config.logging)?;

    info!("Starting JSON exporter");

    let listen_addr = config.http.listen_addr()?;

    let client = ProbeClient::new(&config.probe)?;
    let metrics = Arc::new(ExporterMetrics::new());
    let http_server = HttpServer::new(client, metrics.clone(), listen_addr);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut http_task = tokio::spawn(http_server.run(shutdown_rx));

    // Wait for shutdown signal, or for the server to stop on its own
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate() => {
            info!("Received SIGTERM, shutting down...");
        }
        res = &mut http_task => {
            let res = res.map_err(|e| anyhow::anyhow!("HTTP server task failed: {}", e))?;
            if let Err(e) = &res {
                error!("HTTP server error: {}", e);
            }
            return res;
        }
    }

    // The server may already be gone; nothing to notify then.
    let _ = shutdown_tx.send(true);

    match tokio::time::timeout(Duration::from_secs(5), http_task).await {
        Ok(Ok(Err(e))) => error!("HTTP server error: {}", e),
        Ok(Err(e)) => error!("HTTP server task failed: {}", e),
        Err(_) => error!("HTTP server did not stop within 5s"),
        Ok(Ok(Ok(()))) => {}
    }

    info!(probes = metrics.probes(), "Exporter stopped");
    Ok(())
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            error!("Failed to install SIGTERM handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
