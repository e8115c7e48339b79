use std::path::Path;

use gnmi_collector::metrics;
use gnmi_collector::CollectorBuilder;
use gnmi_collector::CollectorConfig;
use gnmi_collector::Result;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let config = CollectorConfig::new()?.validate()?;

    // Initializing Logs
    let _guard = init_observability(config.server.log_dir.as_deref());

    // Initializing Shutdown Signal
    let (graceful_tx, graceful_rx) = watch::channel(());

    if config.monitoring.prometheus_enabled {
        tokio::spawn(metrics::start_server(
            config.monitoring.prometheus_port,
            graceful_rx.clone(),
        ));
    }

    let collector = CollectorBuilder::new(config, graceful_rx).start().await?;
    info!(addr = %collector.local_addr(), "collector started. Waiting for a shutdown signal...");

    tokio::select! {
        result = wait_for_signal() => {
            if let Err(e) = result {
                error!("failed to listen for shutdown signals: {}", e);
            }
        }
        _ = collector.stopped() => {
            info!("collector stopped on its own");
        }
    }

    // Only fails once every receiver is gone, at which point nothing is left to stop.
    let _ = graceful_tx.send(());
    if let Err(e) = collector.stop().await {
        error!("collector stopped with error: {}", e);
    }

    info!("Exiting program.");
    Ok(())
}

async fn wait_for_signal() -> std::io::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
    }
    Ok(())
}

/// Logs to stdout, or to `<log_dir>/collector.log` through a non-blocking
/// writer when a log directory is configured. The returned guard flushes the
/// file writer on drop.
fn init_observability(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(dir, "collector.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(EnvFilter::from_default_env());
            tracing_subscriber::registry().with(layer).init();
            Some(guard)
        }
        None => {
            let layer = tracing_subscriber::fmt::layer().with_filter(EnvFilter::from_default_env());
            tracing_subscriber::registry().with(layer).init();
            None
        }
    }
}
