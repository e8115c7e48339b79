//! Prometheus metrics and the `/metrics` exporter.

#[cfg(test)]
mod metrics_test;

use lazy_static::lazy_static;
use prometheus::exponential_buckets;
use prometheus::core::Collector;
use prometheus::Encoder;
use prometheus::HistogramOpts;
use prometheus::HistogramVec;
use prometheus::IntCounterVec;
use prometheus::IntGaugeVec;
use prometheus::Opts;
use prometheus::Registry;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use tracing::warn;
use warp::Filter;
use warp::Rejection;
use warp::Reply;

lazy_static! {
    /// Set transactions by outcome: `committed`, `empty` or the failing stage.
    pub static ref SET_TRANSACTIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("set_transactions", "Set transactions by outcome"),
        &["target", "outcome"]
    )
    .expect("metric can not be created");

    pub static ref SET_LATENCY_MS: HistogramVec = HistogramVec::new(
        HistogramOpts::new("set_latency_ms", "Histogram of Set transaction latency in ms")
            .buckets(exponential_buckets(0.1, 2.0, 16).expect("valid buckets")),
        &["target"]
    )
    .expect("metric can not be created");

    /// Messages handled by the update ingestion loop, by kind.
    pub static ref INGESTED_MESSAGES: IntCounterVec = IntCounterVec::new(
        Opts::new("ingested_messages", "Messages handled by the ingestion loop"),
        &["target", "kind"]
    )
    .expect("metric can not be created");

    pub static ref CACHED_LEAVES: IntGaugeVec = IntGaugeVec::new(
        Opts::new("cached_leaves", "Leaves held by the state cache"),
        &["target"]
    )
    .expect("metric can not be created");

    pub static ref ACTIVE_SUBSCRIPTIONS: IntGaugeVec = IntGaugeVec::new(
        Opts::new("active_subscriptions", "Open Subscribe streams by mode"),
        &["mode"]
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

pub(crate) fn register_custom_metrics(registry: &Registry) {
    let collectors: Vec<Box<dyn Collector>> = vec![
        Box::new(SET_TRANSACTIONS.clone()),
        Box::new(SET_LATENCY_MS.clone()),
        Box::new(INGESTED_MESSAGES.clone()),
        Box::new(CACHED_LEAVES.clone()),
        Box::new(ACTIVE_SUBSCRIPTIONS.clone()),
    ];
    for collector in collectors {
        if let Err(e) = registry.register(collector) {
            warn!("metric registration skipped: {}", e);
        }
    }
}

/// Serves `/metrics` on `port` until `shutdown_signal` fires.
pub async fn start_server(
    port: u16,
    mut shutdown_signal: watch::Receiver<()>,
) {
    register_custom_metrics(&REGISTRY);

    let metrics_route = warp::path!("metrics").and_then(metrics_handler);

    let (addr, server) =
        warp::serve(metrics_route).bind_with_graceful_shutdown(([0, 0, 0, 0], port), async move {
            let _ = shutdown_signal.changed().await;
        });
    info!(%addr, "prometheus exporter listening");
    server.await;
}

async fn metrics_handler() -> Result<impl Reply, Rejection> {
    Ok(render(&REGISTRY))
}

pub(crate) fn render(registry: &Registry) -> String {
    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        error!("could not encode custom metrics: {}", e);
    }
    match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            error!("custom metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    }
}
