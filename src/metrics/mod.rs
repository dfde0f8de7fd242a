//! Swap outcome metrics
//!
//! Two layers: `SwapMetrics` is the in-process, append-only collector of
//! swap outcomes (counts, latency distribution, volume) with a flat
//! dotted-name export for any metrics sink; the prometheus registry mirrors
//! the counters for scraping via the `/metrics` endpoint. Neither layer
//! retains per-swap data.

use crate::error::ResolverResult;

use axum::{routing::get, Router};
use chrono::Utc;
use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_gauge, register_gauge_vec, register_histogram, Counter, Encoder,
    Gauge, GaugeVec, Histogram, TextEncoder,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Mutex;
use tracing::info;

lazy_static! {
    pub static ref SWAPS_INITIATED: Counter = register_counter!(
        "resolver_swaps_initiated_total",
        "Total swaps admitted by the orchestrator"
    )
    .unwrap();

    pub static ref SWAPS_COMPLETED: Counter = register_counter!(
        "resolver_swaps_completed_total",
        "Total swaps completed atomically"
    )
    .unwrap();

    pub static ref SWAPS_FAILED: Counter = register_counter!(
        "resolver_swaps_failed_total",
        "Total swaps that ended cancelled or failed"
    )
    .unwrap();

    pub static ref ACTIVE_SWAPS: Gauge = register_gauge!(
        "resolver_active_swaps",
        "Swaps currently in a non-terminal phase"
    )
    .unwrap();

    pub static ref SWAP_LATENCY: Histogram = register_histogram!(
        "resolver_swap_latency_seconds",
        "End-to-end swap latency",
        vec![1.0, 5.0, 15.0, 60.0, 300.0, 900.0, 3600.0, 7200.0]
    )
    .unwrap();

    pub static ref CHAIN_CONNECTED: GaugeVec = register_gauge_vec!(
        "resolver_chain_connected",
        "Chain connection status (1=connected, 0=disconnected)",
        &["chain_id"]
    )
    .unwrap();
}

pub fn record_swap_initiated() {
    SWAPS_INITIATED.inc();
}

pub fn record_active_swaps(count: usize) {
    ACTIVE_SWAPS.set(count as f64);
}

pub fn record_chain_health(chain_id: u64, healthy: bool) {
    CHAIN_CONNECTED
        .with_label_values(&[&chain_id.to_string()])
        .set(if healthy { 1.0 } else { 0.0 });
}

/// Latency distribution summary in milliseconds.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LatencyStats {
    pub min: f64,
    pub median: f64,
    pub max: f64,
}

/// Aggregate snapshot of recorded swap outcomes.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub total_swaps: u64,
    pub successes: u64,
    pub failures: u64,
    pub success_rate: f64,
    pub latency: LatencyStats,
    pub total_volume: f64,
}

#[derive(Default)]
struct Inner {
    successes: u64,
    failures: u64,
    latencies_ms: Vec<u64>,
    total_volume: f64,
}

/// Append-only recorder of swap outcomes. Holds aggregates only; no
/// swap-identifying data survives here.
#[derive(Default)]
pub struct SwapMetrics {
    inner: Mutex<Inner>,
}

impl SwapMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, latency_ms: u64, volume: Option<f64>) {
        let mut inner = self.inner.lock().unwrap();
        inner.successes += 1;
        inner.latencies_ms.push(latency_ms);
        if let Some(v) = volume {
            inner.total_volume += v;
        }
        drop(inner);

        SWAPS_COMPLETED.inc();
        SWAP_LATENCY.observe(latency_ms as f64 / 1000.0);
    }

    pub fn record_failure(&self) {
        self.inner.lock().unwrap().failures += 1;
        SWAPS_FAILED.inc();
    }

    pub fn reset(&self) {
        *self.inner.lock().unwrap() = Inner::default();
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.lock().unwrap();
        let total = inner.successes + inner.failures;
        let success_rate = if total > 0 {
            inner.successes as f64 / total as f64
        } else {
            0.0
        };
        MetricsSnapshot {
            total_swaps: total,
            successes: inner.successes,
            failures: inner.failures,
            success_rate,
            latency: latency_stats(&inner.latencies_ms),
            total_volume: inner.total_volume,
        }
    }

    /// Flat dotted-name export suitable for any time-series sink.
    pub fn export_for_monitoring(&self) -> BTreeMap<String, f64> {
        let snapshot = self.snapshot();
        let mut out = BTreeMap::new();
        out.insert("resolver.swaps.total".to_string(), snapshot.total_swaps as f64);
        out.insert("resolver.swaps.success".to_string(), snapshot.successes as f64);
        out.insert("resolver.swaps.failure".to_string(), snapshot.failures as f64);
        out.insert(
            "resolver.swaps.success_rate".to_string(),
            snapshot.success_rate,
        );
        out.insert("resolver.latency.min_ms".to_string(), snapshot.latency.min);
        out.insert(
            "resolver.latency.median_ms".to_string(),
            snapshot.latency.median,
        );
        out.insert("resolver.latency.max_ms".to_string(), snapshot.latency.max);
        out.insert("resolver.volume.total".to_string(), snapshot.total_volume);
        out.insert(
            "resolver.timestamp".to_string(),
            Utc::now().timestamp_millis() as f64,
        );
        out
    }
}

fn latency_stats(latencies_ms: &[u64]) -> LatencyStats {
    if latencies_ms.is_empty() {
        return LatencyStats::default();
    }
    let mut sorted = latencies_ms.to_vec();
    sorted.sort_unstable();
    let min = sorted[0] as f64;
    let max = sorted[sorted.len() - 1] as f64;
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 1 {
        sorted[mid] as f64
    } else {
        (sorted[mid - 1] as f64 + sorted[mid] as f64) / 2.0
    };
    LatencyStats { min, median, max }
}

/// Prometheus metrics server
pub struct MetricsServer {
    port: u16,
}

impl MetricsServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub async fn run(&self) -> ResolverResult<()> {
        let app = Router::new().route("/metrics", get(metrics_handler));

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Starting metrics server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::error::ResolverError::Config(e.to_string()))?;
        axum::serve(listener, app)
            .await
            .map_err(|e| crate::error::ResolverError::Internal(e.to_string()))?;

        Ok(())
    }
}

async fn metrics_handler() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap_or_default();
    String::from_utf8(buffer).unwrap_or_default()
}
