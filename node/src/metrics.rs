//! # Prometheus Metrics
//!
//! Counters and timings for the vault host, served as text at `/metrics` on
//! the metrics port.
//!
//! Everything is registered in a dedicated [`prometheus::Registry`] under the
//! `arca` prefix, not the global default registry.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Metric handles for the node. Handles are internally reference-counted,
/// so clones observe the same values.
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Signed calls the ledger applied.
    pub calls_applied_total: IntCounter,
    /// Signed calls that passed signature and nonce checks but the ledger
    /// rejected.
    pub calls_rejected_total: IntCounter,
    /// Read-only queries and probes served.
    pub queries_total: IntCounter,
    /// Ledger events emitted.
    pub events_emitted_total: IntCounter,
    /// Vaults currently alive.
    pub live_vaults: IntGauge,
    /// Time spent handling one signed call, verification included.
    pub call_latency_seconds: Histogram,
}

impl NodeMetrics {
    /// Create and register every metric.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("arca".into()), None)?;

        let calls_applied_total =
            IntCounter::new("calls_applied_total", "Signed calls applied by the ledger")?;
        registry.register(Box::new(calls_applied_total.clone()))?;

        let calls_rejected_total = IntCounter::new(
            "calls_rejected_total",
            "Signed calls rejected by the ledger (access denied, invalid metadata)",
        )?;
        registry.register(Box::new(calls_rejected_total.clone()))?;

        let queries_total = IntCounter::new("queries_total", "Read-only queries and probes served")?;
        registry.register(Box::new(queries_total.clone()))?;

        let events_emitted_total =
            IntCounter::new("events_emitted_total", "Vault events emitted by the ledger")?;
        registry.register(Box::new(events_emitted_total.clone()))?;

        let live_vaults = IntGauge::new("live_vaults", "Number of vaults that exist right now")?;
        registry.register(Box::new(live_vaults.clone()))?;

        let call_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "call_latency_seconds",
                "Signed call handling latency in seconds",
            )
            .buckets(vec![
                0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
            ]),
        )?;
        registry.register(Box::new(call_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            calls_applied_total,
            calls_rejected_total,
            queries_total,
            events_emitted_total,
            live_vaults,
            call_latency_seconds,
        })
    }

    /// Render all metrics in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

pub type SharedMetrics = Arc<NodeMetrics>;

/// `GET /metrics`.
pub async fn metrics_handler(State(metrics): State<SharedMetrics>) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
