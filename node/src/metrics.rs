//! # Prometheus Metrics
//!
//! Exposes operational metrics for the vault devnet. Scraped by Prometheus
//! at the `/metrics` HTTP endpoint on the configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so they
//! do not collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

use vault_contracts::Vault;

/// Holds all Prometheus metric handles for the node.
///
/// Clone-friendly (prometheus handles are `Arc`s internally) so it can be
/// shared across request handlers.
#[derive(Clone)]
pub struct VaultMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// JSON-RPC calls received, by method.
    pub calls_total: IntCounterVec,
    /// JSON-RPC calls rejected, by method and error kind.
    pub rejected_total: IntCounterVec,
    /// Native counter of the vault, in base units. Lossy above 2^53.
    pub native_balance: Gauge,
    /// Number of assets the vault has ever held.
    pub tracked_assets: IntGauge,
    /// Length of the vault's event journal.
    pub events_recorded: IntGauge,
    /// Histogram of JSON-RPC call latency in seconds.
    pub call_latency_seconds: Histogram,
}

impl VaultMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("vault".into()), None)
            .expect("failed to create prometheus registry");

        let calls_total = IntCounterVec::new(
            Opts::new("rpc_calls_total", "Total number of JSON-RPC calls received"),
            &["method"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(calls_total.clone()))
            .expect("metric registration");

        let rejected_total = IntCounterVec::new(
            Opts::new(
                "rpc_rejected_total",
                "Total number of JSON-RPC calls rejected, by error kind",
            ),
            &["method", "kind"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(rejected_total.clone()))
            .expect("metric registration");

        let native_balance = Gauge::new(
            "native_balance",
            "Native currency held in custody, in base units",
        )
        .expect("metric creation");
        registry
            .register(Box::new(native_balance.clone()))
            .expect("metric registration");

        let tracked_assets = IntGauge::new(
            "tracked_assets",
            "Number of assets with a custody counter",
        )
        .expect("metric creation");
        registry
            .register(Box::new(tracked_assets.clone()))
            .expect("metric registration");

        let events_recorded = IntGauge::new(
            "events_recorded",
            "Number of entries in the vault event journal",
        )
        .expect("metric creation");
        registry
            .register(Box::new(events_recorded.clone()))
            .expect("metric registration");

        let call_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "rpc_call_latency_seconds",
                "JSON-RPC call handling latency in seconds",
            )
            .buckets(vec![
                0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
            ]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(call_latency_seconds.clone()))
            .expect("metric registration");

        Self {
            registry,
            calls_total,
            rejected_total,
            native_balance,
            tracked_assets,
            events_recorded,
            call_latency_seconds,
        }
    }

    /// Refreshes the gauges from the vault's current counters.
    pub fn observe_vault(&self, vault: &Vault) {
        self.native_balance.set(vault.balance() as f64);
        self.tracked_assets.set(vault.tracked_asset_count() as i64);
        self.events_recorded.set(vault.events().len() as i64);
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for VaultMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<VaultMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
///
/// Returns HTTP 500 if encoding fails.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
