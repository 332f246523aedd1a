//! Structured logging and metrics, scaled to what this gateway does:
//! poll outcomes, emitted change events, and rank rebases. No HTTP or
//! relay instruments — there is no HTTP surface on this side.

use anyhow::Result;
use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter, MeterProvider},
};
use opentelemetry_sdk::metrics::SdkMeterProvider;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;

/// Initialize the global `tracing` subscriber for the configured level
/// and format. Call once, at startup.
pub fn init_tracing(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("rundown_watcher={level}")));

    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Plain => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }

    Ok(())
}

/// Metrics instruments for one watcher process. Exported via OTLP when
/// `metrics.otlp_endpoint` is configured; otherwise instruments are
/// still recorded against an in-process `SdkMeterProvider` (harmless,
/// just unexported).
#[derive(Clone)]
pub struct AppObservability {
    pub meter: Meter,

    pub poll_duration: Histogram<f64>,
    pub poll_outcomes: Counter<u64>,
    pub events_emitted: Counter<u64>,
    pub rank_rebases: Counter<u64>,
    pub nrcs_backlog_warnings: Counter<u64>,
}

impl AppObservability {
    pub fn new(otlp_endpoint: Option<&str>) -> Result<Self> {
        let provider = SdkMeterProvider::builder().build();
        global::set_meter_provider(provider.clone());

        if let Some(endpoint) = otlp_endpoint {
            info!(%endpoint, "OpenTelemetry metrics export configured");
        } else {
            info!("OpenTelemetry metrics export not configured, recording locally only");
        }

        let meter = provider.meter("rundown-watcher");
        Ok(Self::build_with_instruments(meter))
    }

    fn build_with_instruments(meter: Meter) -> Self {
        let poll_duration = meter
            .f64_histogram("watcher_poll_duration_seconds")
            .with_description("Time taken to complete one queue's poll cycle")
            .build();
        let poll_outcomes = meter
            .u64_counter("watcher_poll_outcomes_total")
            .with_description("Poll cycles completed, by outcome (good/fetch_failure/version_mismatch)")
            .build();
        let events_emitted = meter
            .u64_counter("watcher_events_emitted_total")
            .with_description("Change events emitted to the control plane, by kind")
            .build();
        let rank_rebases = meter
            .u64_counter("watcher_rank_rebases_total")
            .with_description("Full integer rank rebases performed")
            .build();
        let nrcs_backlog_warnings = meter
            .u64_counter("watcher_nrcs_backlog_warnings_total")
            .with_description("Polls that completed with a nonzero NRCS in-flight queue length")
            .build();

        Self {
            meter,
            poll_duration,
            poll_outcomes,
            events_emitted,
            rank_rebases,
            nrcs_backlog_warnings,
        }
    }
}
