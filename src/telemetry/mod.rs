//! Telemetry bootstrap.
//!
//! With an OTLP endpoint configured, spans from `#[tracing::instrument]`,
//! the counters in [`metrics`], and `tracing` log events all export over
//! gRPC. Without one, events go to a plain fmt layer on stderr and the
//! metric instruments record into the no-op global meter.

pub mod metrics;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig as _;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

use crate::error::{Error, Result};

pub struct TelemetryConfig {
    /// OTLP gRPC endpoint, e.g. "http://localhost:4317". `None` means
    /// local dev: fmt output only.
    pub endpoint: Option<String>,
    pub service_name: String,
}

/// Holds the exporter pipelines open; dropping it shuts them down,
/// flushing whatever is still batched. Keep it alive until the process
/// is done doing work.
pub struct TelemetryGuard {
    providers: Option<(SdkTracerProvider, SdkMeterProvider, SdkLoggerProvider)>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some((tracer, meter, logger)) = self.providers.take() {
            let _ = logger.shutdown();
            let _ = meter.shutdown();
            let _ = tracer.shutdown();
        }
    }
}

fn otlp_err(signal: &str, e: impl std::fmt::Display) -> Error {
    Error::Other(format!("failed to build OTLP {signal} exporter: {e}"))
}

/// Install the global tracing subscriber and, when an endpoint is set,
/// the OTLP trace/metric/log pipelines.
///
/// # Errors
///
/// Fails if an exporter cannot be built or a subscriber is already
/// installed.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt = tracing_subscriber::fmt::layer().compact();

    let Some(endpoint) = config.endpoint else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt)
            .try_init()
            .map_err(|e| Error::Other(format!("failed to init tracing subscriber: {e}")))?;
        return Ok(TelemetryGuard { providers: None });
    };

    let resource = Resource::builder()
        .with_service_name(config.service_name)
        .build();

    let tracer_provider = SdkTracerProvider::builder()
        .with_batch_exporter(
            opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .with_endpoint(&endpoint)
                .build()
                .map_err(|e| otlp_err("span", e))?,
        )
        .with_resource(resource.clone())
        .build();

    let meter_provider = SdkMeterProvider::builder()
        .with_periodic_exporter(
            opentelemetry_otlp::MetricExporter::builder()
                .with_tonic()
                .with_endpoint(&endpoint)
                .build()
                .map_err(|e| otlp_err("metric", e))?,
        )
        .with_resource(resource.clone())
        .build();

    // The instrument factories in `metrics` resolve through the global
    // meter, so this must happen before the first counter is touched.
    opentelemetry::global::set_meter_provider(meter_provider.clone());

    let logger_provider = SdkLoggerProvider::builder()
        .with_batch_exporter(
            opentelemetry_otlp::LogExporter::builder()
                .with_tonic()
                .with_endpoint(&endpoint)
                .build()
                .map_err(|e| otlp_err("log", e))?,
        )
        .with_resource(resource)
        .build();

    // fmt stays in the stack so dispatch failures are visible on the
    // box even when the collector is unreachable.
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt)
        .with(tracing_opentelemetry::layer().with_tracer(tracer_provider.tracer("caseflow")))
        .with(opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge::new(
            &logger_provider,
        ))
        .try_init()
        .map_err(|e| Error::Other(format!("failed to init tracing subscriber: {e}")))?;

    Ok(TelemetryGuard {
        providers: Some((tracer_provider, meter_provider, logger_provider)),
    })
}
