use anyhow::Result;

use opentelemetry::{global, trace::TracerProvider};
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::{LogExporter, SpanExporter};
use opentelemetry_sdk::{
    logs::SdkLoggerProvider,
    propagation::TraceContextPropagator,
    trace::{RandomIdGenerator, SdkTracerProvider},
    Resource,
};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{prelude::*, EnvFilter};

const DEFAULT_SERVICE_NAME: &str = "persist-message";

// Resource::builder() already runs the SDK, env and telemetry detectors, so
// OTEL_RESOURCE_ATTRIBUTES is honoured; the service name is set explicitly.
fn resource() -> Resource {
    Resource::builder()
        .with_service_name(
            std::env::var("OTEL_SERVICE_NAME").unwrap_or(DEFAULT_SERVICE_NAME.to_string()),
        )
        .build()
}

fn init_tracer() -> Result<SdkTracerProvider> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    let exporter = SpanExporter::builder().with_tonic().build()?;

    Ok(SdkTracerProvider::builder()
        .with_resource(resource())
        .with_id_generator(RandomIdGenerator::default())
        .with_batch_exporter(exporter)
        .build())
}

// Log records are exported one by one; the process can be frozen right
// after an invocation returns.
fn init_logger_provider() -> Result<SdkLoggerProvider> {
    let exporter = LogExporter::builder().with_tonic().build()?;

    Ok(SdkLoggerProvider::builder()
        .with_resource(resource())
        .with_simple_exporter(exporter)
        .build())
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber: JSON logs on stdout for CloudWatch, plus
/// spans and log records exported over OTLP.
///
/// Keep the returned guard alive for the life of the process and call
/// [`OtelGuard::flush`] at the end of every invocation.
pub fn init_otel() -> Result<OtelGuard> {
    let logger_provider = init_logger_provider()?;
    let tracer_provider = init_tracer()?;

    let tracer = tracer_provider.tracer("persist-message");

    let filter_otel = EnvFilter::new("info")
        .add_directive("hyper=off".parse()?)
        .add_directive("opentelemetry=off".parse()?)
        .add_directive("tonic=off".parse()?)
        .add_directive("h2=off".parse()?)
        .add_directive("aws_smithy_runtime=off".parse()?);
    let otel_log_layer = OpenTelemetryTracingBridge::new(&logger_provider).with_filter(filter_otel);

    let fmt_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_target(false)
        .without_time()
        .with_filter(env_filter());

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(otel_log_layer)
        .with(OpenTelemetryLayer::new(tracer))
        .try_init()?;

    Ok(OtelGuard {
        tracer_provider,
        logger_provider,
    })
}

pub struct OtelGuard {
    tracer_provider: SdkTracerProvider,
    logger_provider: SdkLoggerProvider,
}

impl OtelGuard {
    pub fn flush(&self) {
        if let Err(err) = self.tracer_provider.force_flush() {
            eprintln!("{err:?}");
        }
        if let Err(err) = self.logger_provider.force_flush() {
            eprintln!("{err:?}");
        }
    }
}

impl Drop for OtelGuard {
    fn drop(&mut self) {
        if let Err(err) = self.tracer_provider.shutdown() {
            eprintln!("{err:?}");
        }
        if let Err(err) = self.logger_provider.shutdown() {
            eprintln!("{err:?}");
        }
    }
}
