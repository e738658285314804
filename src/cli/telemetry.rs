//! Log output and optional OTLP trace export for the server.

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use opentelemetry::{KeyValue, trace::TracerProvider as _};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use std::time::Duration;
use tracing::{Level, warn};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};

const OTLP_ENDPOINT_ENV: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

static PROVIDER: OnceCell<SdkTracerProvider> = OnceCell::new();

/// `RUST_LOG` wins over `-v`; chatty dependencies are capped either way.
fn filter(level: Level) -> Result<EnvFilter> {
    Ok(EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
        .add_directive("hyper=error".parse()?)
        .add_directive("sqlx=warn".parse()?))
}

/// The OTLP/gRPC exporter wants a scheme; collectors are often given as `host:port`.
fn collector_url(endpoint: &str) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("http://{endpoint}")
    }
}

fn otlp_provider(endpoint: &str) -> Result<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(collector_url(endpoint))
        .with_timeout(Duration::from_secs(3))
        .build()
        .context("failed to build OTLP span exporter")?;

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(
            Resource::builder_empty()
                .with_attributes([
                    KeyValue::new("service.name", env!("CARGO_PKG_NAME")),
                    KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
                ])
                .build(),
        )
        .build())
}

/// Install the global subscriber. Spans are also exported when
/// `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
///
/// # Errors
/// Fails when the exporter cannot be built or a subscriber is already installed.
pub fn init(verbosity_level: Option<Level>) -> Result<()> {
    let otel_layer = match std::env::var(OTLP_ENDPOINT_ENV) {
        Ok(endpoint) => {
            let provider = otlp_provider(&endpoint)?;
            let tracer = provider.tracer(env!("CARGO_PKG_NAME"));
            let _ = PROVIDER.set(provider);
            Some(tracing_opentelemetry::layer().with_tracer(tracer))
        }
        Err(_) => None,
    };

    let subscriber = Registry::default()
        .with(fmt::layer().with_target(false).pretty())
        .with(otel_layer)
        .with(filter(verbosity_level.unwrap_or(Level::ERROR))?);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Flush pending spans. Does nothing when export was never enabled.
pub fn shutdown_tracer() {
    if let Some(provider) = PROVIDER.get() {
        if let Err(err) = provider.shutdown() {
            warn!("Failed to flush traces: {err}");
        }
    }
}
