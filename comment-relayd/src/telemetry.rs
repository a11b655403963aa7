use anyhow::{Context, Result};
use opentelemetry::{
    metrics::{Counter, Histogram, Meter, MeterProvider},
    KeyValue,
};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{metrics::SdkMeterProvider, Resource};
use std::time::Duration;
use tracing::info;

/// Relay telemetry metrics
pub struct RelayMetrics {
    // HTTP requests by route and outcome
    pub requests: Counter<u64>,

    // Command subsystem round trip
    pub dispatch_latency: Histogram<f64>,

    pub keys_generated: Counter<u64>,
}

impl RelayMetrics {
    pub fn new(meter: &Meter) -> Self {
        let requests = meter
            .u64_counter("comment_relay.requests")
            .with_description("HTTP requests handled, by route and outcome")
            .build();

        let dispatch_latency = meter
            .f64_histogram("comment_relay.dispatch.latency_ms")
            .with_description("Command dispatch latency in milliseconds")
            .build();

        let keys_generated = meter
            .u64_counter("comment_relay.keys_generated")
            .with_description("Request keys generated at load")
            .build();

        Self {
            requests,
            dispatch_latency,
            keys_generated,
        }
    }

    pub fn record_request(&self, route: &'static str, outcome: &'static str) {
        self.requests.add(
            1,
            &[
                KeyValue::new("route", route),
                KeyValue::new("outcome", outcome),
            ],
        );
    }

    pub fn record_dispatch(&self, success: bool, duration_ms: f64) {
        let outcome = if success { "success" } else { "failure" };
        self.dispatch_latency
            .record(duration_ms, &[KeyValue::new("outcome", outcome)]);
    }

    pub fn record_key_generated(&self) {
        self.keys_generated.add(1, &[]);
    }
}

/// Initialize OTLP metrics export. The provider is returned to the caller
/// rather than installed globally.
pub fn init_metrics(endpoint: &str, service_name: &str) -> Result<(SdkMeterProvider, RelayMetrics)> {
    info!("Initializing OTLP telemetry: endpoint={}", endpoint);

    let export_config = opentelemetry_otlp::ExportConfig {
        endpoint: Some(endpoint.to_string()),
        timeout: Duration::from_secs(10),
        ..Default::default()
    };

    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_http()
        .with_export_config(export_config)
        .build()
        .context("building OTLP metric exporter")?;

    let reader = opentelemetry_sdk::metrics::PeriodicReader::builder(
        exporter,
        opentelemetry_sdk::runtime::Tokio,
    )
    .with_interval(Duration::from_secs(30))
    .build();

    let resource = Resource::new(vec![
        KeyValue::new("service.name", service_name.to_string()),
        KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
    ]);

    let provider = SdkMeterProvider::builder()
        .with_reader(reader)
        .with_resource(resource)
        .build();

    let meter = provider.meter("comment-relayd");
    let metrics = RelayMetrics::new(&meter);

    Ok((provider, metrics))
}

pub fn shutdown_metrics(provider: SdkMeterProvider) -> Result<()> {
    info!("Shutting down telemetry");
    provider
        .shutdown()
        .context("shutting down meter provider")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_record_without_exporter() {
        let provider = SdkMeterProvider::builder().build();
        let meter = provider.meter("test");
        let metrics = RelayMetrics::new(&meter);

        metrics.record_request("comment", "ok");
        metrics.record_request("comment", "forbidden");
        metrics.record_dispatch(true, 12.5);
        metrics.record_dispatch(false, 3.0);
        metrics.record_key_generated();
    }
}
