//! OpenTelemetry tracer provider bootstrap.
//!
//! [`Telemetry`] is constructed once at startup and passed to whatever needs
//! it: the log subscriber takes its [`layer`](Telemetry::layer), the HTTP
//! middleware takes its [`propagator`](Telemetry::propagator). Nothing on the
//! request path reads process-global OpenTelemetry state, so tests can build
//! their own instance around an in-memory exporter.
//!
//! Dropping the value flushes pending spans and shuts the provider down.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use opentelemetry::propagation::TextMapPropagator;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{KeyValue, global};
use opentelemetry_otlp::{ExporterBuildError, WithExportConfig};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::error::OTelSdkError;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{SdkTracer, SdkTracerProvider, SpanExporter};
use tracing::Subscriber;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::registry::LookupSpan;

/// A propagator shared between the telemetry handle and request middleware.
pub type SharedPropagator = Arc<dyn TextMapPropagator + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid collector endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("failed to build span exporter: {0}")]
    Exporter(#[from] ExporterBuildError),
    #[error("failed to flush spans: {0}")]
    Flush(#[source] OTelSdkError),
    #[error("failed to shut down tracer provider: {0}")]
    Shutdown(#[source] OTelSdkError),
}

/// Where spans go and what they are attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Reported as the `service.name` resource attribute.
    pub service_name: String,
    /// OTLP/gRPC collector address. A bare `host:port` is dialed over
    /// plain-text HTTP/2.
    pub endpoint: String,
    /// Reported as `service.version` when set.
    pub service_version: Option<String>,
}

impl TelemetryConfig {
    pub fn new(service_name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            endpoint: endpoint.into(),
            service_version: None,
        }
    }

    pub fn service_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = Some(version.into());
        self
    }

    /// The endpoint as a URL the exporter can dial.
    pub fn endpoint_url(&self) -> Result<String, TelemetryError> {
        let endpoint = self.endpoint.trim();
        let url = if endpoint.contains("://") {
            endpoint.to_string()
        } else {
            format!("http://{}", endpoint)
        };

        let invalid = |reason: String| TelemetryError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            reason,
        };
        let uri: http::Uri = url.parse().map_err(|e: http::uri::InvalidUri| invalid(e.to_string()))?;
        match uri.scheme_str() {
            Some("http") | Some("https") => {}
            other => {
                return Err(invalid(format!(
                    "unsupported scheme '{}'",
                    other.unwrap_or_default()
                )));
            }
        }
        if uri.host().is_none_or(str::is_empty) {
            return Err(invalid("missing host".to_string()));
        }

        Ok(url)
    }
}

/// Owns the tracer provider for the lifetime of the process.
#[derive(Debug)]
pub struct Telemetry {
    provider: SdkTracerProvider,
    propagator: SharedPropagator,
    service_name: String,
    shut_down: AtomicBool,
}

impl Telemetry {
    /// Builds a provider exporting over OTLP/gRPC to `config.endpoint`.
    ///
    /// Must be called inside a tokio runtime.
    pub fn init(config: &TelemetryConfig) -> Result<Self, TelemetryError> {
        let endpoint = config.endpoint_url()?;
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build()?;

        Ok(Self::with_exporter(config, exporter))
    }

    /// Builds a provider around any span exporter, batching spans before
    /// export.
    pub fn with_exporter<E>(config: &TelemetryConfig, exporter: E) -> Self
    where
        E: SpanExporter + 'static,
    {
        let mut resource = Resource::builder().with_service_name(config.service_name.clone());
        if let Some(version) = &config.service_version {
            resource = resource.with_attribute(KeyValue::new("service.version", version.clone()));
        }

        let provider = SdkTracerProvider::builder()
            .with_resource(resource.build())
            .with_batch_exporter(exporter)
            .build();

        Self {
            provider,
            propagator: Arc::new(TraceContextPropagator::new()),
            service_name: config.service_name.clone(),
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn provider(&self) -> &SdkTracerProvider {
        &self.provider
    }

    pub fn tracer(&self) -> SdkTracer {
        self.provider.tracer(self.service_name.clone())
    }

    /// A `tracing` layer that turns spans into OpenTelemetry spans on this
    /// provider.
    pub fn layer<S>(&self) -> OpenTelemetryLayer<S, SdkTracer>
    where
        S: Subscriber + for<'span> LookupSpan<'span>,
    {
        tracing_opentelemetry::layer().with_tracer(self.tracer())
    }

    pub fn propagator(&self) -> SharedPropagator {
        self.propagator.clone()
    }

    /// Registers the provider and a W3C propagator process-wide, for
    /// libraries that look them up through `opentelemetry::global`.
    pub fn install_global(&self) {
        global::set_tracer_provider(self.provider.clone());
        global::set_text_map_propagator(TraceContextPropagator::new());
    }

    /// Exports every finished span now.
    pub fn force_flush(&self) -> Result<(), TelemetryError> {
        self.provider.force_flush().map_err(TelemetryError::Flush)
    }

    /// Flushes and shuts the provider down. Only the first call does any
    /// work; later calls return `Ok(())`.
    pub fn shutdown(&self) -> Result<(), TelemetryError> {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.provider.shutdown().map_err(TelemetryError::Shutdown)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }
}

impl Drop for Telemetry {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            tracing::warn!(error = %err, "telemetry shutdown failed");
        }
    }
}
