//! Logging and trace export.
//!
//! [`Telemetry`] owns the OpenTelemetry tracer provider; [`TracingConfig`]
//! installs the `tracing` subscriber that feeds it.

mod telemetry;
mod tracing;

pub use self::telemetry::{SharedPropagator, Telemetry, TelemetryConfig, TelemetryError};
pub use self::tracing::TracingConfig;
