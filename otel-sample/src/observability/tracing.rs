use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt};

use super::Telemetry;

/// Crates whose own instrumentation would otherwise flood the log, or feed
/// the exporter's spans back into itself.
const QUIET_TARGETS: &[&str] = &["h2", "hyper_util", "tonic", "tower", "opentelemetry"];

/// Configuration for the log subscriber.
///
/// `RUST_LOG` overrides the level when set.
///
/// # Examples
///
/// ```ignore
/// use otel_sample::observability::TracingConfig;
///
/// TracingConfig::new().json().init(Some(&telemetry))?;
/// ```
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Output logs as JSON.
    pub json: bool,
    /// The minimum log level.
    pub level: Level,
    /// Include the target (module path) in logs.
    pub with_target: bool,
    /// Include the source file and line in logs.
    pub with_location: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            json: false,
            level: Level::INFO,
            with_target: true,
            with_location: false,
        }
    }
}

impl TracingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables JSON output format.
    pub fn json(mut self) -> Self {
        self.json = true;
        self
    }

    /// Sets the minimum log level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    pub fn with_location(mut self, enabled: bool) -> Self {
        self.with_location = enabled;
        self
    }

    /// The filter used when `RUST_LOG` is unset.
    pub fn default_directives(&self) -> String {
        let mut directives = self.level.to_string().to_lowercase();
        for target in QUIET_TARGETS {
            directives.push_str(&format!(",{}=warn", target));
        }
        directives
    }

    /// Installs the global subscriber: env filter, formatter and, when
    /// given, the span bridge to `telemetry`.
    pub fn init(self, telemetry: Option<&Telemetry>) -> Result<(), TryInitError> {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.default_directives()));

        let registry = tracing_subscriber::registry()
            .with(filter)
            .with(telemetry.map(|t| t.layer()));

        if self.json {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(self.with_target)
                        .with_file(self.with_location)
                        .with_line_number(self.with_location),
                )
                .try_init()
        } else {
            registry
                .with(
                    fmt::layer()
                        .with_target(self.with_target)
                        .with_file(self.with_location)
                        .with_line_number(self.with_location),
                )
                .try_init()
        }
    }
}
