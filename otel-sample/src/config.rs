//! Configuration loading from environment variables.
//!
//! Every setting has a default matching a local development stack, so the
//! binary starts with no environment at all. A `.env` file in the working
//! directory is honored via [`load_dotenv`].
//!
//! Parsing goes through a lookup function rather than `std::env` directly,
//! which lets tests feed a map of values without touching the process
//! environment.

use std::net::SocketAddr;
use std::str::FromStr;

use crate::database::DatabaseConfig;
use crate::observability::TelemetryConfig;

pub const DEFAULT_SERVICE_NAME: &str = "otel-sample";
pub const DEFAULT_OTLP_ENDPOINT: &str = "localhost:4317";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

/// Load environment variables from a `.env` file if it exists.
///
/// Call this at the start of the application before reading config.
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for environment variable '{key}'")]
    Invalid { key: String, value: String },
}

/// Returns the value of `key`, or `default` when it is unset or empty.
pub fn lookup_or<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Parses the value of `key`, falling back to `default` when it is unset.
///
/// A value that is set but does not parse is an error, not a silent default.
pub fn lookup_parsed_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

/// Like [`lookup_parsed_or`], but also accepts `1`/`0`, `yes`/`no` and
/// `on`/`off` in any case.
pub fn lookup_bool_or<F>(lookup: &F, key: &str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key: key.to_string(),
            value,
        }),
    }
}

/// Process configuration.
///
/// | Variable | Default |
/// |---|---|
/// | `SERVICE_NAME` | `otel-sample` |
/// | `OTEL_EXPORTER_OTLP_ENDPOINT` | `localhost:4317` |
/// | `HOST` / `PORT` | `0.0.0.0` / `8080` |
/// | `LOG_JSON` | `false` |
/// | `DATABASE_CREATE_SCHEMA` | `false` |
///
/// Database variables are documented on [`DatabaseConfig::from_lookup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub service_name: String,
    pub otlp_endpoint: String,
    pub host: String,
    pub port: u16,
    pub log_json: bool,
    /// Create the `users` table at startup if it is missing.
    pub create_schema: bool,
    pub database: DatabaseConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            service_name: lookup_or(&lookup, "SERVICE_NAME", DEFAULT_SERVICE_NAME),
            otlp_endpoint: lookup_or(&lookup, "OTEL_EXPORTER_OTLP_ENDPOINT", DEFAULT_OTLP_ENDPOINT),
            host: lookup_or(&lookup, "HOST", DEFAULT_HOST),
            port: lookup_parsed_or(&lookup, "PORT", DEFAULT_PORT)?,
            log_json: lookup_bool_or(&lookup, "LOG_JSON", false)?,
            create_schema: lookup_bool_or(&lookup, "DATABASE_CREATE_SCHEMA", false)?,
            database: DatabaseConfig::from_lookup(&lookup)?,
        })
    }

    pub fn telemetry(&self) -> TelemetryConfig {
        TelemetryConfig::new(&self.service_name, &self.otlp_endpoint)
            .service_version(env!("CARGO_PKG_VERSION"))
    }

    /// `host:port`, bracketing IPv6 hosts.
    pub fn listen_addr(&self) -> String {
        match self.host.parse::<std::net::IpAddr>() {
            Ok(ip) => SocketAddr::new(ip, self.port).to_string(),
            Err(_) => format!("{}:{}", self.host, self.port),
        }
    }
}
