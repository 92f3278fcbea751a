//! A users API wired end to end with OpenTelemetry.
//!
//! Requests flow through a small hyper-based stack (router, extractors,
//! middleware) into sea-orm queries. The trace-context middleware opens a
//! server span per request and every database statement runs inside a client
//! span nested under it, so one trace covers the whole request.

pub mod app;
pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod extract;
pub mod handler;
pub mod middleware;
pub mod observability;
pub mod response;
pub mod router;
mod server;
pub mod state;
pub mod testing;
pub mod users;

pub use sea_orm;

pub mod prelude {
    pub use crate::app::App;
    pub use crate::context::RequestContext;
    pub use crate::database::{Db, DbError};
    pub use crate::error::{Error, IntoApiError, Result};
    pub use crate::extract::{Json, Path};
    pub use crate::middleware::{Middleware, Next};
    pub use crate::observability::{Telemetry, TelemetryConfig, TracingConfig};
    pub use crate::response::IntoResponse;
    pub use crate::router::Router;

    pub use http::{Method, StatusCode};
    pub use serde::{Deserialize, Serialize};
}
