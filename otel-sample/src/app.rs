//! Application builder and entry point for serving.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::AppConfig;
use crate::database::Db;
use crate::error::StartupError;
use crate::middleware::{
    Middleware, MiddlewareStack, RecoverMiddleware, RequestLogMiddleware, TraceContextMiddleware,
};
use crate::observability::{Telemetry, TracingConfig};
use crate::router::Router;
use crate::server::{Service, serve};
use crate::state::AppState;
use crate::users;

pub struct App {
    pub(crate) router: Router,
    pub(crate) state: AppState,
    pub(crate) middlewares: MiddlewareStack,
}

impl App {
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            state: AppState::new(),
            middlewares: MiddlewareStack::new(),
        }
    }

    pub fn router(mut self, router: Router) -> Self {
        self.router = router;
        self
    }

    pub fn state<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.state = self.state.with(value);
        self
    }

    pub fn middleware<M: Middleware>(mut self, middleware: M) -> Self {
        self.middlewares.add(middleware);
        self
    }

    /// Serves on `addr` until ctrl-c, then drains open connections.
    pub async fn listen(self, addr: &str) -> std::io::Result<()> {
        let addr: SocketAddr = addr.parse().map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid listen address '{}': {}", addr, e),
            )
        })?;
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "listening");

        serve(self.into_service(), listener, shutdown_signal()).await
    }

    pub(crate) fn into_service(self) -> Arc<Service> {
        Arc::new(Service::new(self.router, self.state, self.middlewares))
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

/// The users API: trace context, request log and panic recovery around the
/// `/users` routes, with `db` shared by every handler.
pub fn build_app(db: Db, telemetry: &Telemetry) -> App {
    App::new()
        .state(db)
        .middleware(TraceContextMiddleware::new(telemetry.propagator()))
        .middleware(RequestLogMiddleware::new())
        .middleware(RecoverMiddleware::new())
        .router(users::routes())
}

/// Starts the service and serves until ctrl-c.
///
/// Order matters: the tracer comes up first so the database connection and
/// schema setup are traced, and it is flushed on every return path,
/// including the error ones. `logging` installs the global log subscriber;
/// pass `None` when the caller already owns one.
pub async fn run(config: AppConfig, logging: Option<TracingConfig>) -> Result<(), StartupError> {
    let telemetry = Telemetry::init(&config.telemetry())?;
    if let Some(logging) = logging {
        logging.init(Some(&telemetry))?;
    }
    telemetry.install_global();

    tracing::info!(
        service = %config.service_name,
        endpoint = %config.otlp_endpoint,
        "tracer initialized"
    );

    let db = config.database.connect().await?;
    if config.create_schema {
        users::create_table(&db).await?;
        tracing::info!("users table ready");
    }

    build_app(db, &telemetry)
        .listen(&config.listen_addr())
        .await?;

    tracing::info!("server stopped, flushing spans");
    telemetry.shutdown()?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c, serving until killed");
        std::future::pending::<()>().await;
    }
}
