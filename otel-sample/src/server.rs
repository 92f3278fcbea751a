use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::context::RequestContext;
use crate::middleware::MiddlewareStack;
use crate::response::BoxBody;
use crate::router::Router;
use crate::state::AppState;

/// Pause after a failed accept. Errors such as `EMFILE` repeat until a
/// descriptor frees up, so retrying at once spins the loop.
pub(crate) const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Everything a connection needs to answer requests.
pub(crate) struct Service {
    router: Router,
    state: Arc<AppState>,
    middlewares: MiddlewareStack,
}

impl Service {
    pub(crate) fn new(router: Router, state: AppState, middlewares: MiddlewareStack) -> Self {
        Self {
            router,
            state: Arc::new(state),
            middlewares,
        }
    }

    async fn call(&self, mut req: Request<Incoming>) -> Response<BoxBody> {
        let ctx = RequestContext::new();
        req.extensions_mut().insert(ctx.clone());
        self.middlewares
            .execute(req, &self.router, &self.state, &ctx)
            .await
    }
}

/// Accepts connections until `shutdown` resolves, then waits for in-flight
/// connections to finish.
pub(crate) async fn serve<F>(
    service: Arc<Service>,
    listener: TcpListener,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()>,
{
    let graceful = GracefulShutdown::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(err) => {
                        warn!(error = %err, "failed to accept connection");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                        continue;
                    }
                };

                let service = service.clone();
                let conn = http1::Builder::new().serve_connection(
                    TokioIo::new(stream),
                    service_fn(move |req: Request<Incoming>| {
                        let service = service.clone();
                        async move { Ok::<_, Infallible>(service.call(req).await) }
                    }),
                );
                let conn = graceful.watch(conn);

                tokio::spawn(async move {
                    if let Err(err) = conn.await {
                        debug!(error = %err, %peer, "connection closed with error");
                    }
                });
            }
            _ = &mut shutdown => {
                info!("shutdown signal received, draining connections");
                break;
            }
        }
    }

    drop(listener);
    graceful.shutdown().await;
    Ok(())
}
