use hyper::body::Incoming;
use hyper::{Request, Response};
use tracing::{info, warn};

use crate::context::RequestContext;
use crate::response::BoxBody;

use super::{BoxFuture, Middleware, Next};

/// Logs one line per request with method, path, status and latency.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLogMiddleware;

impl RequestLogMiddleware {
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for RequestLogMiddleware {
    fn handle<'a>(
        &'a self,
        req: Request<Incoming>,
        ctx: &'a RequestContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response<BoxBody>> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        // The trace-context middleware stores an updated context on the request.
        let trace_id = req
            .extensions()
            .get::<RequestContext>()
            .and_then(|c| c.trace_id.clone())
            .or_else(|| ctx.trace_id.clone())
            .unwrap_or_default();

        Box::pin(async move {
            let response = next.run(req).await;
            let status = response.status().as_u16();
            let duration_ms = ctx.elapsed().as_millis() as u64;

            if response.status().is_server_error() {
                warn!(%method, %path, status, duration_ms, %trace_id, "request failed");
            } else {
                info!(%method, %path, status, duration_ms, %trace_id, "request completed");
            }

            response
        })
    }
}
