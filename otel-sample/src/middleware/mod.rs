//! Request middleware.
//!
//! Middleware runs in registration order around the router. Each one gets
//! the request and a [`Next`] to continue the chain, and returns the
//! response.

mod recover;
mod request_log;
mod trace_context;

pub use recover::RecoverMiddleware;
pub use request_log::RequestLogMiddleware;
pub use trace_context::{HeaderExtractor, HeaderInjector, TraceContextMiddleware};

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use hyper::body::Incoming;
use hyper::{Request, Response};

use crate::context::RequestContext;
use crate::response::BoxBody;
use crate::router::Router;
use crate::state::AppState;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait Middleware: Send + Sync + 'static {
    fn handle<'a>(
        &'a self,
        req: Request<Incoming>,
        ctx: &'a RequestContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response<BoxBody>>;
}

/// The rest of the chain: remaining middleware, then the router.
pub struct Next<'a> {
    middlewares: &'a [Arc<dyn Middleware>],
    router: &'a Router,
    state: &'a Arc<AppState>,
    ctx: &'a RequestContext,
}

impl<'a> Next<'a> {
    /// The route pattern the router will pick for `req`, if any.
    pub fn route(&self, req: &Request<Incoming>) -> Option<&'a str> {
        self.router.route_for(req.method(), req.uri().path())
    }

    pub async fn run(self, req: Request<Incoming>) -> Response<BoxBody> {
        match self.middlewares.split_first() {
            Some((current, rest)) => {
                let next = Next {
                    middlewares: rest,
                    ..self
                };
                current.handle(req, self.ctx, next).await
            }
            None => self.router.handle(req, self.state).await,
        }
    }
}

#[derive(Default)]
pub struct MiddlewareStack {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<M: Middleware>(&mut self, middleware: M) {
        self.middlewares.push(Arc::new(middleware));
    }

    pub async fn execute(
        &self,
        req: Request<Incoming>,
        router: &Router,
        state: &Arc<AppState>,
        ctx: &RequestContext,
    ) -> Response<BoxBody> {
        Next {
            middlewares: &self.middlewares,
            router,
            state,
            ctx,
        }
        .run(req)
        .await
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }
}
