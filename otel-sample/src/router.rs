//! HTTP routing.
//!
//! The [`Router`] matches a request's method and path against registered
//! patterns, in registration order, and calls the first matching handler.
//! Patterns capture a segment with the `:param` syntax.

use std::sync::Arc;

use http::{Method, Request, Response};
use hyper::body::Incoming;

use crate::error::Error;
use crate::extract::{PathParams, extract_path_params};
use crate::handler::Handler;
use crate::middleware::BoxFuture;
use crate::response::{BoxBody, IntoResponse};
use crate::state::AppState;

type HandlerFn = Box<
    dyn Fn(Request<Incoming>, PathParams, Arc<AppState>) -> BoxFuture<'static, Response<BoxBody>>
        + Send
        + Sync,
>;

pub(crate) struct Route {
    pub(crate) pattern: String,
    handler: HandlerFn,
}

/// Routes requests to handlers.
///
/// ```
/// use otel_sample::prelude::*;
///
/// async fn health() -> &'static str {
///     "ok"
/// }
///
/// async fn show(id: Path<i32>) -> String {
///     format!("user {}", id.into_inner())
/// }
///
/// let router = Router::new()
///     .get("/health", health)
///     .get("/users/:id", show);
/// ```
pub struct Router {
    pub(crate) routes: Vec<(Method, Route)>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Adds a route with the given HTTP method and pattern.
    pub fn route<H, Args>(mut self, method: Method, pattern: &str, handler: H) -> Self
    where
        H: Handler<Args>,
        Args: 'static,
    {
        let handler: HandlerFn = Box::new(
            move |req: Request<Incoming>, params: PathParams, state: Arc<AppState>| {
                handler.call(req, params, state)
            },
        );
        self.routes.push((
            method,
            Route {
                pattern: pattern.to_string(),
                handler,
            },
        ));
        self
    }

    /// Adds a GET route.
    pub fn get<H, Args>(self, pattern: &str, handler: H) -> Self
    where
        H: Handler<Args>,
        Args: 'static,
    {
        self.route(Method::GET, pattern, handler)
    }

    /// Adds a POST route.
    pub fn post<H, Args>(self, pattern: &str, handler: H) -> Self
    where
        H: Handler<Args>,
        Args: 'static,
    {
        self.route(Method::POST, pattern, handler)
    }

    /// The first route registered for `method` whose pattern matches `path`.
    fn find(&self, method: &Method, path: &str) -> Option<(&Route, PathParams)> {
        self.routes
            .iter()
            .filter(|(route_method, _)| route_method == method)
            .find_map(|(_, route)| {
                extract_path_params(&route.pattern, path).map(|params| (route, params))
            })
    }

    /// The pattern that would serve `method` and `path`, e.g. `/users/:id`
    /// for `GET /users/7`.
    pub fn route_for(&self, method: &Method, path: &str) -> Option<&str> {
        self.find(method, path).map(|(route, _)| route.pattern.as_str())
    }

    /// Dispatches a request. Unmatched requests get a 404 error envelope.
    pub async fn handle(&self, req: Request<Incoming>, state: &Arc<AppState>) -> Response<BoxBody> {
        let matched = self.find(req.method(), req.uri().path());
        match matched {
            Some((route, params)) => (route.handler)(req, params, state.clone()).await,
            None => {
                tracing::debug!(method = %req.method(), path = %req.uri().path(), "no route matched");
                Error::not_found("not found").into_response()
            }
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
