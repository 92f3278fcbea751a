//! Server spans with W3C trace-context propagation.

use http::HeaderMap;
use http::header::{HeaderName, HeaderValue};
use hyper::body::Incoming;
use hyper::{Request, Response};
use opentelemetry::propagation::{Extractor, Injector};
use opentelemetry::trace::{Status, TraceContextExt};
use tracing::field::Empty;
use tracing::{Instrument, Span, debug, info_span};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::context::RequestContext;
use crate::observability::SharedPropagator;
use crate::response::BoxBody;

use super::{BoxFuture, Middleware, Next};

/// Reads propagation fields from request headers.
pub struct HeaderExtractor<'a>(pub &'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(HeaderName::as_str).collect()
    }
}

/// Writes propagation fields into response headers.
pub struct HeaderInjector<'a>(pub &'a mut HeaderMap);

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            self.0.insert(name, value);
        }
    }
}

/// Opens a server span for every request.
///
/// An incoming `traceparent` header makes the span a child of the remote
/// caller; otherwise it starts a new trace. The span is named after the
/// matched route (`GET /users/:id`), records the response status, is marked
/// as an error on 5xx, and its context is written back into the response
/// headers. Spans opened while the request is handled, database queries
/// included, nest under it.
pub struct TraceContextMiddleware {
    propagator: SharedPropagator,
}

impl TraceContextMiddleware {
    pub fn new(propagator: SharedPropagator) -> Self {
        Self { propagator }
    }
}

impl Middleware for TraceContextMiddleware {
    fn handle<'a>(
        &'a self,
        mut req: Request<Incoming>,
        ctx: &'a RequestContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response<BoxBody>> {
        let parent = self.propagator.extract(&HeaderExtractor(req.headers()));
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let route = next.route(&req);

        // Unmatched paths stay out of the span name to keep names bounded.
        let name = match route {
            Some(route) => format!("{} {}", method, route),
            None => method.to_string(),
        };
        let span = info_span!(
            "http.request",
            otel.name = %name,
            otel.kind = "server",
            http.request.method = %method,
            url.path = %path,
            http.route = route,
            trace_id = Empty,
        );
        if let Err(err) = span.set_parent(parent) {
            debug!(error = %err, "request span not exported");
        }

        let span_context = span.context().span().span_context().clone();
        if span_context.is_valid() {
            let trace_id = span_context.trace_id().to_string();
            span.record("trace_id", trace_id.as_str());
            req.extensions_mut()
                .insert(ctx.clone().with_trace_id(trace_id));
        }

        Box::pin(
            async move {
                let mut response = next.run(req).await;
                let current = Span::current();
                let status = response.status();

                current.set_attribute("http.response.status_code", i64::from(status.as_u16()));
                if status.is_server_error() {
                    current.set_status(Status::error(status.to_string()));
                }

                self.propagator
                    .inject_context(&current.context(), &mut HeaderInjector(response.headers_mut()));

                response
            }
            .instrument(span),
        )
    }
}
