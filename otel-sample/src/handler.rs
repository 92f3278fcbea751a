//! Adapters from async functions to routable handlers.
//!
//! A handler is an async function whose arguments are extractors. The last
//! argument may consume the body ([`FromRequest`]); any earlier argument must
//! be a [`FromRequestParts`] extractor.

use std::future::Future;
use std::sync::Arc;

use http::{Request, Response};
use hyper::body::Incoming;

use crate::extract::{FromRequest, FromRequestParts, PathParams};
use crate::middleware::BoxFuture;
use crate::response::{BoxBody, IntoResponse};
use crate::state::AppState;

pub trait Handler<Args>: Clone + Send + Sync + 'static {
    fn call(
        &self,
        req: Request<Incoming>,
        params: PathParams,
        state: Arc<AppState>,
    ) -> BoxFuture<'static, Response<BoxBody>>;
}

impl<F, Fut, Out> Handler<()> for F
where
    F: Fn() -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Out> + Send + 'static,
    Out: IntoResponse + 'static,
{
    fn call(
        &self,
        _req: Request<Incoming>,
        _params: PathParams,
        _state: Arc<AppState>,
    ) -> BoxFuture<'static, Response<BoxBody>> {
        let fut = (self)();
        Box::pin(async move { fut.await.into_response() })
    }
}

impl<F, Fut, Out, T1> Handler<(T1,)> for F
where
    F: Fn(T1) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Out> + Send + 'static,
    Out: IntoResponse + 'static,
    T1: FromRequest + Send + 'static,
{
    fn call(
        &self,
        req: Request<Incoming>,
        params: PathParams,
        state: Arc<AppState>,
    ) -> BoxFuture<'static, Response<BoxBody>> {
        let handler = self.clone();
        Box::pin(async move {
            match T1::from_request(req, &params, &state).await {
                Ok(t1) => handler(t1).await.into_response(),
                Err(err) => err.into_response(),
            }
        })
    }
}

impl<F, Fut, Out, T1, T2> Handler<(T1, T2)> for F
where
    F: Fn(T1, T2) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Out> + Send + 'static,
    Out: IntoResponse + 'static,
    T1: FromRequestParts + 'static,
    T2: FromRequest + Send + 'static,
{
    fn call(
        &self,
        req: Request<Incoming>,
        params: PathParams,
        state: Arc<AppState>,
    ) -> BoxFuture<'static, Response<BoxBody>> {
        let handler = self.clone();
        Box::pin(async move {
            let (parts, body) = req.into_parts();
            let t1 = match T1::from_request_parts(&parts, &params, &state).await {
                Ok(value) => value,
                Err(err) => return err.into_response(),
            };
            let req = Request::from_parts(parts, body);
            match T2::from_request(req, &params, &state).await {
                Ok(t2) => handler(t1, t2).await.into_response(),
                Err(err) => err.into_response(),
            }
        })
    }
}
