//! Request extractors.
//!
//! Handler arguments implement [`FromRequest`] (may consume the body) or
//! [`FromRequestParts`] (headers, path and state only). A failed extraction
//! short-circuits the handler with the returned [`Error`].

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use http::{Request, StatusCode};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Error;
use crate::response::{BoxBody, IntoResponse, JSON_CONTENT_TYPE, with_body};
use crate::state::AppState;

/// JSON request body on the way in, JSON response body on the way out.
///
/// A body that is not valid JSON for `T` (including missing fields) is
/// rejected with 400 Bad Request.
#[derive(Debug)]
pub struct Json<T>(pub T);

/// The value of the route's path parameter, parsed with [`FromStr`].
#[derive(Debug)]
pub struct Path<T>(pub T);

/// Path parameters captured by the matched route pattern.
pub type PathParams = HashMap<String, String>;

/// Extractors that need the whole request, body included.
pub trait FromRequest: Sized {
    fn from_request(
        req: Request<Incoming>,
        params: &PathParams,
        state: &Arc<AppState>,
    ) -> impl std::future::Future<Output = Result<Self, Error>> + Send;
}

/// Extractors that only look at request metadata.
pub trait FromRequestParts: Sized + Send {
    fn from_request_parts(
        parts: &http::request::Parts,
        params: &PathParams,
        state: &Arc<AppState>,
    ) -> impl std::future::Future<Output = Result<Self, Error>> + Send;
}

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Path<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: DeserializeOwned + Send> FromRequest for Json<T> {
    async fn from_request(
        req: Request<Incoming>,
        _params: &PathParams,
        _state: &Arc<AppState>,
    ) -> Result<Self, Error> {
        let bytes = req
            .into_body()
            .collect()
            .await
            .map_err(|e| Error::bad_request(format!("failed to read body: {}", e)))?
            .to_bytes();

        serde_json::from_slice(&bytes)
            .map(Json)
            .map_err(|e| Error::bad_request(format!("invalid JSON: {}", e)))
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> http::Response<BoxBody> {
        match serde_json::to_vec(&self.0) {
            Ok(body) => with_body(StatusCode::OK, JSON_CONTENT_TYPE, body),
            Err(e) => Error::internal(format!("failed to serialize response: {}", e)).into_response(),
        }
    }
}

impl<T: FromStr + Send> FromRequestParts for Path<T>
where
    T::Err: std::fmt::Display,
{
    async fn from_request_parts(
        _parts: &http::request::Parts,
        params: &PathParams,
        _state: &Arc<AppState>,
    ) -> Result<Self, Error> {
        let value = params
            .values()
            .next()
            .ok_or_else(|| Error::bad_request("missing path param"))?;

        value
            .parse::<T>()
            .map(Path)
            .map_err(|e| Error::bad_request(format!("invalid path param: {}", e)))
    }
}

impl<T: FromRequestParts> FromRequest for T {
    async fn from_request(
        req: Request<Incoming>,
        params: &PathParams,
        state: &Arc<AppState>,
    ) -> Result<Self, Error> {
        let (parts, _body) = req.into_parts();
        Self::from_request_parts(&parts, params, state).await
    }
}

/// Matches `path` against a `pattern` such as `/users/:id`.
///
/// Returns the captured parameters, or `None` if the path does not match.
pub fn extract_path_params(pattern: &str, path: &str) -> Option<PathParams> {
    let pattern_parts: Vec<&str> = pattern.split('/').collect();
    let path_parts: Vec<&str> = path.split('/').collect();

    if pattern_parts.len() != path_parts.len() {
        return None;
    }

    let mut params = HashMap::new();

    for (pattern_part, path_part) in pattern_parts.iter().zip(path_parts.iter()) {
        if let Some(name) = pattern_part.strip_prefix(':') {
            if path_part.is_empty() {
                return None;
            }
            params.insert(name.to_string(), path_part.to_string());
        } else if pattern_part != path_part {
            return None;
        }
    }

    Some(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    fn parts() -> http::request::Parts {
        Request::builder()
            .uri("/users/42")
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    fn params(pairs: &[(&str, &str)]) -> PathParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_extract_path_params_static() {
        assert_eq!(extract_path_params("/users", "/users"), Some(PathParams::new()));
        assert!(extract_path_params("/users", "/accounts").is_none());
    }

    #[test]
    fn test_extract_path_params_single_param() {
        let params = extract_path_params("/users/:id", "/users/17").unwrap();
        assert_eq!(params.get("id"), Some(&"17".to_string()));
    }

    #[test]
    fn test_extract_path_params_length_mismatch() {
        assert!(extract_path_params("/users/:id", "/users").is_none());
        assert!(extract_path_params("/users/:id", "/users/1/posts").is_none());
    }

    #[test]
    fn test_extract_path_params_empty_segment() {
        assert!(extract_path_params("/users/:id", "/users/").is_none());
    }

    #[tokio::test]
    async fn test_path_extractor_parses() {
        let state = Arc::new(AppState::new());
        let Path(id) = Path::<i32>::from_request_parts(&parts(), &params(&[("id", "42")]), &state)
            .await
            .unwrap();
        assert_eq!(id, 42);
    }

    #[tokio::test]
    async fn test_path_extractor_invalid_value() {
        let state = Arc::new(AppState::new());
        let err = Path::<i32>::from_request_parts(&parts(), &params(&[("id", "abc")]), &state)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_path_extractor_missing_param() {
        let state = Arc::new(AppState::new());
        let err = Path::<String>::from_request_parts(&parts(), &PathParams::new(), &state)
            .await
            .unwrap_err();
        assert_eq!(err.message, "missing path param");
    }

    #[tokio::test]
    async fn test_json_into_response() {
        let response = Json(serde_json::json!({"id": 1, "name": "Ada"})).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(http::header::CONTENT_TYPE).unwrap(),
            JSON_CONTENT_TYPE
        );

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["name"], "Ada");
    }
}
