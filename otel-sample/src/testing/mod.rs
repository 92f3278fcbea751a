//! Testing utilities.
//!
//! [`TestClient`] serves an app on a local port and drives it over real
//! HTTP, so tests exercise the same middleware and server loop as the binary.

mod client;

pub use client::{TestClient, TestRequestBuilder, TestResponse};
