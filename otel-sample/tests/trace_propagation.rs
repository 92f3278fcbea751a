//! Integration tests for request and query spans.
//!
//! Each test installs a thread-scoped subscriber; the default `tokio::test`
//! runtime is single-threaded, so the server task spawned by the test client
//! sees the same subscriber.

mod common;

use http::StatusCode;
use opentelemetry::trace::{SpanId, SpanKind, Status, TraceId};
use otel_sample::app::build_app;
use otel_sample::testing::TestClient;
use otel_sample::users::NewUser;
use tracing_subscriber::layer::SubscriberExt;

use common::{TRACEPARENT, attribute, finished_spans, span_named};

#[tokio::test]
async fn test_query_span_is_child_of_request_span() {
    let (telemetry, recorder) = common::telemetry();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(telemetry.layer()));

    let client = TestClient::new(build_app(common::memory_db().await, &telemetry)).await;
    let response = client.get("/users").send().await;
    assert_eq!(response.status(), StatusCode::OK);

    let spans = finished_spans(&telemetry, &recorder);
    let server = span_named(&spans, "GET /users");
    let query = span_named(&spans, "SELECT users");

    assert_eq!(server.span_kind, SpanKind::Server);
    assert_eq!(query.parent_span_id, server.span_context.span_id());
    assert_eq!(query.span_context.trace_id(), server.span_context.trace_id());

    assert_eq!(attribute(query, "db.system").as_deref(), Some("sqlite"));
    assert_eq!(attribute(query, "db.sql.table").as_deref(), Some("users"));
    assert!(
        attribute(query, "db.statement")
            .map(|sql| sql.contains("FROM"))
            .unwrap_or(false)
    );
}

#[tokio::test]
async fn test_request_span_is_named_after_route() {
    let (telemetry, recorder) = common::telemetry();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(telemetry.layer()));

    let client = TestClient::new(build_app(common::memory_db().await, &telemetry)).await;
    let created = client
        .post("/users")
        .json(&NewUser::new("Ada", "ada@example.com"))
        .send()
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let response = client.get("/users/1").send().await;
    assert_eq!(response.status(), StatusCode::OK);

    let spans = finished_spans(&telemetry, &recorder);
    let post = span_named(&spans, "POST /users");
    let get = span_named(&spans, "GET /users/:id");

    assert_eq!(attribute(get, "http.route").as_deref(), Some("/users/:id"));
    assert_eq!(attribute(get, "url.path").as_deref(), Some("/users/1"));
    assert_eq!(
        attribute(get, "http.response.status_code").as_deref(),
        Some("200")
    );
    assert_eq!(
        attribute(post, "http.response.status_code").as_deref(),
        Some("201")
    );

    let insert = span_named(&spans, "INSERT users");
    assert_eq!(insert.parent_span_id, post.span_context.span_id());
}

#[tokio::test]
async fn test_unmatched_path_is_named_by_method_only() {
    let (telemetry, recorder) = common::telemetry();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(telemetry.layer()));

    let client = TestClient::new(build_app(common::memory_db().await, &telemetry)).await;
    let response = client.get("/no/such/path/42").send().await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let spans = finished_spans(&telemetry, &recorder);
    let server = span_named(&spans, "GET");
    assert_eq!(server.span_kind, SpanKind::Server);
    assert_eq!(attribute(server, "http.route"), None);
    assert_eq!(
        attribute(server, "url.path").as_deref(),
        Some("/no/such/path/42")
    );
    assert!(!spans.iter().any(|span| span.name.contains("/no/such")));
    assert!(!matches!(server.status, Status::Error { .. }));
}

#[tokio::test]
async fn test_incoming_traceparent_is_remote_parent() {
    let (telemetry, recorder) = common::telemetry();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(telemetry.layer()));

    let client = TestClient::new(build_app(common::memory_db().await, &telemetry)).await;
    let response = client
        .get("/users")
        .header("traceparent", TRACEPARENT)
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let spans = finished_spans(&telemetry, &recorder);
    let server = span_named(&spans, "GET /users");
    assert_eq!(
        server.span_context.trace_id(),
        TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap()
    );
    assert_eq!(
        server.parent_span_id,
        SpanId::from_hex("00f067aa0ba902b7").unwrap()
    );

    let traceparent = response
        .headers()
        .get("traceparent")
        .expect("response carries traceparent")
        .to_str()
        .unwrap();
    assert_eq!(
        traceparent,
        format!(
            "00-4bf92f3577b34da6a3ce929d0e0e4736-{}-01",
            server.span_context.span_id()
        )
    );
}

#[tokio::test]
async fn test_new_trace_without_traceparent() {
    let (telemetry, recorder) = common::telemetry();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(telemetry.layer()));

    let client = TestClient::new(build_app(common::memory_db().await, &telemetry)).await;
    let response = client.get("/users").send().await;

    let spans = finished_spans(&telemetry, &recorder);
    let server = span_named(&spans, "GET /users");
    assert_eq!(server.parent_span_id, SpanId::INVALID);

    let traceparent = response.headers().get("traceparent").unwrap().to_str().unwrap();
    assert!(traceparent.contains(&server.span_context.trace_id().to_string()));
}

#[tokio::test]
async fn test_failed_query_marks_spans_as_errors() {
    let (telemetry, recorder) = common::telemetry();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(telemetry.layer()));

    let client = TestClient::new(build_app(common::empty_db().await, &telemetry)).await;
    let response = client.get("/users").send().await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let spans = finished_spans(&telemetry, &recorder);
    let server = span_named(&spans, "GET /users");
    let query = span_named(&spans, "SELECT users");

    assert!(matches!(server.status, Status::Error { .. }));
    assert!(matches!(query.status, Status::Error { .. }));
    assert!(attribute(query, "error.message").is_some());
    assert_eq!(query.parent_span_id, server.span_context.span_id());
}

#[tokio::test]
async fn test_statement_text_can_be_withheld() {
    use otel_sample::database::DatabaseConfig;

    let (telemetry, recorder) = common::telemetry();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(telemetry.layer()));

    let db = DatabaseConfig::new("sqlite::memory:")
        .max_connections(1)
        .trace_statements(false)
        .connect()
        .await
        .unwrap();
    otel_sample::users::create_table(&db).await.unwrap();

    let spans = finished_spans(&telemetry, &recorder);
    let create = span_named(&spans, "CREATE users");
    assert_eq!(attribute(create, "db.statement"), None);
    assert_eq!(attribute(create, "db.sql.table").as_deref(), Some("users"));
}
