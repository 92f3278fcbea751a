#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use opentelemetry_sdk::error::OTelSdkResult;
use opentelemetry_sdk::trace::{SpanData, SpanExporter};
use otel_sample::database::{DatabaseConfig, Db};
use otel_sample::observability::{Telemetry, TelemetryConfig};
use otel_sample::users;

pub const TRACEPARENT: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

/// An empty sqlite database. One connection, so every query sees the same
/// in-memory store.
pub async fn empty_db() -> Db {
    DatabaseConfig::new("sqlite::memory:")
        .max_connections(1)
        .connect()
        .await
        .expect("failed to open sqlite")
}

/// An in-memory database with the `users` table created.
pub async fn memory_db() -> Db {
    let db = empty_db().await;
    users::create_table(&db)
        .await
        .expect("failed to create users table");
    db
}

/// Collects exported spans. Unlike the SDK's in-memory exporter it keeps
/// them when the provider shuts down, so tests can check what shutdown
/// flushed.
#[derive(Debug, Clone, Default)]
pub struct SpanRecorder {
    spans: Arc<Mutex<Vec<SpanData>>>,
}

impl SpanRecorder {
    pub fn spans(&self) -> Vec<SpanData> {
        self.spans.lock().expect("span recorder poisoned").clone()
    }
}

impl SpanExporter for SpanRecorder {
    async fn export(&self, batch: Vec<SpanData>) -> OTelSdkResult {
        self.spans
            .lock()
            .expect("span recorder poisoned")
            .extend(batch);
        Ok(())
    }
}

/// A telemetry handle exporting into a [`SpanRecorder`].
pub fn telemetry() -> (Telemetry, SpanRecorder) {
    let recorder = SpanRecorder::default();
    let telemetry = Telemetry::with_exporter(
        &TelemetryConfig::new("otel-sample-test", "localhost:4317"),
        recorder.clone(),
    );
    (telemetry, recorder)
}

/// Flushes `telemetry` and returns every span exported so far.
pub fn finished_spans(telemetry: &Telemetry, recorder: &SpanRecorder) -> Vec<SpanData> {
    telemetry.force_flush().expect("flush failed");
    recorder.spans()
}

pub fn span_named<'a>(spans: &'a [SpanData], name: &str) -> &'a SpanData {
    spans
        .iter()
        .find(|span| span.name == name)
        .unwrap_or_else(|| {
            let names: Vec<_> = spans.iter().map(|span| span.name.to_string()).collect();
            panic!("no span named {:?} among {:?}", name, names)
        })
}

/// The value of attribute `key` on `span`, as a string.
pub fn attribute(span: &SpanData, key: &str) -> Option<String> {
    span.attributes
        .iter()
        .find(|kv| kv.key.as_str() == key)
        .map(|kv| kv.value.as_str().into_owned())
}
