use std::time::{Duration, Instant};

/// Per-request bookkeeping shared with middleware and handlers.
///
/// The trace id is filled in by the trace-context middleware once the
/// request span exists; requests served without it carry `None`.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub trace_id: Option<String>,
    pub start_time: Instant,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            trace_id: None,
            start_time: Instant::now(),
        }
    }

    /// Attaches a trace id while keeping the original start time.
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
