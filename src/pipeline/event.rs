//! Stream event types for pipeline and batch progress
//!
//! Every event is `{type, payload}` delivered in order over one long-lived
//! channel, and renders to a Server-Sent Events frame for transport.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Log severity carried by `log` events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// One event in the batch stream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum BatchEvent {
    /// A row started processing; `current` reflects dispatch order
    Progress { current: u64, total: u64, sku: String },
    /// Human-readable progress line
    Log { message: String, level: LogLevel },
    /// Per-item terminal content
    Done(Value),
    /// Terminal failure of one pipeline run
    Error { message: String },
    /// Batch-wide terminal event carrying the output artifact
    Finished(Value),
}

impl BatchEvent {
    pub fn progress(current: u64, total: u64, sku: impl Into<String>) -> Self {
        Self::Progress {
            current,
            total,
            sku: sku.into(),
        }
    }

    pub fn log(message: impl Into<String>, level: LogLevel) -> Self {
        Self::Log {
            message: message.into(),
            level,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::log(message, LogLevel::Info)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::log(message, LogLevel::Warning)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn done(payload: Value) -> Self {
        Self::Done(payload)
    }

    pub fn finished(payload: Value) -> Self {
        Self::Finished(payload)
    }

    /// Event type name as it appears on the wire
    pub fn event_type(&self) -> &'static str {
        match self {
            BatchEvent::Progress { .. } => "progress",
            BatchEvent::Log { .. } => "log",
            BatchEvent::Done(_) => "done",
            BatchEvent::Error { .. } => "error",
            BatchEvent::Finished(_) => "finished",
        }
    }

    /// The payload object alone
    pub fn payload(&self) -> Value {
        match self {
            BatchEvent::Progress { current, total, sku } => json!({
                "current": current,
                "total": total,
                "sku": sku,
            }),
            BatchEvent::Log { message, level } => json!({
                "message": message,
                "level": level,
            }),
            BatchEvent::Done(payload) => payload.clone(),
            BatchEvent::Error { message } => json!({ "message": message }),
            BatchEvent::Finished(payload) => payload.clone(),
        }
    }

    /// Render as a Server-Sent Events frame
    pub fn to_sse(&self) -> String {
        format!("event: {}\ndata: {}\n\n", self.event_type(), self.payload())
    }
}
