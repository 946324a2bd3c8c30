//! Log sinks connecting template output to the host
//!
//! Concrete implementations of the `LogSink` abstraction from gantry-lua:
//! the engine routes template log calls into `tracing`, and tests (or hosts
//! that attach template output to their own reporting) collect them in a
//! shared buffer.

use std::sync::{Arc, Mutex};

use gantry_core::{LogEntry, LogLevel};
use gantry_lua::LogSink;
use uuid::Uuid;

/// Sink that forwards template log output to the host's `tracing`
/// subscriber, tagged with the invocation id.
pub struct TracingLogSink {
    invocation_id: Uuid,
}

impl TracingLogSink {
    pub fn new(invocation_id: Uuid) -> Self {
        Self { invocation_id }
    }
}

impl LogSink for TracingLogSink {
    fn write(&mut self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => {
                tracing::debug!(invocation_id = %self.invocation_id, "template: {message}")
            }
            LogLevel::Info => {
                tracing::info!(invocation_id = %self.invocation_id, "template: {message}")
            }
            LogLevel::Warning => {
                tracing::warn!(invocation_id = %self.invocation_id, "template: {message}")
            }
            LogLevel::Error => {
                tracing::error!(invocation_id = %self.invocation_id, "template: {message}")
            }
        }
    }
}

/// Sink that appends entries to a shared in-memory buffer.
#[derive(Clone, Default)]
pub struct BufferedLogSink {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl BufferedLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains all collected entries.
    pub fn drain(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|mut entries| entries.drain(..).collect())
            .unwrap_or_default()
    }
}

impl LogSink for BufferedLogSink {
    fn write(&mut self, level: LogLevel, message: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(LogEntry {
                timestamp: chrono::Utc::now(),
                level,
                message: message.to_string(),
            });
        }
    }
}
