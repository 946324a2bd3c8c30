//! Logging module for template scripts
//!
//! This module provides a trait-based abstraction for logging that allows
//! different hosts to provide their own implementations:
//! - Engine: forward template output to the tracing subscriber
//! - Tests: collect entries in an in-memory buffer
//!
//! The module also rebinds the global `print` so templates cannot write to
//! the host's stdout; `print` output lands in the sink at info level.

use crate::module::SandboxModule;
use gantry_core::LogLevel;
use mlua::prelude::*;

/// Trait for log sinks
///
/// Implement this trait to provide custom logging behavior. The LogModule
/// is generic over this trait, allowing different hosts to provide their
/// own implementations.
///
/// # Thread Safety
/// Implementations must be Send + Sync to work with Lua's threading model.
pub trait LogSink: Send + Sync {
    /// Write a log message
    ///
    /// # Arguments
    /// * `level` - The log level (Debug, Info, Warning, Error)
    /// * `message` - The log message content
    fn write(&mut self, level: LogLevel, message: &str);
}

/// Sink that discards every message.
///
/// Useful for compile-only checks where template output is irrelevant.
pub struct NullSink;

impl LogSink for NullSink {
    fn write(&mut self, _level: LogLevel, _message: &str) {}
}

/// Logging module for template scripts
///
/// Generic over LogSink trait to allow different implementations depending
/// on the host.
pub struct LogModule<S: LogSink> {
    sink: std::sync::Arc<std::sync::Mutex<S>>,
}

impl<S: LogSink + 'static> LogModule<S> {
    /// Creates a new LogModule with the provided sink
    pub fn new(sink: S) -> Self {
        Self {
            sink: std::sync::Arc::new(std::sync::Mutex::new(sink)),
        }
    }

    fn level_fn(&self, lua: &Lua, level: LogLevel) -> LuaResult<LuaFunction> {
        let sink = self.sink.clone();
        lua.create_function(move |_, msg: String| {
            sink.lock()
                .map_err(|e| LuaError::RuntimeError(format!("Failed to lock sink: {}", e)))?
                .write(level, &msg);
            Ok(())
        })
    }
}

impl<S: LogSink + 'static> SandboxModule for LogModule<S> {
    fn id(&self) -> &'static str {
        "log"
    }

    fn register(&self, lua: &Lua) -> LuaResult<()> {
        let log_table = lua.create_table()?;

        log_table.set("debug", self.level_fn(lua, LogLevel::Debug)?)?;
        log_table.set("info", self.level_fn(lua, LogLevel::Info)?)?;
        log_table.set("warning", self.level_fn(lua, LogLevel::Warning)?)?;
        log_table.set("error", self.level_fn(lua, LogLevel::Error)?)?;

        // print(...) goes to the sink, never to host stdout
        {
            let sink = self.sink.clone();
            let print_fn = lua.create_function(move |_, args: LuaMultiValue| {
                let rendered = args
                    .iter()
                    .map(display_value)
                    .collect::<Vec<_>>()
                    .join("\t");
                sink.lock()
                    .map_err(|e| LuaError::RuntimeError(format!("Failed to lock sink: {}", e)))?
                    .write(LogLevel::Info, &rendered);
                Ok(())
            })?;
            lua.globals().set("print", print_fn)?;
        }

        lua.globals().set(self.id(), log_table)?;
        Ok(())
    }
}

fn display_value(value: &LuaValue) -> String {
    match value {
        LuaValue::Nil => "nil".to_string(),
        LuaValue::Boolean(b) => b.to_string(),
        LuaValue::Integer(i) => i.to_string(),
        LuaValue::Number(n) => n.to_string(),
        LuaValue::String(s) => s.to_string_lossy().to_string(),
        other => format!("<{}>", other.type_name()),
    }
}
