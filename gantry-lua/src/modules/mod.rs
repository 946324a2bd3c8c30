//! Sandbox module implementations

pub mod log;

pub use log::{LogModule, LogSink, NullSink};
