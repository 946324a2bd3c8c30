//! Gantry Lua Infrastructure
//!
//! This crate provides the sandboxed interpreter for the Gantry
//! template-evaluation engine. It includes:
//! - Module trait and registry for sandbox modules
//! - Restricted sandbox construction with resource ceilings
//! - The template log module and its sink abstraction
//! - Lua <-> JSON value conversion
//! - Template compilation and entry-point execution

pub mod interpreter;
pub mod module;
pub mod modules;
pub mod sandbox;
pub mod value;

pub use interpreter::{CHUNK_NAME, CompiledTemplate, ENTRY_POINT, Limits};
pub use module::{ModuleRegistry, SandboxModule};
pub use modules::{LogModule, LogSink, NullSink};
pub use sandbox::Sandbox;
