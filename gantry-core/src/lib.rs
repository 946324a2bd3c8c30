//! Gantry Core
//!
//! Core types and abstractions for the Gantry template-evaluation engine.
//!
//! This crate contains:
//! - Domain types: manifests, evaluation contexts, schema versions, log entries
//! - Error taxonomy: every way an evaluation can terminate short of a manifest
//! - DTOs: wire-facing error reports for host systems

pub mod domain;
pub mod dto;
pub mod error;

pub use domain::context::{Context, RESERVED_PREFIX, RUN_METADATA_KEY, RunMetadata};
pub use domain::log::{LogEntry, LogLevel};
pub use domain::manifest::{Manifest, Step};
pub use domain::schema::{SchemaVersion, ValidationPolicy};
pub use dto::ErrorReport;
pub use error::{ErrorKind, EvalError, Result, SourcePosition, Violation};
