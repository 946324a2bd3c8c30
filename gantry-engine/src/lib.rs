//! Gantry Engine
//!
//! The evaluation pipeline for Gantry templates: assemble a context, execute
//! the template in a sandbox, validate the returned value against the
//! manifest schema, and normalize the result.
//!
//! Architecture:
//! - Configuration: resource limits and policy knobs, env-overridable
//! - Context builder: caller inputs plus host run metadata
//! - Evaluator: compile (cached) -> execute -> validate -> normalize
//! - Sinks: route template log output into `tracing` or a buffer
//!
//! Every evaluation is independent; the only shared state is the bytecode
//! cache, which never carries interpreter state between invocations.

mod cache;
pub mod cancel;
pub mod config;
pub mod context;
pub mod evaluator;
pub mod normalize;
pub mod sinks;
pub mod validator;

pub use cancel::CancelToken;
pub use config::EngineConfig;
pub use context::ContextBuilder;
pub use evaluator::{EvaluationResult, Evaluator};
pub use sinks::{BufferedLogSink, TracingLogSink};

pub use gantry_core::{
    Context, ErrorKind, ErrorReport, EvalError, Manifest, SchemaVersion, Step, ValidationPolicy,
    Violation,
};
