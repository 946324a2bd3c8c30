//! Evaluation orchestration
//!
//! One public operation: take template source and caller inputs, produce a
//! normalized manifest or a structured error. The stages run strictly in
//! sequence per call: context builder -> interpreter -> validator ->
//! normalizer. Independent calls run concurrently and share nothing but the
//! bytecode cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use gantry_core::{Context, EvalError, Manifest, SchemaVersion, ValidationPolicy};
use gantry_lua::CompiledTemplate;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::TemplateCache;
use crate::cancel::CancelToken;
use crate::config::EngineConfig;
use crate::context::ContextBuilder;
use crate::normalize::normalize_manifest;
use crate::sinks::TracingLogSink;
use crate::validator::validate_manifest;

/// Outcome of one `evaluate` call.
pub type EvaluationResult = Result<Manifest, EvalError>;

/// Extra wall-clock allowance for the blocking worker to surface a watchdog
/// trip before the call is abandoned.
const WORKER_GRACE: Duration = Duration::from_secs(2);

/// Evaluates templates into normalized manifests.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct Evaluator {
    config: EngineConfig,
    cache: TemplateCache,
}

impl Evaluator {
    pub fn new(config: EngineConfig) -> Self {
        let cache = TemplateCache::new(config.cache_enabled);
        Self { config, cache }
    }

    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    /// Evaluates `source` against the given inputs.
    ///
    /// Equivalent to [`evaluate_with_cancel`](Self::evaluate_with_cancel)
    /// with a token nobody cancels.
    pub async fn evaluate(
        &self,
        source: &str,
        inputs: HashMap<String, Value>,
        schema: SchemaVersion,
        policy: ValidationPolicy,
    ) -> EvaluationResult {
        self.evaluate_with_cancel(source, inputs, schema, policy, CancelToken::new())
            .await
    }

    /// Evaluates `source`, honoring `cancel` while the template runs.
    ///
    /// Every exit path is one of the documented [`EvalError`] kinds; no
    /// partial manifest is ever surfaced as success.
    pub async fn evaluate_with_cancel(
        &self,
        source: &str,
        inputs: HashMap<String, Value>,
        schema: SchemaVersion,
        policy: ValidationPolicy,
        cancel: CancelToken,
    ) -> EvaluationResult {
        let context = ContextBuilder::new(self.config.max_context_depth).build(inputs)?;
        let invocation_id = context.run_metadata().map(|m| m.id).unwrap_or_default();
        debug!(%invocation_id, "starting template evaluation");

        let template = self.cache.get_or_compile(source)?;
        let raw = self
            .run_template(template, &context, invocation_id, &cancel)
            .await?;

        validate_manifest(&raw, schema, policy)?;
        let manifest = normalize_manifest(raw, schema, policy)?;

        info!(
            %invocation_id,
            steps = manifest.steps.len(),
            "template evaluation succeeded"
        );
        Ok(manifest)
    }

    /// Number of distinct templates currently cached.
    pub fn cached_templates(&self) -> usize {
        self.cache.len()
    }

    async fn run_template(
        &self,
        template: Arc<CompiledTemplate>,
        context: &Context,
        invocation_id: Uuid,
        cancel: &CancelToken,
    ) -> Result<Value, EvalError> {
        let limits = self.config.limits();
        let ctx_value = context.to_value();
        let sink = TracingLogSink::new(invocation_id);
        let flag = cancel.flag();
        let worker_limits = limits.clone();

        let worker = tokio::task::spawn_blocking(move || {
            template.execute(&ctx_value, &worker_limits, sink, flag)
        });

        match tokio::time::timeout(limits.timeout + WORKER_GRACE, worker).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => {
                warn!(%invocation_id, error = %join_err, "evaluation worker failed");
                Err(EvalError::TemplateResource(
                    "evaluation worker failed".to_string(),
                ))
            }
            // The watchdog normally trips first; this backstop covers
            // templates that swallow the watchdog error inside pcall.
            Err(_elapsed) => {
                warn!(%invocation_id, "evaluation worker abandoned past its deadline");
                if cancel.is_cancelled() {
                    Err(EvalError::Cancelled)
                } else {
                    Err(EvalError::TemplateTimeout {
                        timeout_ms: limits.timeout.as_millis() as u64,
                    })
                }
            }
        }
    }
}
