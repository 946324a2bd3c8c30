//! Engine configuration
//!
//! Defines all configurable parameters for the evaluation engine: resource
//! ceilings for the sandbox, the context nesting limit, and the template
//! cache switch.

use std::time::Duration;

/// Engine configuration
///
/// All limits are configurable to allow tuning for different deployment
/// scenarios (interactive template validation vs batch evaluation).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Wall-clock budget per evaluation
    pub eval_timeout: Duration,

    /// Lua allocator ceiling per evaluation, in bytes
    pub memory_limit: usize,

    /// Instructions between watchdog checks inside the sandbox
    pub hook_interval: u32,

    /// Maximum nesting depth accepted in caller context inputs
    pub max_context_depth: usize,

    /// Whether compiled templates are cached by source digest
    pub cache_enabled: bool,
}

impl EngineConfig {
    /// Creates a new configuration with defaults
    pub fn new() -> Self {
        Self {
            eval_timeout: Duration::from_secs(10),
            memory_limit: 64 * 1024 * 1024,
            hook_interval: 4096,
            max_context_depth: 32,
            cache_enabled: true,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - GANTRY_EVAL_TIMEOUT_MS (default: 10000)
    /// - GANTRY_MEMORY_LIMIT_BYTES (default: 67108864)
    /// - GANTRY_HOOK_INTERVAL (default: 4096)
    /// - GANTRY_MAX_CONTEXT_DEPTH (default: 32)
    /// - GANTRY_CACHE_ENABLED (default: true)
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::new();

        if let Ok(raw) = std::env::var("GANTRY_EVAL_TIMEOUT_MS") {
            let millis: u64 = raw
                .parse()
                .map_err(|_| anyhow::anyhow!("GANTRY_EVAL_TIMEOUT_MS must be an integer"))?;
            config.eval_timeout = Duration::from_millis(millis);
        }

        if let Ok(raw) = std::env::var("GANTRY_MEMORY_LIMIT_BYTES") {
            config.memory_limit = raw
                .parse()
                .map_err(|_| anyhow::anyhow!("GANTRY_MEMORY_LIMIT_BYTES must be an integer"))?;
        }

        if let Ok(raw) = std::env::var("GANTRY_HOOK_INTERVAL") {
            config.hook_interval = raw
                .parse()
                .map_err(|_| anyhow::anyhow!("GANTRY_HOOK_INTERVAL must be an integer"))?;
        }

        if let Ok(raw) = std::env::var("GANTRY_MAX_CONTEXT_DEPTH") {
            config.max_context_depth = raw
                .parse()
                .map_err(|_| anyhow::anyhow!("GANTRY_MAX_CONTEXT_DEPTH must be an integer"))?;
        }

        if let Ok(raw) = std::env::var("GANTRY_CACHE_ENABLED") {
            config.cache_enabled = raw
                .parse()
                .map_err(|_| anyhow::anyhow!("GANTRY_CACHE_ENABLED must be true or false"))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.eval_timeout.is_zero() {
            anyhow::bail!("eval_timeout must be greater than 0");
        }

        if self.memory_limit == 0 {
            anyhow::bail!("memory_limit must be greater than 0");
        }

        if self.hook_interval == 0 {
            anyhow::bail!("hook_interval must be greater than 0");
        }

        if self.max_context_depth == 0 {
            anyhow::bail!("max_context_depth must be greater than 0");
        }

        Ok(())
    }

    /// Sandbox limits derived from this configuration.
    pub(crate) fn limits(&self) -> gantry_lua::Limits {
        gantry_lua::Limits {
            timeout: self.eval_timeout,
            memory_limit: self.memory_limit,
            hook_interval: self.hook_interval,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
