//! Compiled-template cache
//!
//! Pure performance optimization: a template is compiled to bytecode once
//! per distinct source and the bytecode shared read-only afterwards.
//! Execution always happens in a fresh sandbox, so the cache can never
//! carry interpreter state between invocations.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use gantry_core::EvalError;
use gantry_lua::CompiledTemplate;
use sha2::{Digest, Sha256};

pub(crate) struct TemplateCache {
    enabled: bool,
    entries: RwLock<HashMap<[u8; 32], Arc<CompiledTemplate>>>,
}

impl TemplateCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the compiled form of `source`, compiling at most once per
    /// distinct source under normal operation.
    ///
    /// Two racing first-compilations both succeed; the insert below keeps
    /// whichever landed first and the loser's identical compile is
    /// discarded, so concurrent callers can never observe divergent parses.
    pub fn get_or_compile(&self, source: &str) -> Result<Arc<CompiledTemplate>, EvalError> {
        if !self.enabled {
            return Ok(Arc::new(CompiledTemplate::compile(source)?));
        }

        let key: [u8; 32] = Sha256::digest(source.as_bytes()).into();

        if let Some(hit) = self
            .entries
            .read()
            .ok()
            .and_then(|entries| entries.get(&key).cloned())
        {
            return Ok(hit);
        }

        let compiled = Arc::new(CompiledTemplate::compile(source)?);
        let mut entries = self
            .entries
            .write()
            .map_err(|_| EvalError::TemplateResource("template cache lock poisoned".to_string()))?;
        Ok(Arc::clone(entries.entry(key).or_insert(compiled)))
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "function main(ctx) return { version = \"1\", steps = {} } end";

    #[test]
    fn test_compile_once_per_source() {
        let cache = TemplateCache::new(true);

        let first = cache.get_or_compile(SOURCE).unwrap();
        let second = cache.get_or_compile(SOURCE).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_distinct_sources_get_distinct_entries() {
        let cache = TemplateCache::new(true);

        cache.get_or_compile(SOURCE).unwrap();
        cache
            .get_or_compile("function main(ctx) return {} end")
            .unwrap();

        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_disabled_cache_stores_nothing() {
        let cache = TemplateCache::new(false);

        cache.get_or_compile(SOURCE).unwrap();
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_syntax_errors_are_not_cached() {
        let cache = TemplateCache::new(true);

        assert!(cache.get_or_compile("not lua!!!").is_err());
        assert_eq!(cache.len(), 0);
    }
}
