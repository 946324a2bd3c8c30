//! Evaluation context domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Key prefix reserved for host-injected context entries.
///
/// Caller inputs must not use this prefix; the context builder rejects them
/// before anything reaches the sandbox.
pub const RESERVED_PREFIX: &str = "gantry_";

/// Key under which run metadata is injected into every context.
pub const RUN_METADATA_KEY: &str = "gantry_run";

/// Host-injected metadata describing one evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub id: Uuid,
    pub requested_at: DateTime<Utc>,
}

/// Immutable input value for one template invocation.
///
/// Built once by the context builder and never mutated afterwards. The
/// interpreter hands each invocation a fresh Lua copy of these entries, so
/// template-side writes are invisible to the host and to other invocations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    entries: Map<String, Value>,
}

impl Context {
    /// Wraps an already-checked entry map.
    ///
    /// Callers go through the engine's context builder, which enforces the
    /// reserved namespace and the nesting-depth ceiling before constructing
    /// this value.
    pub fn from_entries(entries: Map<String, Value>) -> Self {
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Run metadata injected by the context builder, if present.
    pub fn run_metadata(&self) -> Option<RunMetadata> {
        self.entries
            .get(RUN_METADATA_KEY)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// The full context as a JSON object, ready for sandbox injection.
    pub fn to_value(&self) -> Value {
        Value::Object(self.entries.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_metadata_round_trip() {
        let meta = RunMetadata {
            id: Uuid::new_v4(),
            requested_at: Utc::now(),
        };

        let mut entries = Map::new();
        entries.insert("vars".to_string(), serde_json::json!({ "image": "alpine" }));
        entries.insert(
            RUN_METADATA_KEY.to_string(),
            serde_json::to_value(&meta).unwrap(),
        );

        let context = Context::from_entries(entries);
        assert_eq!(context.run_metadata().unwrap().id, meta.id);
        assert_eq!(context.get("vars").unwrap()["image"], "alpine");
    }

    #[test]
    fn test_to_value_is_an_object() {
        let context = Context::from_entries(Map::new());
        assert!(context.to_value().is_object());
    }
}
