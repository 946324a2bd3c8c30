//! Context assembly for template invocations

use std::collections::HashMap;

use chrono::Utc;
use gantry_core::domain::context::{RESERVED_PREFIX, RUN_METADATA_KEY, RunMetadata};
use gantry_core::{Context, EvalError};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Builds the immutable context handed to a template invocation.
///
/// Caller inputs are checked against the reserved `gantry_` namespace and a
/// nesting-depth ceiling, then host run metadata is injected under
/// `gantry_run`. JSON nulls in inputs surface as `nil` inside the template.
pub struct ContextBuilder {
    max_depth: usize,
}

impl ContextBuilder {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Assembles a context from caller inputs.
    ///
    /// # Errors
    /// Returns `InvalidContext` if an input key uses the reserved prefix or
    /// an input value nests deeper than the configured ceiling.
    pub fn build(&self, inputs: HashMap<String, Value>) -> Result<Context, EvalError> {
        let mut entries = Map::new();

        for (key, value) in inputs {
            if key.starts_with(RESERVED_PREFIX) {
                return Err(EvalError::InvalidContext(format!(
                    "input key `{key}` uses the reserved `{RESERVED_PREFIX}` namespace"
                )));
            }
            check_depth(&value, &key, self.max_depth, 1)?;
            entries.insert(key, value);
        }

        let meta = RunMetadata {
            id: Uuid::new_v4(),
            requested_at: Utc::now(),
        };
        let meta_value =
            serde_json::to_value(&meta).map_err(|e| EvalError::InvalidContext(e.to_string()))?;
        entries.insert(RUN_METADATA_KEY.to_string(), meta_value);

        Ok(Context::from_entries(entries))
    }
}

fn check_depth(value: &Value, path: &str, max: usize, depth: usize) -> Result<(), EvalError> {
    if depth > max {
        return Err(EvalError::InvalidContext(format!(
            "input `{path}` exceeds the nesting limit of {max} levels"
        )));
    }

    match value {
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                check_depth(item, &format!("{path}[{i}]"), max, depth + 1)?;
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                check_depth(item, &format!("{path}.{key}"), max, depth + 1)?;
            }
        }
        _ => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::ErrorKind;
    use serde_json::json;

    fn inputs(value: Value) -> HashMap<String, Value> {
        HashMap::from([("vars".to_string(), value)])
    }

    #[test]
    fn test_build_injects_run_metadata() {
        let context = ContextBuilder::new(32)
            .build(inputs(json!({ "image": "golang:1.21" })))
            .unwrap();

        assert_eq!(context.get("vars").unwrap()["image"], "golang:1.21");
        assert!(context.run_metadata().is_some());
    }

    #[test]
    fn test_reserved_prefix_rejected() {
        let err = ContextBuilder::new(32)
            .build(HashMap::from([("gantry_vars".to_string(), json!({}))]))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidContext);
        assert!(err.to_string().contains("reserved"));
    }

    #[test]
    fn test_depth_ceiling() {
        let builder = ContextBuilder::new(3);

        assert!(builder.build(inputs(json!({ "a": { "b": 1 } }))).is_ok());

        let err = builder
            .build(inputs(json!({ "a": { "b": { "c": 1 } } })))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidContext);
        assert!(err.to_string().contains("nesting limit"));
    }

    #[test]
    fn test_null_inputs_are_allowed() {
        let context = ContextBuilder::new(32).build(inputs(json!(null))).unwrap();
        assert_eq!(context.get("vars").unwrap(), &Value::Null);
    }
}
