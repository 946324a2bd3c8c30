//! Manifest normalization
//!
//! Last stage of the evaluation pipeline: takes a value the validator has
//! already accepted and produces the canonical [`Manifest`]. Step order is
//! preserved exactly; only surrounding whitespace is trimmed and the schema
//! version stamped. No defaults are assigned that would change observable
//! step behavior.

use gantry_core::{EvalError, Manifest, SchemaVersion, Step, ValidationPolicy, Violation};
use serde_json::{Map, Value};

/// Produces the canonical manifest from a validated raw value.
///
/// Pure: the same validated input always yields the same manifest.
///
/// # Errors
/// The validator runs first on the public evaluate path, so the error
/// branches here are unreachable there; they exist to keep this function
/// total when called on its own.
pub fn normalize_manifest(
    value: Value,
    schema: SchemaVersion,
    policy: ValidationPolicy,
) -> Result<Manifest, EvalError> {
    let Value::Object(mut manifest) = value else {
        return Err(unexpected("manifest is not a mapping"));
    };

    let steps = match manifest.remove("steps") {
        Some(Value::Array(steps)) => steps,
        _ => return Err(unexpected("steps is not a sequence")),
    };
    manifest.remove("version");

    let steps = steps
        .into_iter()
        .map(|step| normalize_step(step, policy))
        .collect::<Result<Vec<_>, _>>()?;

    let extra = match policy {
        ValidationPolicy::Lenient => manifest,
        ValidationPolicy::Strict => Map::new(),
    };

    Ok(Manifest {
        version: schema.as_str().to_string(),
        steps,
        extra,
    })
}

fn normalize_step(step: Value, policy: ValidationPolicy) -> Result<Step, EvalError> {
    let Value::Object(mut step) = step else {
        return Err(unexpected("step is not a mapping"));
    };

    let name = take_string(&mut step, "name")?;
    let image = take_string(&mut step, "image")?;

    let commands = match step.remove("commands") {
        Some(Value::Array(commands)) => commands
            .into_iter()
            .map(|command| match command {
                Value::String(command) => Ok(command.trim().to_string()),
                _ => Err(unexpected("command is not a string")),
            })
            .collect::<Result<Vec<_>, _>>()?,
        _ => return Err(unexpected("commands is not a sequence")),
    };

    let extra = match policy {
        ValidationPolicy::Lenient => step,
        ValidationPolicy::Strict => Map::new(),
    };

    Ok(Step {
        name,
        image,
        commands,
        extra,
    })
}

fn take_string(map: &mut Map<String, Value>, field: &str) -> Result<String, EvalError> {
    match map.remove(field) {
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        _ => Err(unexpected(&format!("{field} is not a string"))),
    }
}

fn unexpected(message: &str) -> EvalError {
    EvalError::SchemaValidation {
        violations: vec![Violation {
            path: String::new(),
            message: message.to_string(),
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stamps_version_and_trims() {
        let manifest = normalize_manifest(
            json!({
                "steps": [
                    { "name": "  build ", "image": " golang:1.21", "commands": [" go build ", "go test"] }
                ]
            }),
            SchemaVersion::V1,
            ValidationPolicy::Strict,
        )
        .unwrap();

        assert_eq!(manifest.version, "1");
        assert_eq!(manifest.steps[0].name, "build");
        assert_eq!(manifest.steps[0].image, "golang:1.21");
        assert_eq!(manifest.steps[0].commands, vec!["go build", "go test"]);
    }

    #[test]
    fn test_step_order_is_preserved() {
        let manifest = normalize_manifest(
            json!({
                "version": "1",
                "steps": [
                    { "name": "zeta", "image": "x", "commands": ["z"] },
                    { "name": "alpha", "image": "x", "commands": ["a"] },
                    { "name": "mid", "image": "x", "commands": ["m"] }
                ]
            }),
            SchemaVersion::V1,
            ValidationPolicy::Strict,
        )
        .unwrap();

        let names: Vec<&str> = manifest.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_lenient_carries_unknown_fields() {
        let value = json!({
            "version": "1",
            "labels": { "team": "ci" },
            "steps": [
                { "name": "build", "image": "x", "commands": ["make"], "retries": 2 }
            ]
        });

        let manifest =
            normalize_manifest(value, SchemaVersion::V1, ValidationPolicy::Lenient).unwrap();
        assert_eq!(manifest.extra["labels"]["team"], "ci");
        assert_eq!(manifest.steps[0].extra["retries"], 2);
    }

    #[test]
    fn test_pure_on_same_input() {
        let value = json!({
            "steps": [
                { "name": "build", "image": "x", "commands": ["make"] }
            ]
        });

        let first =
            normalize_manifest(value.clone(), SchemaVersion::V1, ValidationPolicy::Strict).unwrap();
        let second =
            normalize_manifest(value, SchemaVersion::V1, ValidationPolicy::Strict).unwrap();
        assert_eq!(first, second);
    }
}
