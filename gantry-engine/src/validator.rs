//! Manifest schema validation
//!
//! The validator treats the interpreter's return value as untrusted data:
//! every check runs and every violation is reported, so one evaluation
//! yields one complete report instead of a fail-fast drip.

use std::collections::HashSet;

use gantry_core::{EvalError, SchemaVersion, ValidationPolicy, Violation};
use serde_json::Value;

const MANIFEST_FIELDS: &[&str] = &["version", "steps"];
const STEP_FIELDS: &[&str] = &["name", "image", "commands"];

/// Checks a raw returned value against the manifest schema.
///
/// The value itself is left untouched; on success the caller hands the same
/// value to the normalizer. A missing `version` is tolerated here because
/// the normalizer stamps it; a present `version` must name the requested
/// schema.
///
/// # Errors
/// Returns `SchemaValidation` carrying every violation found.
pub fn validate_manifest(
    value: &Value,
    schema: SchemaVersion,
    policy: ValidationPolicy,
) -> Result<(), EvalError> {
    let mut violations = Vec::new();

    let Some(manifest) = value.as_object() else {
        violations.push(violation(
            "",
            format!("manifest must be a mapping, found {}", type_name(value)),
        ));
        return Err(EvalError::SchemaValidation { violations });
    };

    match manifest.get("version") {
        None => {} // stamped by the normalizer
        Some(Value::String(tag)) => {
            if SchemaVersion::parse(tag).is_none() {
                violations.push(violation(
                    "version",
                    format!("`{tag}` is not a recognized schema version"),
                ));
            } else if tag != schema.as_str() {
                violations.push(violation(
                    "version",
                    format!("expected schema version `{}`, found `{tag}`", schema.as_str()),
                ));
            }
        }
        Some(other) => violations.push(violation(
            "version",
            format!("must be a string, found {}", type_name(other)),
        )),
    }

    match manifest.get("steps") {
        None => violations.push(violation("steps", "is required")),
        Some(Value::Array(steps)) => {
            if steps.is_empty() {
                violations.push(violation("steps", "must not be empty"));
            }
            let mut seen_names = HashSet::new();
            for (idx, step) in steps.iter().enumerate() {
                validate_step(step, idx, policy, &mut seen_names, &mut violations);
            }
        }
        Some(other) => violations.push(violation(
            "steps",
            format!("must be a sequence, found {}", type_name(other)),
        )),
    }

    if policy == ValidationPolicy::Strict {
        for key in manifest.keys() {
            if !MANIFEST_FIELDS.contains(&key.as_str()) {
                violations.push(violation(key, "unknown field"));
            }
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(EvalError::SchemaValidation { violations })
    }
}

fn validate_step(
    step: &Value,
    idx: usize,
    policy: ValidationPolicy,
    seen_names: &mut HashSet<String>,
    violations: &mut Vec<Violation>,
) {
    let path = format!("steps[{idx}]");

    let Some(step) = step.as_object() else {
        violations.push(violation(
            &path,
            format!("must be a mapping, found {}", type_name(step)),
        ));
        return;
    };

    match step.get("name") {
        None => violations.push(violation(format!("{path}.name"), "is required")),
        Some(Value::String(name)) => {
            let name = name.trim();
            if name.is_empty() {
                violations.push(violation(format!("{path}.name"), "must not be empty"));
            } else if !seen_names.insert(name.to_string()) {
                violations.push(violation(
                    format!("{path}.name"),
                    format!("duplicate step name `{name}`"),
                ));
            }
        }
        Some(other) => violations.push(violation(
            format!("{path}.name"),
            format!("must be a string, found {}", type_name(other)),
        )),
    }

    match step.get("image") {
        None => violations.push(violation(format!("{path}.image"), "is required")),
        Some(Value::String(image)) => {
            if image.trim().is_empty() {
                violations.push(violation(format!("{path}.image"), "must not be empty"));
            }
        }
        Some(other) => violations.push(violation(
            format!("{path}.image"),
            format!("must be a string, found {}", type_name(other)),
        )),
    }

    match step.get("commands") {
        None => violations.push(violation(format!("{path}.commands"), "is required")),
        Some(Value::Array(commands)) => {
            if commands.is_empty() {
                violations.push(violation(format!("{path}.commands"), "must not be empty"));
            }
            for (i, command) in commands.iter().enumerate() {
                match command {
                    Value::String(command) if !command.trim().is_empty() => {}
                    Value::String(_) => violations.push(violation(
                        format!("{path}.commands[{i}]"),
                        "must not be empty",
                    )),
                    other => violations.push(violation(
                        format!("{path}.commands[{i}]"),
                        format!("must be a string, found {}", type_name(other)),
                    )),
                }
            }
        }
        Some(other) => violations.push(violation(
            format!("{path}.commands"),
            format!("must be a sequence, found {}", type_name(other)),
        )),
    }

    if policy == ValidationPolicy::Strict {
        for key in step.keys() {
            if !STEP_FIELDS.contains(&key.as_str()) {
                violations.push(violation(format!("{path}.{key}"), "unknown field"));
            }
        }
    }
}

fn violation(path: impl Into<String>, message: impl Into<String>) -> Violation {
    Violation {
        path: path.into(),
        message: message.into(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}
