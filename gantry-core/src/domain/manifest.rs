//! Manifest domain types

use serde::{Deserialize, Serialize};

/// A validated, normalized pipeline manifest.
///
/// Structure shared between the evaluation engine (produces) and downstream
/// pipeline executors (consume). Step order is significant and is preserved
/// exactly as the template returned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Schema tag, e.g. `"1"`
    pub version: String,
    /// Ordered pipeline steps
    pub steps: Vec<Step>,
    /// Unknown manifest fields carried through under the lenient policy
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One unit of pipeline work: an execution environment plus the commands to
/// run in it, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Step name, unique within its manifest
    pub name: String,
    /// Execution environment identifier, e.g. a container image reference
    pub image: String,
    /// Commands executed in sequence
    pub commands: Vec<String>,
    /// Unknown step fields carried through under the lenient policy
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_wire_shape() {
        let manifest = Manifest {
            version: "1".to_string(),
            steps: vec![Step {
                name: "build".to_string(),
                image: "golang:1.21".to_string(),
                commands: vec!["go build".to_string(), "go test".to_string()],
                extra: serde_json::Map::new(),
            }],
            extra: serde_json::Map::new(),
        };

        let json = serde_json::to_value(&manifest).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "version": "1",
                "steps": [
                    {
                        "name": "build",
                        "image": "golang:1.21",
                        "commands": ["go build", "go test"]
                    }
                ]
            })
        );
    }

    #[test]
    fn test_unknown_fields_round_trip() {
        let manifest: Manifest = serde_json::from_value(serde_json::json!({
            "version": "1",
            "labels": { "team": "ci" },
            "steps": [
                { "name": "build", "image": "x", "commands": ["make"], "retries": 2 }
            ]
        }))
        .unwrap();

        assert_eq!(manifest.extra["labels"]["team"], "ci");
        assert_eq!(manifest.steps[0].extra["retries"], 2);
    }
}
