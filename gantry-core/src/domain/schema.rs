//! Manifest schema versions and validation policy

use serde::{Deserialize, Serialize};

/// Recognized manifest schema versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemaVersion {
    #[serde(rename = "1")]
    V1,
}

impl SchemaVersion {
    /// The schema tag stamped into manifests.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1 => "1",
        }
    }

    /// Parses a schema tag, returning `None` for unrecognized versions.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "1" => Some(Self::V1),
            _ => None,
        }
    }
}

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the validator treats unknown fields on manifests and steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationPolicy {
    /// Unknown fields are violations.
    #[default]
    Strict,
    /// Unknown fields pass through to the normalized manifest unchanged.
    Lenient,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_version_parse() {
        assert_eq!(SchemaVersion::parse("1"), Some(SchemaVersion::V1));
        assert_eq!(SchemaVersion::parse("2"), None);
        assert_eq!(SchemaVersion::parse(""), None);
    }

    #[test]
    fn test_schema_version_serde_tag() {
        assert_eq!(
            serde_json::to_value(SchemaVersion::V1).unwrap(),
            serde_json::json!("1")
        );
    }

    #[test]
    fn test_policy_default_is_strict() {
        assert_eq!(ValidationPolicy::default(), ValidationPolicy::Strict);
    }
}
