//! Orchestrator feature flags
//!
//! The orchestrator advertises which of its optional components are installed.
//! Flags are fetched at login and stored in the config file; command groups
//! backed by a missing component are refused before any request is made.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Path of the orchestrator info endpoint
pub const INFO_PATH: &str = "/v1/orchestrator/info";

/// Optional orchestrator components that gate command groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    EdgeInfra,
    ClusterOrch,
    AppOrch,
    Multitenancy,
    DeviceManagement,
}

impl Feature {
    pub fn all() -> &'static [Feature] {
        &[
            Feature::EdgeInfra,
            Feature::ClusterOrch,
            Feature::AppOrch,
            Feature::Multitenancy,
            Feature::DeviceManagement,
        ]
    }

    /// Key used by the info endpoint and the config file
    pub fn key(&self) -> &'static str {
        match self {
            Feature::EdgeInfra => "edge-infra",
            Feature::ClusterOrch => "cluster-orch",
            Feature::AppOrch => "app-orch",
            Feature::Multitenancy => "multitenancy",
            Feature::DeviceManagement => "device-management",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Orchestrator identity as persisted in the config file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OrchestratorInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub features: BTreeMap<String, bool>,
}

impl OrchestratorInfo {
    /// Parse the info endpoint response
    ///
    /// Accepts `features` either as a list of `{name, installed}` entries or as a
    /// `{name: {installed}}` / `{name: bool}` map.
    pub fn from_response(value: &Value) -> Self {
        let version = value
            .get("version")
            .and_then(Value::as_str)
            .map(String::from);

        let mut features = BTreeMap::new();
        match value.get("features") {
            Some(Value::Array(entries)) => {
                for entry in entries {
                    if let Some(name) = entry.get("name").and_then(Value::as_str) {
                        let installed = entry
                            .get("installed")
                            .and_then(Value::as_bool)
                            .unwrap_or(false);
                        features.insert(name.to_string(), installed);
                    }
                }
            }
            Some(Value::Object(map)) => {
                for (name, flag) in map {
                    let installed = match flag {
                        Value::Bool(b) => *b,
                        other => other
                            .get("installed")
                            .and_then(Value::as_bool)
                            .unwrap_or(false),
                    };
                    features.insert(name.clone(), installed);
                }
            }
            _ => {}
        }

        Self { version, features }
    }

    /// A feature absent from the stored map counts as enabled
    pub fn is_enabled(&self, feature: Feature) -> bool {
        self.features.get(feature.key()).copied().unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_feature_list() {
        let info = OrchestratorInfo::from_response(&json!({
            "version": "v3.1.0",
            "features": [
                {"name": "cluster-orch", "installed": true},
                {"name": "app-orch", "installed": false}
            ]
        }));
        assert_eq!(info.version.as_deref(), Some("v3.1.0"));
        assert!(info.is_enabled(Feature::ClusterOrch));
        assert!(!info.is_enabled(Feature::AppOrch));
    }

    #[test]
    fn test_parse_feature_map() {
        let info = OrchestratorInfo::from_response(&json!({
            "features": {
                "edge-infra": {"installed": true},
                "multitenancy": false
            }
        }));
        assert!(info.is_enabled(Feature::EdgeInfra));
        assert!(!info.is_enabled(Feature::Multitenancy));
    }

    #[test]
    fn test_unknown_feature_defaults_enabled() {
        let info = OrchestratorInfo::default();
        for feature in Feature::all() {
            assert!(info.is_enabled(*feature));
        }
    }

    #[test]
    fn test_feature_keys_are_kebab_case() {
        assert_eq!(Feature::DeviceManagement.to_string(), "device-management");
        assert_eq!(Feature::ClusterOrch.key(), "cluster-orch");
    }
}
