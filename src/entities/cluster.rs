//! Cluster templates

use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

use crate::core::validate::{self, ValidationError};

/// A cluster template addressed as `<name>-v<major>.<minor>.<patch>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRef {
    pub name: String,
    pub version: String,
}

impl TemplateRef {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Path segment under the cluster manager's `/templates`
    pub fn api_path(&self) -> String {
        format!("/templates/{}/versions/{}", self.name, self.version)
    }

    /// Build from a template resource returned by the API
    pub fn from_value(value: &Value) -> Option<Self> {
        let name = value.get("name")?.as_str()?;
        let version = value.get("version")?.as_str()?;
        Some(Self::new(name, version))
    }

    pub fn to_value(&self) -> Value {
        json!({ "name": self.name, "version": self.version })
    }
}

impl fmt::Display for TemplateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.version)
    }
}

impl FromStr for TemplateRef {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Template names may contain dashes; the version is after the last "-v"
        let split = s.rfind("-v").ok_or_else(|| ValidationError::Field {
            field: "template",
            message: format!("'{}' must be <name>-vX.Y.Z", s),
        })?;
        let (name, version) = (&s[..split], &s[split + 1..]);
        validate::dns_label("template", name)?;
        validate::template_version(version)?;
        Ok(Self::new(name, version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_template_ref() {
        let t: TemplateRef = "baseline-k3s-v0.0.3".parse().unwrap();
        assert_eq!(t.name, "baseline-k3s");
        assert_eq!(t.version, "v0.0.3");
        assert_eq!(t.to_string(), "baseline-k3s-v0.0.3");
        assert_eq!(t.api_path(), "/templates/baseline-k3s/versions/v0.0.3");
    }

    #[test]
    fn test_parse_template_ref_rejects_bad_input() {
        assert!("baseline".parse::<TemplateRef>().is_err());
        assert!("baseline-v1.2".parse::<TemplateRef>().is_err());
        assert!("-v1.2.3".parse::<TemplateRef>().is_err());
    }
}
