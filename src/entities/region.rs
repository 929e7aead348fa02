//! Regions and sites
//!
//! Only the fields the CLI reasons about are typed; everything else is carried
//! through untouched in the raw JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reference to another resource by ID
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRef {
    #[serde(default)]
    pub resource_id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub resource_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub parent_region: Option<ResourceRef>,
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl Region {
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    /// Parent region ID, from either the nested reference or the flat field
    pub fn parent(&self) -> Option<&str> {
        self.parent_region
            .as_ref()
            .map(|p| p.resource_id.as_str())
            .or(self.parent_id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub resource_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub region: Option<ResourceRef>,
}

impl Site {
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}
