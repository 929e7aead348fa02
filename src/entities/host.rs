//! Host registration records

use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::io::Read;

use crate::core::validate::{self, ValidationError};

/// One row of a host registration CSV
///
/// ```text
/// Name,Serial,UUID,OSProfile,Site,Metadata
/// edge-01,FZBC123,4c4c4544-0044-3510-8051-b7c04f4e5a32,microvisor-nonrt,sj-lab,env=prod&tier=edge
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HostImportRecord {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Serial", default)]
    pub serial: String,
    #[serde(rename = "UUID", default)]
    pub uuid: String,
    #[serde(rename = "OSProfile", default)]
    pub os_profile: String,
    #[serde(rename = "Site", default)]
    pub site: String,
    #[serde(rename = "Metadata", default)]
    pub metadata: String,
}

/// Canonical 8-4-4-4-12 hex form
pub fn is_uuid(value: &str) -> bool {
    let groups: Vec<&str> = value.split('-').collect();
    groups.len() == 5
        && groups
            .iter()
            .zip([8, 4, 4, 4, 12])
            .all(|(g, len)| g.len() == len && g.chars().all(|c| c.is_ascii_hexdigit()))
}

impl HostImportRecord {
    /// Check the row without touching the backend
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.serial.is_empty() && self.uuid.is_empty() {
            return Err(ValidationError::Field {
                field: "host",
                message: "either Serial or UUID is required".to_string(),
            });
        }
        if !self.uuid.is_empty() && !is_uuid(&self.uuid) {
            return Err(ValidationError::Field {
                field: "UUID",
                message: format!("'{}' is not a UUID", self.uuid),
            });
        }
        if !self.name.is_empty() {
            validate::resource_name("host", &self.name)?;
        }
        self.metadata_pairs()?;
        Ok(())
    }

    /// Display name: explicit name, else serial, else UUID
    pub fn display_name(&self) -> &str {
        [&self.name, &self.serial, &self.uuid]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Metadata is written as `k=v&k2=v2` to stay inside one CSV cell
    pub fn metadata_pairs(&self) -> Result<BTreeMap<String, String>, ValidationError> {
        let pairs: Vec<String> = self
            .metadata
            .split('&')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        validate::parse_labels(&pairs)
    }

    pub fn register_body(&self, auto_onboard: bool) -> Value {
        registration_body(
            self.display_name(),
            Some(self.serial.as_str()).filter(|s| !s.is_empty()),
            Some(self.uuid.as_str()).filter(|s| !s.is_empty()),
            auto_onboard,
        )
    }
}

/// Request body for `POST /compute/hosts/register`
pub fn registration_body(
    name: &str,
    serial: Option<&str>,
    uuid: Option<&str>,
    auto_onboard: bool,
) -> Value {
    let mut body = Map::new();
    body.insert("name".into(), json!(name));
    if let Some(serial) = serial {
        body.insert("serialNumber".into(), json!(serial));
    }
    if let Some(uuid) = uuid {
        body.insert("uuid".into(), json!(uuid));
    }
    body.insert("autoOnboard".into(), json!(auto_onboard));
    Value::Object(body)
}

/// Read every record from a CSV source
pub fn read_records<R: Read>(reader: R) -> Result<Vec<HostImportRecord>, csv::Error> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader)
        .deserialize()
        .collect()
}
