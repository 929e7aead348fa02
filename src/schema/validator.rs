//! Manifest validation against embedded JSON schemas

use miette::Diagnostic;
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

use crate::schema::registry::{ManifestKind, SchemaRegistry};
use crate::yaml::{parse_manifest_file, YamlError};

#[derive(Debug, Error, Diagnostic)]
pub enum ManifestError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] YamlError),

    #[error("{file} is not a valid {kind} manifest:\n{}", .violations.join("\n"))]
    #[diagnostic(code(orch::manifest::schema))]
    Invalid {
        kind: ManifestKind,
        file: String,
        violations: Vec<String>,
    },

    #[error("no schema registered for {0} manifests")]
    #[diagnostic(code(orch::manifest::no_schema))]
    NoSchema(ManifestKind),

    #[error("embedded schema for {kind} is broken: {message}")]
    #[diagnostic(code(orch::manifest::bad_schema))]
    BadSchema { kind: ManifestKind, message: String },
}

/// Validates manifests using the schemas from a [`SchemaRegistry`]
pub struct Validator<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> Validator<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Validate a parsed document, returning one line per violation
    pub fn violations(&self, kind: ManifestKind, document: &Value) -> Result<Vec<String>, ManifestError> {
        let schema_text = self.registry.get(kind).ok_or(ManifestError::NoSchema(kind))?;
        let schema: Value = serde_json::from_str(schema_text).map_err(|e| ManifestError::BadSchema {
            kind,
            message: e.to_string(),
        })?;
        let validator = jsonschema::validator_for(&schema).map_err(|e| ManifestError::BadSchema {
            kind,
            message: e.to_string(),
        })?;

        Ok(validator
            .iter_errors(document)
            .map(|err| {
                let path = err.instance_path.to_string();
                if path.is_empty() {
                    format!("  - {}", err)
                } else {
                    format!("  - {}: {}", path, err)
                }
            })
            .collect())
    }

    /// Validate a parsed document, failing on the first batch of violations
    pub fn validate(&self, kind: ManifestKind, document: &Value, file: &str) -> Result<(), ManifestError> {
        let violations = self.violations(kind, document)?;
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ManifestError::Invalid {
                kind,
                file: file.to_string(),
                violations,
            })
        }
    }
}

/// Read a JSON or YAML manifest from disk and validate it
pub fn load_manifest(kind: ManifestKind, path: &Path) -> Result<Value, ManifestError> {
    let (document, _) = parse_manifest_file(path)?;
    let registry = SchemaRegistry::default();
    Validator::new(&registry).validate(kind, &document, &path.display().to_string())?;
    Ok(document)
}
