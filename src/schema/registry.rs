//! Schema registry - embedded JSON schemas for manifest files

use rust_embed::Embed;
use std::collections::HashMap;
use std::fmt;

#[derive(Embed)]
#[folder = "schemas/"]
struct EmbeddedSchemas;

/// Manifest kinds the CLI reads from disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManifestKind {
    OsProfile,
    ClusterTemplate,
    CatalogArtifact,
}

impl ManifestKind {
    pub fn all() -> &'static [ManifestKind] {
        &[
            ManifestKind::OsProfile,
            ManifestKind::ClusterTemplate,
            ManifestKind::CatalogArtifact,
        ]
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            ManifestKind::OsProfile => "osprofile.schema.json",
            ManifestKind::ClusterTemplate => "clustertemplate.schema.json",
            ManifestKind::CatalogArtifact => "catalog-artifact.schema.json",
        }
    }
}

impl fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestKind::OsProfile => write!(f, "OS profile"),
            ManifestKind::ClusterTemplate => write!(f, "cluster template"),
            ManifestKind::CatalogArtifact => write!(f, "catalog artifact"),
        }
    }
}

/// Registry of JSON schemas for manifest validation
pub struct SchemaRegistry {
    schemas: HashMap<ManifestKind, String>,
}

impl SchemaRegistry {
    /// Create a new schema registry with embedded schemas
    pub fn new() -> Self {
        let mut schemas = HashMap::new();

        for kind in ManifestKind::all() {
            if let Some(file) = EmbeddedSchemas::get(kind.file_name()) {
                if let Ok(content) = std::str::from_utf8(&file.data) {
                    schemas.insert(*kind, content.to_string());
                }
            }
        }

        Self { schemas }
    }

    /// Get the JSON schema for a manifest kind
    pub fn get(&self, kind: ManifestKind) -> Option<&str> {
        self.schemas.get(&kind).map(|s| s.as_str())
    }

    pub fn has_schema(&self, kind: ManifestKind) -> bool {
        self.schemas.contains_key(&kind)
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}
