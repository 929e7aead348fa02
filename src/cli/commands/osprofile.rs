//! `orch-cli * osprofile` - OS profiles

use miette::{IntoDiagnostic, Result};
use std::io::Write;
use std::path::PathBuf;

use crate::cli::context::Context;
use crate::cli::resource_cmd::{report_created, ResourceConfig};
use crate::cli::table::ColumnDef;
use crate::core::validate::{self, ValidationError};
use crate::core::Feature;
use crate::entities::OsProfileManifest;
use crate::schema::{load_manifest, ManifestKind};

#[derive(clap::Args, Debug)]
pub struct CreateArgs {
    /// OS profile manifest (YAML or JSON)
    pub file: PathBuf,
}

const OS_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("NAME", "name"),
    ColumnDef::new("ID", "resourceId"),
    ColumnDef::new("PROFILE", "profileName"),
    ColumnDef::new("ARCH", "architecture"),
    ColumnDef::new("TYPE", "osType"),
    ColumnDef::new("SECURITY", "securityFeature"),
];

const OS_DETAIL: &[ColumnDef] = &[
    ColumnDef::new("Name", "name"),
    ColumnDef::new("Resource ID", "resourceId"),
    ColumnDef::new("Profile", "profileName"),
    ColumnDef::new("Profile version", "profileVersion"),
    ColumnDef::new("Architecture", "architecture"),
    ColumnDef::new("OS type", "osType"),
    ColumnDef::new("Provider", "osProvider"),
    ColumnDef::new("Image URL", "imageUrl"),
    ColumnDef::new("Image ID", "imageId"),
    ColumnDef::new("SHA256", "sha256"),
    ColumnDef::new("Security feature", "securityFeature"),
    ColumnDef::new("Kernel command", "kernelCommand"),
    ColumnDef::new("Update sources", "updateSources"),
];

pub const OS_PROFILES: ResourceConfig = ResourceConfig {
    name: "OS profile",
    name_plural: "OS profiles",
    feature: Feature::EdgeInfra,
    collection: "/v1/projects/{project}/compute/os",
    list_key: "operatingSystemResources",
    id_field: "resourceId",
    name_field: "name",
    id_prefix: Some("os-"),
    columns: OS_COLUMNS,
    detail: OS_DETAIL,
};

pub fn create(args: CreateArgs, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    let document = load_manifest(ManifestKind::OsProfile, &args.file)?;
    let manifest: OsProfileManifest = serde_json::from_value(document).into_diagnostic()?;
    if !validate::sha256_hex(&manifest.spec.os_image_sha256) {
        return Err(ValidationError::Field {
            field: "osImageSha256",
            message: "expected 64 hex digits".to_string(),
        }
        .into());
    }

    let path = OS_PROFILES.collection_path(ctx)?;
    let created = ctx.client.post(&path, &manifest.to_request(), OS_PROFILES.name)?;
    report_created(&OS_PROFILES, &manifest.spec.name, &created, ctx, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::context::testing::{context, output};
    use crate::core::client::testing::MockTransport;
    use serde_json::json;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"
appVersion: apps/v1
metadata:
  release: 3.1.0
  version: 0.1.0
spec:
  name: Edge Microvisor Toolkit
  type: OS_TYPE_IMMUTABLE
  provider: OS_PROVIDER_KIND_INFRA
  architecture: x86_64
  profileName: microvisor-nonrt
  osImageUrl: https://files.example.com/emt.raw.gz
  osImageVersion: 3.0.20250504
  osImageSha256: a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1
  securityFeature: SECURITY_FEATURE_NONE
"#;

    #[test]
    fn test_create_from_manifest() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("emt.yaml");
        std::fs::write(&file, MANIFEST).unwrap();

        let mock = MockTransport::new();
        mock.respond(200, json!({"name": "Edge Microvisor Toolkit", "resourceId": "os-12ab"}));
        let ctx = context(&mock);
        let mut out = Vec::new();
        create(CreateArgs { file }, &ctx, &mut out).unwrap();

        let req = &mock.requests()[0];
        assert_eq!(req.path, "/v1/projects/acme/compute/os");
        let body = req.body.as_ref().unwrap();
        assert_eq!(body["profileName"], "microvisor-nonrt");
        assert_eq!(body["osType"], "OS_TYPE_IMMUTABLE");
        assert!(output(out).contains("os-12ab"));
    }

    #[test]
    fn test_create_rejects_invalid_manifest_before_request() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("broken.yaml");
        std::fs::write(&file, "appVersion: apps/v1\nspec:\n  name: missing-everything\n").unwrap();

        let mock = MockTransport::new();
        let ctx = context(&mock);
        let mut out = Vec::new();
        assert!(create(CreateArgs { file }, &ctx, &mut out).is_err());
        assert!(mock.requests().is_empty());
    }
}
