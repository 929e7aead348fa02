//! OS profile manifests

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OsProfileManifest {
    pub app_version: String,
    #[serde(default)]
    pub metadata: Option<ManifestMetadata>,
    pub spec: OsProfileSpec,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ManifestMetadata {
    #[serde(default)]
    pub release: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OsProfileSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub os_type: String,
    pub provider: String,
    pub architecture: String,
    pub profile_name: String,
    pub os_image_url: String,
    #[serde(default)]
    pub os_image_version: Option<String>,
    pub os_image_sha256: String,
    #[serde(default, rename = "osPackageManifestURL")]
    pub os_package_manifest_url: Option<String>,
    #[serde(default)]
    pub security_feature: Option<String>,
    #[serde(default)]
    pub platform_bundle: Option<Value>,
    #[serde(default)]
    pub kernel_command: Option<String>,
    #[serde(default)]
    pub update_sources: Vec<String>,
    #[serde(default)]
    pub installed_packages: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl OsProfileManifest {
    /// Map the manifest onto the infrastructure manager's OS resource body
    pub fn to_request(&self) -> Value {
        let spec = &self.spec;
        let mut body = Map::new();
        body.insert("name".into(), json!(spec.name));
        body.insert("osType".into(), json!(spec.os_type));
        body.insert("osProvider".into(), json!(spec.provider));
        body.insert("architecture".into(), json!(spec.architecture));
        body.insert("profileName".into(), json!(spec.profile_name));
        body.insert("imageUrl".into(), json!(spec.os_image_url));
        body.insert("sha256".into(), json!(spec.os_image_sha256.to_lowercase()));
        body.insert("updateSources".into(), json!(spec.update_sources));
        body.insert(
            "securityFeature".into(),
            json!(spec
                .security_feature
                .as_deref()
                .unwrap_or("SECURITY_FEATURE_NONE")),
        );

        let optional = [
            ("imageId", &spec.os_image_version),
            ("osPackageManifestUrl", &spec.os_package_manifest_url),
            ("kernelCommand", &spec.kernel_command),
            ("installedPackages", &spec.installed_packages),
            ("description", &spec.description),
        ];
        for (key, value) in optional {
            if let Some(v) = value {
                body.insert(key.into(), json!(v));
            }
        }
        if let Some(bundle) = &spec.platform_bundle {
            body.insert("platformBundle".into(), json!(bundle.to_string()));
        }
        if let Some(version) = self.metadata.as_ref().and_then(|m| m.version.as_ref()) {
            body.insert("profileVersion".into(), json!(version));
        }

        Value::Object(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_to_request() {
        let manifest: OsProfileManifest = serde_yml::from_str(
            r#"
appVersion: apps/v1
metadata:
  release: 3.1.0
  version: 0.2.0
spec:
  name: Ubuntu 22.04
  type: OS_TYPE_MUTABLE
  provider: OS_PROVIDER_KIND_INFRA
  architecture: x86_64
  profileName: ubuntu-22-04-lts-generic
  osImageUrl: https://cloud-images.ubuntu.com/jammy.img
  osImageVersion: "20250101"
  osImageSha256: ABCDEFABCDEFABCDEFABCDEFABCDEFABCDEFABCDEFABCDEFABCDEFABCDEFABCD
  kernelCommand: "console=ttyS0"
  updateSources:
    - deb http://archive.ubuntu.com/ubuntu jammy main
"#,
        )
        .unwrap();

        let body = manifest.to_request();
        assert_eq!(body["osType"], "OS_TYPE_MUTABLE");
        assert_eq!(body["imageUrl"], "https://cloud-images.ubuntu.com/jammy.img");
        assert_eq!(body["imageId"], "20250101");
        assert_eq!(body["sha256"], "abcdef".repeat(10) + "abcd");
        assert_eq!(body["securityFeature"], "SECURITY_FEATURE_NONE");
        assert_eq!(body["profileVersion"], "0.2.0");
        assert_eq!(body["updateSources"].as_array().unwrap().len(), 1);
        assert!(body.get("description").is_none());
    }
}
