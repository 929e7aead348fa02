//! Catalog: registries, applications, deployment packages and uploads

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use miette::{IntoDiagnostic, Result};
use serde_json::{json, Map, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::cli::context::Context;
use crate::cli::output::{print_item, print_list, print_success};
use crate::cli::resource_cmd::{report_created, ResourceConfig};
use crate::cli::table::ColumnDef;
use crate::core::validate;
use crate::core::Feature;
use crate::schema::{ManifestKind, SchemaRegistry, Validator};
use crate::yaml::parse_manifest_file;

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistryType {
    #[default]
    Helm,
    Image,
}

impl RegistryType {
    fn api_value(self) -> &'static str {
        match self {
            RegistryType::Helm => "HELM",
            RegistryType::Image => "IMAGE",
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct RegistryCreateArgs {
    /// Registry name
    pub name: String,

    /// Registry root URL (https:// or oci://)
    #[arg(long, value_name = "URL")]
    pub root_url: String,

    #[arg(long = "type", value_enum, default_value_t = RegistryType::Helm)]
    pub registry_type: RegistryType,

    #[arg(long)]
    pub display_name: Option<String>,

    #[arg(long)]
    pub username: Option<String>,

    #[arg(long)]
    pub auth_token: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct UploadArgs {
    /// Directory holding the package's YAML artifacts
    pub dir: PathBuf,
}

const REGISTRY_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("NAME", "name"),
    ColumnDef::new("TYPE", "type"),
    ColumnDef::new("ROOT URL", "rootUrl"),
    ColumnDef::new("DISPLAY NAME", "displayName"),
];

const REGISTRY_DETAIL: &[ColumnDef] = &[
    ColumnDef::new("Name", "name"),
    ColumnDef::new("Display name", "displayName"),
    ColumnDef::new("Type", "type"),
    ColumnDef::new("Root URL", "rootUrl"),
    ColumnDef::new("Inventory URL", "inventoryUrl"),
    ColumnDef::new("Username", "username"),
    ColumnDef::new("Description", "description"),
    ColumnDef::new("Created", "createTime"),
];

const APPLICATION_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("NAME", "name"),
    ColumnDef::new("VERSION", "version"),
    ColumnDef::new("CHART", "chartName"),
    ColumnDef::new("CHART VERSION", "chartVersion"),
    ColumnDef::new("REGISTRY", "helmRegistryName"),
];

const APPLICATION_DETAIL: &[ColumnDef] = &[
    ColumnDef::new("Name", "name"),
    ColumnDef::new("Version", "version"),
    ColumnDef::new("Display name", "displayName"),
    ColumnDef::new("Chart", "chartName"),
    ColumnDef::new("Chart version", "chartVersion"),
    ColumnDef::new("Helm registry", "helmRegistryName"),
    ColumnDef::new("Image registry", "imageRegistryName"),
    ColumnDef::new("Default profile", "defaultProfileName"),
    ColumnDef::new("Description", "description"),
];

const PACKAGE_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("NAME", "name"),
    ColumnDef::new("VERSION", "version"),
    ColumnDef::new("DISPLAY NAME", "displayName"),
    ColumnDef::new("DEPLOYED", "isDeployed"),
];

const PACKAGE_DETAIL: &[ColumnDef] = &[
    ColumnDef::new("Name", "name"),
    ColumnDef::new("Version", "version"),
    ColumnDef::new("Display name", "displayName"),
    ColumnDef::new("Applications", "applicationReferences"),
    ColumnDef::new("Default profile", "defaultProfileName"),
    ColumnDef::new("Deployed", "isDeployed"),
    ColumnDef::new("Visible", "isVisible"),
    ColumnDef::new("Description", "description"),
];

pub const REGISTRIES: ResourceConfig = ResourceConfig {
    name: "registry",
    name_plural: "registries",
    feature: Feature::AppOrch,
    collection: "/v3/projects/{project}/catalog/registries",
    list_key: "registries",
    id_field: "name",
    name_field: "name",
    id_prefix: None,
    columns: REGISTRY_COLUMNS,
    detail: REGISTRY_DETAIL,
};

pub const APPLICATIONS: ResourceConfig = ResourceConfig {
    name: "application",
    name_plural: "applications",
    feature: Feature::AppOrch,
    collection: "/v3/projects/{project}/catalog/applications",
    list_key: "applications",
    id_field: "name",
    name_field: "name",
    id_prefix: None,
    columns: APPLICATION_COLUMNS,
    detail: APPLICATION_DETAIL,
};

pub const DEPLOYMENT_PACKAGES: ResourceConfig = ResourceConfig {
    name: "deployment package",
    name_plural: "deployment packages",
    feature: Feature::AppOrch,
    collection: "/v3/projects/{project}/catalog/deployment_packages",
    list_key: "deploymentPackages",
    id_field: "name",
    name_field: "name",
    id_prefix: None,
    columns: PACKAGE_COLUMNS,
    detail: PACKAGE_DETAIL,
};

const UPLOADS_PATH: &str = "/v3/projects/{project}/catalog/uploads";

/// Catalog responses wrap the payload in a key named after the kind
fn payload_key(config: &ResourceConfig) -> &'static str {
    match config.list_key {
        "registries" => "registry",
        "applications" => "application",
        _ => "deploymentPackage",
    }
}

fn unwrap_payload(config: &ResourceConfig, mut response: Value) -> Value {
    match response.get_mut(payload_key(config)) {
        Some(inner) => inner.take(),
        None => response,
    }
}

pub fn create_registry(args: RegistryCreateArgs, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    validate::dns_label("registry", &args.name)?;
    let url = reqwest::Url::parse(&args.root_url).map_err(|e| validate::ValidationError::Field {
        field: "root URL",
        message: e.to_string(),
    })?;
    if !matches!(url.scheme(), "https" | "http" | "oci") {
        return Err(validate::ValidationError::Field {
            field: "root URL",
            message: format!("unsupported scheme '{}'", url.scheme()),
        }
        .into());
    }

    let mut body = Map::new();
    body.insert("name".into(), json!(args.name));
    body.insert("rootUrl".into(), json!(args.root_url));
    body.insert("type".into(), json!(args.registry_type.api_value()));
    body.insert(
        "displayName".into(),
        json!(args.display_name.as_deref().unwrap_or(&args.name)),
    );
    if let Some(username) = &args.username {
        body.insert("username".into(), json!(username));
    }
    if let Some(token) = &args.auth_token {
        body.insert("authToken".into(), json!(token));
    }

    let path = REGISTRIES.collection_path(ctx)?;
    let created = ctx.client.post(&path, &Value::Object(body), REGISTRIES.name)?;
    report_created(&REGISTRIES, &args.name, &unwrap_payload(&REGISTRIES, created), ctx, out)
}

pub fn get_registry(name: &str, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    let path = REGISTRIES.item_path(ctx, name)?;
    let value = unwrap_payload(&REGISTRIES, ctx.client.get(&path, REGISTRIES.name)?);
    print_item(out, ctx.format, &value, REGISTRIES.detail)
}

/// `get application|deploymentpackage NAME [VERSION]`
pub fn get_versioned(
    config: &ResourceConfig,
    name: &str,
    version: Option<&str>,
    ctx: &Context,
    out: &mut dyn Write,
) -> Result<()> {
    let versions = format!("{}/versions", config.item_path(ctx, name)?);
    match version {
        Some(version) => {
            let response = ctx.client.get(&format!("{}/{}", versions, version), config.name)?;
            print_item(out, ctx.format, &unwrap_payload(config, response), config.detail)
        }
        None => {
            let rows = match unwrap_payload(config, ctx.client.get(&versions, config.name)?) {
                Value::Array(rows) => rows,
                Value::Null => Vec::new(),
                single => vec![single],
            };
            print_list(out, ctx.format, &rows, config.columns, config.name_plural)
        }
    }
}

pub fn delete_versioned(
    config: &ResourceConfig,
    name: &str,
    version: &str,
    ctx: &Context,
    out: &mut dyn Write,
) -> Result<()> {
    let path = format!("{}/versions/{}", config.item_path(ctx, name)?, version);
    ctx.client.delete(&path, config.name)?;
    print_success(out, format!("Deleted {} {} {}", config.name, name, version))
}

/// YAML artifacts under `dir`, in a stable order
fn artifact_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(miette::miette!("'{}' is not a directory", dir.display()));
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = entry.into_diagnostic()?;
        let is_yaml = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
        if entry.file_type().is_file() && is_yaml {
            files.push(entry.into_path());
        }
    }
    if files.is_empty() {
        return Err(miette::miette!("no YAML artifacts found in '{}'", dir.display()));
    }
    Ok(files)
}

/// Upload every artifact of a deployment package in one upload session
///
/// All files are parsed and schema-checked before the first one is sent.
pub fn upload(args: UploadArgs, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    let registry = SchemaRegistry::default();
    let validator = Validator::new(&registry);

    let mut artifacts = Vec::new();
    for path in artifact_files(&args.dir)? {
        let (document, content) = parse_manifest_file(&path)?;
        validator.validate(ManifestKind::CatalogArtifact, &document, &path.display().to_string())?;
        artifacts.push((path, content));
    }

    let uploads = ctx.path(UPLOADS_PATH)?;
    let mut session: Option<String> = None;
    let total = artifacts.len();
    for (index, (path, content)) in artifacts.iter().enumerate() {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let mut body = json!({
            "fileName": file_name,
            "artifact": STANDARD.encode(content),
            "lastFile": index + 1 == total,
        });
        if let Some(id) = &session {
            body["sessionId"] = json!(id);
        }

        tracing::debug!("uploading {} ({}/{})", file_name, index + 1, total);
        let response = ctx.client.post(&uploads, &body, "upload")?;
        let errors: Vec<&str> = response
            .get("errorMessages")
            .and_then(Value::as_array)
            .map(|list| list.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        if !errors.is_empty() {
            return Err(miette::miette!(
                "catalog rejected {}:\n  {}",
                file_name,
                errors.join("\n  ")
            ));
        }
        if let Some(id) = response.get("sessionId").and_then(Value::as_str) {
            session = Some(id.to_string());
        }
    }

    print_success(
        out,
        format!("Uploaded {} artifacts from {}", total, args.dir.display()),
    )
}
