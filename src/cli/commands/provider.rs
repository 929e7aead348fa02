//! `orch-cli * provider` - Infrastructure providers

use miette::{IntoDiagnostic, Result, WrapErr};
use serde_json::{json, Map, Value};
use std::io::Write;

use crate::cli::context::Context;
use crate::cli::resource_cmd::{report_created, ResourceConfig};
use crate::cli::table::ColumnDef;
use crate::core::validate;
use crate::core::Feature;

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Baremetal,
}

impl ProviderKind {
    fn api_value(self) -> &'static str {
        match self {
            ProviderKind::Baremetal => "PROVIDER_KIND_BAREMETAL",
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct CreateArgs {
    /// Provider name
    pub name: String,

    #[arg(long, value_enum, default_value = "baremetal")]
    pub kind: ProviderKind,

    /// Provider API endpoint URL
    #[arg(long, value_name = "URL")]
    pub endpoint: String,

    /// API credential (repeatable)
    #[arg(long)]
    pub credentials: Vec<String>,

    /// Provider configuration as a JSON document
    #[arg(long, value_name = "JSON")]
    pub config: Option<String>,
}

const PROVIDER_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("NAME", "name"),
    ColumnDef::new("ID", "resourceId"),
    ColumnDef::new("KIND", "providerKind"),
    ColumnDef::new("ENDPOINT", "apiEndpoint"),
];

const PROVIDER_DETAIL: &[ColumnDef] = &[
    ColumnDef::new("Name", "name"),
    ColumnDef::new("Resource ID", "resourceId"),
    ColumnDef::new("Kind", "providerKind"),
    ColumnDef::new("Vendor", "providerVendor"),
    ColumnDef::new("Endpoint", "apiEndpoint"),
    ColumnDef::new("Config", "config"),
];

pub const PROVIDERS: ResourceConfig = ResourceConfig {
    name: "provider",
    name_plural: "providers",
    feature: Feature::EdgeInfra,
    collection: "/v1/projects/{project}/providers",
    list_key: "providers",
    id_field: "resourceId",
    name_field: "name",
    id_prefix: Some("provider-"),
    columns: PROVIDER_COLUMNS,
    detail: PROVIDER_DETAIL,
};

pub fn create(args: CreateArgs, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    validate::resource_name("provider", &args.name)?;
    reqwest::Url::parse(&args.endpoint)
        .into_diagnostic()
        .wrap_err_with(|| format!("invalid provider endpoint '{}'", args.endpoint))?;

    let mut body = Map::new();
    body.insert("name".into(), json!(args.name));
    body.insert("providerKind".into(), json!(args.kind.api_value()));
    body.insert("apiEndpoint".into(), json!(args.endpoint));
    if !args.credentials.is_empty() {
        body.insert("apiCredentials".into(), json!(args.credentials));
    }
    if let Some(config) = &args.config {
        // The API stores the config as an opaque string; still refuse broken JSON
        serde_json::from_str::<Value>(config)
            .into_diagnostic()
            .wrap_err("--config is not valid JSON")?;
        body.insert("config".into(), json!(config));
    }

    let path = PROVIDERS.collection_path(ctx)?;
    let created = ctx.client.post(&path, &Value::Object(body), PROVIDERS.name)?;
    report_created(&PROVIDERS, &args.name, &created, ctx, out)
}
