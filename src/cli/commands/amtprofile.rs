//! `orch-cli * amtprofile` - AMT domain profiles (remote provisioning)

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use miette::{IntoDiagnostic, Result, WrapErr};
use serde_json::json;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use crate::cli::context::Context;
use crate::cli::helpers::prompt_password;
use crate::cli::resource_cmd::{report_created, ResourceConfig};
use crate::cli::table::ColumnDef;
use crate::core::validate;
use crate::core::Feature;

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CertFormat {
    #[default]
    String,
    Raw,
}

impl CertFormat {
    fn api_value(self) -> &'static str {
        match self {
            CertFormat::String => "string",
            CertFormat::Raw => "raw",
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct CreateArgs {
    /// Profile name
    pub name: String,

    /// DNS suffix of the AMT domain
    #[arg(long)]
    pub domain_suffix: String,

    /// Provisioning certificate (PFX)
    #[arg(long, value_name = "PFX")]
    pub cert_file: PathBuf,

    /// Certificate password (prompted when omitted)
    #[arg(long)]
    pub cert_password: Option<String>,

    #[arg(long, value_enum, default_value_t = CertFormat::String)]
    pub cert_format: CertFormat,
}

const AMT_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("NAME", "profileName"),
    ColumnDef::new("DOMAIN", "domainSuffix"),
    ColumnDef::new("EXPIRES", "expirationDate"),
];

const AMT_DETAIL: &[ColumnDef] = &[
    ColumnDef::new("Name", "profileName"),
    ColumnDef::new("Domain suffix", "domainSuffix"),
    ColumnDef::new("Certificate format", "provisioningCertStorageFormat"),
    ColumnDef::new("Expires", "expirationDate"),
    ColumnDef::new("Tenant", "tenantId"),
];

pub const AMT_PROFILES: ResourceConfig = ResourceConfig {
    name: "AMT profile",
    name_plural: "AMT profiles",
    feature: Feature::DeviceManagement,
    collection: "/v1/projects/{project}/dm/amt/admin/domains",
    list_key: "data",
    id_field: "profileName",
    name_field: "profileName",
    id_prefix: None,
    columns: AMT_COLUMNS,
    detail: AMT_DETAIL,
};

pub fn create(args: CreateArgs, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    validate::resource_name("AMT profile", &args.name)?;
    let cert = fs::read(&args.cert_file)
        .into_diagnostic()
        .wrap_err_with(|| format!("cannot read certificate '{}'", args.cert_file.display()))?;
    let password = match args.cert_password {
        Some(password) => password,
        None => prompt_password("Certificate password")?,
    };

    let body = json!({
        "profileName": args.name,
        "domainSuffix": args.domain_suffix,
        "provisioningCert": STANDARD.encode(cert),
        "provisioningCertStorageFormat": args.cert_format.api_value(),
        "provisioningCertPassword": password,
    });
    let path = AMT_PROFILES.collection_path(ctx)?;
    let created = ctx.client.post(&path, &body, AMT_PROFILES.name)?;
    report_created(&AMT_PROFILES, &args.name, &created, ctx, out)
}
