//! `orch-cli * site` - Site management

use miette::Result;
use serde_json::{json, Map, Value};
use std::io::Write;

use crate::cli::commands::region::REGIONS;
use crate::cli::context::Context;
use crate::cli::output::print_success;
use crate::cli::resource_cmd::{
    metadata_value, report_created, resolve_id, run_list_generic, ListArgs as CommonListArgs,
    ResourceConfig,
};
use crate::cli::table::ColumnDef;
use crate::core::validate;
use crate::core::Feature;

#[derive(clap::Args, Debug)]
pub struct CreateArgs {
    /// Site name
    pub name: String,

    /// Region name or ID the site belongs to
    #[arg(long, short = 'r')]
    pub region: String,

    /// Latitude in degrees
    #[arg(long, allow_negative_numbers = true)]
    pub latitude: Option<f64>,

    /// Longitude in degrees
    #[arg(long, allow_negative_numbers = true)]
    pub longitude: Option<f64>,

    /// Metadata as key=value (repeatable)
    #[arg(long, short = 'm')]
    pub metadata: Vec<String>,
}

#[derive(clap::Args, Debug)]
#[group(skip)]
pub struct ListArgs {
    #[command(flatten)]
    pub common: CommonListArgs,

    /// Only sites in this region (name or ID)
    #[arg(long, short = 'r')]
    pub region: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Site name or ID
    pub site: String,

    /// New name
    #[arg(long)]
    pub name: Option<String>,

    /// Move to this region (name or ID)
    #[arg(long, short = 'r')]
    pub region: Option<String>,
}

const SITE_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("NAME", "name"),
    ColumnDef::new("ID", "resourceId"),
    ColumnDef::new("REGION", "region.name"),
    ColumnDef::new("METADATA", "metadata"),
];

const SITE_DETAIL: &[ColumnDef] = &[
    ColumnDef::new("Name", "name"),
    ColumnDef::new("Resource ID", "resourceId"),
    ColumnDef::new("Region", "region.name"),
    ColumnDef::new("Region ID", "region.resourceId"),
    ColumnDef::new("Latitude (E7)", "siteLat"),
    ColumnDef::new("Longitude (E7)", "siteLng"),
    ColumnDef::new("Metadata", "metadata"),
    ColumnDef::new("Inherited metadata", "inheritedMetadata.location"),
    ColumnDef::new("Created", "timestamps.createdAt"),
];

pub const SITES: ResourceConfig = ResourceConfig {
    name: "site",
    name_plural: "sites",
    feature: Feature::EdgeInfra,
    collection: "/v1/projects/{project}/sites",
    list_key: "sites",
    id_field: "resourceId",
    name_field: "name",
    id_prefix: Some("site-"),
    columns: SITE_COLUMNS,
    detail: SITE_DETAIL,
};

pub fn create(args: CreateArgs, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    validate::resource_name("site", &args.name)?;
    let metadata = metadata_value(&args.metadata)?;

    let mut body = Map::new();
    body.insert("name".into(), json!(args.name));
    body.insert("metadata".into(), metadata);
    if let Some(lat) = args.latitude {
        body.insert("siteLat".into(), json!(validate::coordinate_e7("latitude", lat, 90.0)?));
    }
    if let Some(lng) = args.longitude {
        body.insert("siteLng".into(), json!(validate::coordinate_e7("longitude", lng, 180.0)?));
    }
    body.insert("regionId".into(), json!(resolve_id(&REGIONS, ctx, &args.region)?));

    let path = SITES.collection_path(ctx)?;
    let created = ctx.client.post(&path, &Value::Object(body), SITES.name)?;
    report_created(&SITES, &args.name, &created, ctx, out)
}

pub fn list(args: ListArgs, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    let mut query = Vec::new();
    if let Some(region) = &args.region {
        let id = resolve_id(&REGIONS, ctx, region)?;
        query.push(("filter".to_string(), format!("region.resourceId=\"{}\"", id)));
    }
    run_list_generic(&SITES, &args.common, &query, ctx, out)
}

pub fn set(args: SetArgs, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    let mut body = Map::new();
    if let Some(name) = &args.name {
        validate::resource_name("site", name)?;
        body.insert("name".into(), json!(name));
    }
    if let Some(region) = &args.region {
        body.insert("regionId".into(), json!(resolve_id(&REGIONS, ctx, region)?));
    }
    if body.is_empty() {
        return Err(miette::miette!(help = "pass --name or --region", "nothing to update"));
    }

    let id = resolve_id(&SITES, ctx, &args.site)?;
    let path = SITES.item_path(ctx, &id)?;
    ctx.client.patch(&path, &Value::Object(body), SITES.name)?;
    print_success(out, format!("Updated site {}", args.site))
}
