//! Shared resource command infrastructure
//!
//! Most nouns are a collection under a project-scoped path with the same
//! get/list/delete behavior; this module holds that behavior once and each
//! command module describes its resource with a [`ResourceConfig`].

use miette::{Diagnostic, Result};
use serde_json::{json, Value};
use std::io::Write;
use thiserror::Error;

use crate::cli::context::Context;
use crate::cli::filters;
use crate::cli::output::{print_item, print_list, print_success};
use crate::cli::table::ColumnDef;
use crate::core::validate;
use crate::core::Feature;

// =========================================================================
// Shared arguments
// =========================================================================

#[derive(clap::Args, Debug, Clone)]
pub struct NameArgs {
    /// Resource name or ID
    pub name: String,
}

#[derive(clap::Args, Debug, Clone)]
pub struct VersionedArgs {
    /// Resource name
    pub name: String,

    /// Version (all versions when omitted)
    pub version: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct VersionArgs {
    /// Resource name
    pub name: String,

    /// Version
    pub version: String,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// AIP-160 filter, e.g. 'name="edge-*" AND NOT status:error'
    #[arg(long)]
    pub filter: Option<String>,

    /// Sort keys, e.g. "name desc, created"
    #[arg(long)]
    pub order_by: Option<String>,
}

// =========================================================================
// Resource configuration
// =========================================================================

/// Static description of a REST collection
pub struct ResourceConfig {
    /// Singular name for messages (e.g. "region")
    pub name: &'static str,
    /// Plural name for messages (e.g. "regions")
    pub name_plural: &'static str,
    pub feature: Feature,
    /// Collection path, may contain `{project}`
    pub collection: &'static str,
    /// Key holding the items in a list response
    pub list_key: &'static str,
    /// Field carrying the resource ID
    pub id_field: &'static str,
    /// Field carrying the human name
    pub name_field: &'static str,
    /// IDs start with this prefix; without one the name is the ID
    pub id_prefix: Option<&'static str>,
    pub columns: &'static [ColumnDef],
    pub detail: &'static [ColumnDef],
}

impl ResourceConfig {
    pub fn collection_path(&self, ctx: &Context) -> Result<String> {
        Ok(ctx.path(self.collection)?)
    }

    pub fn item_path(&self, ctx: &Context, id: &str) -> Result<String> {
        Ok(format!("{}/{}", self.collection_path(ctx)?, id))
    }

    /// ID of a resource as returned by the API
    pub fn id_of<'a>(&self, value: &'a Value) -> Option<&'a str> {
        value.get(self.id_field).and_then(Value::as_str)
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum ResolveError {
    #[error("no {kind} named '{name}'")]
    #[diagnostic(code(orch::resolve::not_found), help("list them with `orch-cli list {kind}`"))]
    NotFound { kind: &'static str, name: String },

    #[error("{count} {kind} resources are named '{name}'")]
    #[diagnostic(code(orch::resolve::ambiguous), help("use the resource ID instead of the name"))]
    Ambiguous {
        kind: &'static str,
        name: String,
        count: usize,
    },
}

// =========================================================================
// Generic operations
// =========================================================================

/// Turn `key=value` flags into the `[{key, value}]` metadata list the APIs use
pub fn metadata_value(pairs: &[String]) -> Result<Value> {
    let labels = validate::parse_labels(pairs)?;
    Ok(Value::Array(
        labels
            .into_iter()
            .map(|(key, value)| json!({ "key": key, "value": value }))
            .collect(),
    ))
}

/// Fetch every item of a collection
pub fn fetch_all(
    config: &ResourceConfig,
    ctx: &Context,
    query: &[(String, String)],
) -> Result<Vec<Value>> {
    let path = config.collection_path(ctx)?;
    Ok(ctx
        .client
        .list_all(&path, config.list_key, query, config.name_plural)?)
}

/// Map a name or ID to an ID
///
/// Values carrying the resource's ID prefix are taken as IDs. Anything else is
/// looked up by name and must match exactly one resource.
pub fn resolve_id(config: &ResourceConfig, ctx: &Context, name: &str) -> Result<String> {
    let Some(prefix) = config.id_prefix else {
        return Ok(name.to_string());
    };
    if name.starts_with(prefix) {
        return Ok(name.to_string());
    }

    let query = [(
        "filter".to_string(),
        format!("{}=\"{}\"", config.name_field, name),
    )];
    let matches: Vec<String> = fetch_all(config, ctx, &query)?
        .iter()
        .filter(|item| item.get(config.name_field).and_then(Value::as_str) == Some(name))
        .filter_map(|item| config.id_of(item).map(String::from))
        .collect();

    match matches.len() {
        0 => Err(ResolveError::NotFound {
            kind: config.name,
            name: name.to_string(),
        }
        .into()),
        1 => Ok(matches.into_iter().next().unwrap_or_default()),
        count => Err(ResolveError::Ambiguous {
            kind: config.name,
            name: name.to_string(),
            count,
        }
        .into()),
    }
}

/// Resolve and fetch a single resource
pub fn fetch_one(config: &ResourceConfig, ctx: &Context, name: &str) -> Result<Value> {
    let id = resolve_id(config, ctx, name)?;
    let path = config.item_path(ctx, &id)?;
    Ok(ctx.client.get(&path, config.name)?)
}

pub fn run_get_generic(
    config: &ResourceConfig,
    name: &str,
    ctx: &Context,
    out: &mut dyn Write,
) -> Result<()> {
    let value = fetch_one(config, ctx, name)?;
    print_item(out, ctx.format, &value, config.detail)
}

/// List a collection with optional server query, then client-side filter and order
pub fn run_list_generic(
    config: &ResourceConfig,
    args: &ListArgs,
    query: &[(String, String)],
    ctx: &Context,
    out: &mut dyn Write,
) -> Result<()> {
    let rows = fetch_all(config, ctx, query)?;
    let rows = filters::apply(rows, args.filter.as_deref(), args.order_by.as_deref())?;
    print_list(out, ctx.format, &rows, config.columns, config.name_plural)
}

pub fn run_delete_generic(
    config: &ResourceConfig,
    name: &str,
    ctx: &Context,
    out: &mut dyn Write,
) -> Result<()> {
    let id = resolve_id(config, ctx, name)?;
    let path = config.item_path(ctx, &id)?;
    ctx.client.delete(&path, config.name)?;
    print_success(out, format!("Deleted {} {}", config.name, name))
}

/// Print the outcome of a create call
///
/// Table output gets a one-line confirmation with the new ID; JSON and YAML get
/// the created resource.
pub fn report_created(
    config: &ResourceConfig,
    name: &str,
    created: &Value,
    ctx: &Context,
    out: &mut dyn Write,
) -> Result<()> {
    match ctx.format {
        crate::cli::OutputFormat::Table => {
            let message = match config.id_of(created).filter(|id| *id != name) {
                Some(id) => format!("Created {} {} ({})", config.name, name, id),
                None => format!("Created {} {}", config.name, name),
            };
            print_success(out, message)
        }
        other => crate::cli::output::write_structured(out, other, created),
    }
}
