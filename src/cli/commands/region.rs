//! `orch-cli * region` - Region management and the region/site tree

use miette::{IntoDiagnostic, Result};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Write;

use crate::cli::commands::site::SITES;
use crate::cli::context::Context;
use crate::cli::output::print_success;
use crate::cli::resource_cmd::{
    fetch_all, metadata_value, report_created, resolve_id, run_list_generic, ListArgs as CommonListArgs,
    ResourceConfig,
};
use crate::cli::table::ColumnDef;
use crate::cli::OutputFormat;
use crate::core::validate;
use crate::core::Feature;
use crate::entities::{Region, Site};

#[derive(clap::Args, Debug)]
pub struct CreateArgs {
    /// Region name
    pub name: String,

    /// Parent region name or ID
    #[arg(long)]
    pub parent: Option<String>,

    /// Metadata as key=value (repeatable)
    #[arg(long, short = 'm')]
    pub metadata: Vec<String>,
}

#[derive(clap::Args, Debug)]
#[group(skip)]
pub struct ListArgs {
    #[command(flatten)]
    pub common: CommonListArgs,

    /// Print regions and their sites as a tree
    #[arg(long)]
    pub tree: bool,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Region name or ID
    pub region: String,

    /// New name
    #[arg(long)]
    pub name: Option<String>,

    /// New parent region name or ID
    #[arg(long)]
    pub parent: Option<String>,

    /// Replace metadata with these key=value pairs (repeatable)
    #[arg(long, short = 'm')]
    pub metadata: Vec<String>,
}

const REGION_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("NAME", "name"),
    ColumnDef::new("ID", "resourceId"),
    ColumnDef::new("PARENT", "parentRegion.resourceId"),
    ColumnDef::new("METADATA", "metadata"),
];

const REGION_DETAIL: &[ColumnDef] = &[
    ColumnDef::new("Name", "name"),
    ColumnDef::new("Resource ID", "resourceId"),
    ColumnDef::new("Parent", "parentRegion.resourceId"),
    ColumnDef::new("Metadata", "metadata"),
    ColumnDef::new("Inherited metadata", "inheritedMetadata"),
    ColumnDef::new("Total sites", "totalSites"),
    ColumnDef::new("Created", "timestamps.createdAt"),
    ColumnDef::new("Updated", "timestamps.updatedAt"),
];

pub const REGIONS: ResourceConfig = ResourceConfig {
    name: "region",
    name_plural: "regions",
    feature: Feature::EdgeInfra,
    collection: "/v1/projects/{project}/regions",
    list_key: "regions",
    id_field: "resourceId",
    name_field: "name",
    id_prefix: Some("region-"),
    columns: REGION_COLUMNS,
    detail: REGION_DETAIL,
};

pub fn create(args: CreateArgs, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    validate::resource_name("region", &args.name)?;
    let metadata = metadata_value(&args.metadata)?;

    let mut body = Map::new();
    body.insert("name".into(), json!(args.name));
    body.insert("metadata".into(), metadata);
    if let Some(parent) = &args.parent {
        body.insert("parentId".into(), json!(resolve_id(&REGIONS, ctx, parent)?));
    }

    let path = REGIONS.collection_path(ctx)?;
    let created = ctx.client.post(&path, &Value::Object(body), REGIONS.name)?;
    report_created(&REGIONS, &args.name, &created, ctx, out)
}

pub fn list(args: ListArgs, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    if !args.tree {
        return run_list_generic(&REGIONS, &args.common, &[], ctx, out);
    }

    let regions: Vec<Region> = fetch_all(&REGIONS, ctx, &[])?
        .iter()
        .filter_map(Region::from_value)
        .collect();
    let sites: Vec<Site> = fetch_all(&SITES, ctx, &[])?
        .iter()
        .filter_map(Site::from_value)
        .collect();

    match ctx.format {
        OutputFormat::Table => write!(out, "{}", render_tree(&regions, &sites)).into_diagnostic(),
        other => crate::cli::output::write_structured(out, other, &tree_value(&regions, &sites)),
    }
}

pub fn set(args: SetArgs, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    let mut body = Map::new();
    if let Some(name) = &args.name {
        validate::resource_name("region", name)?;
        body.insert("name".into(), json!(name));
    }
    if !args.metadata.is_empty() {
        body.insert("metadata".into(), metadata_value(&args.metadata)?);
    }
    if let Some(parent) = &args.parent {
        body.insert("parentId".into(), json!(resolve_id(&REGIONS, ctx, parent)?));
    }
    if body.is_empty() {
        return Err(miette::miette!(
            help = "pass --name, --parent or --metadata",
            "nothing to update"
        ));
    }

    let id = resolve_id(&REGIONS, ctx, &args.region)?;
    let path = REGIONS.item_path(ctx, &id)?;
    ctx.client.patch(&path, &Value::Object(body), REGIONS.name)?;
    print_success(out, format!("Updated region {}", args.region))
}

// =========================================================================
// Region tree
// =========================================================================

struct Tree<'a> {
    regions: BTreeMap<&'a str, &'a Region>,
    children: HashMap<&'a str, Vec<&'a Region>>,
    sites: HashMap<&'a str, Vec<&'a Site>>,
}

impl<'a> Tree<'a> {
    fn new(regions: &'a [Region], sites: &'a [Site]) -> Self {
        let by_id: BTreeMap<&str, &Region> =
            regions.iter().map(|r| (r.resource_id.as_str(), r)).collect();

        let mut children: HashMap<&str, Vec<&Region>> = HashMap::new();
        for region in regions {
            if let Some(parent) = region.parent().filter(|p| by_id.contains_key(p)) {
                children.entry(parent).or_default().push(region);
            }
        }
        for list in children.values_mut() {
            list.sort_by(|a, b| a.name.cmp(&b.name));
        }

        let mut by_region: HashMap<&str, Vec<&Site>> = HashMap::new();
        for site in sites {
            let region = site
                .region
                .as_ref()
                .map(|r| r.resource_id.as_str())
                .unwrap_or("");
            by_region.entry(region).or_default().push(site);
        }
        for list in by_region.values_mut() {
            list.sort_by(|a, b| a.name.cmp(&b.name));
        }

        Self {
            regions: by_id,
            children,
            sites: by_region,
        }
    }

    /// Regions with no parent or an unknown parent, by name
    fn roots(&self) -> Vec<&'a Region> {
        let mut roots: Vec<&Region> = self
            .regions
            .values()
            .filter(|r| r.parent().is_none_or(|p| !self.regions.contains_key(p)))
            .copied()
            .collect();
        roots.sort_by(|a, b| a.name.cmp(&b.name));
        roots
    }

    /// Every region exactly once, roots first; regions caught in a parent cycle
    /// have no root and are appended as their own roots
    fn walk(&self, mut visit: impl FnMut(&'a Region, usize, &[&'a Site])) {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut pending: Vec<&Region> = self.roots();
        let mut leftovers: Vec<&Region> = self.regions.values().copied().collect();
        leftovers.sort_by(|a, b| a.name.cmp(&b.name));
        pending.extend(leftovers);

        for root in pending {
            let mut stack = vec![(root, 0usize)];
            while let Some((region, depth)) = stack.pop() {
                if !visited.insert(region.resource_id.as_str()) {
                    continue;
                }
                let sites = self
                    .sites
                    .get(region.resource_id.as_str())
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                visit(region, depth, sites);
                if let Some(children) = self.children.get(region.resource_id.as_str()) {
                    for child in children.iter().rev() {
                        stack.push((*child, depth + 1));
                    }
                }
            }
        }
    }

    fn orphan_sites(&self) -> Vec<&'a Site> {
        let mut orphans: Vec<&Site> = self
            .sites
            .iter()
            .filter(|(region, _)| !self.regions.contains_key(*region))
            .flat_map(|(_, sites)| sites.iter().copied())
            .collect();
        orphans.sort_by(|a, b| a.name.cmp(&b.name));
        orphans
    }
}

/// Regions ordered so every child comes before its parent
pub fn leaf_first(regions: &[Region]) -> Vec<&Region> {
    let tree = Tree::new(regions, &[]);
    let mut order = Vec::with_capacity(regions.len());
    tree.walk(|region, _, _| order.push(region));
    order.reverse();
    order
}

/// Render regions and sites as an indented tree, two spaces per level
pub fn render_tree(regions: &[Region], sites: &[Site]) -> String {
    let tree = Tree::new(regions, sites);
    let mut out = String::new();

    tree.walk(|region, depth, sites| {
        let pad = "  ".repeat(depth);
        out.push_str(&format!("{}Region: {} ({})\n", pad, region.name, region.resource_id));
        for site in sites {
            out.push_str(&format!("{}  Site: {} ({})\n", pad, site.name, site.resource_id));
        }
    });

    for site in tree.orphan_sites() {
        out.push_str(&format!("Site: {} ({})\n", site.name, site.resource_id));
    }

    if out.is_empty() {
        out.push_str("No regions found.\n");
    }
    out
}

/// Nested JSON form of the tree for `-o json|yaml`
fn tree_value(regions: &[Region], sites: &[Site]) -> Value {
    fn node(tree: &Tree, region: &Region, seen: &mut HashSet<String>) -> Value {
        seen.insert(region.resource_id.clone());
        let mut children = Vec::new();
        if let Some(list) = tree.children.get(region.resource_id.as_str()) {
            for child in list {
                if !seen.contains(&child.resource_id) {
                    children.push(node(tree, child, seen));
                }
            }
        }
        let sites: Vec<Value> = tree
            .sites
            .get(region.resource_id.as_str())
            .map(|s| s.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(|s| json!({ "name": s.name, "resourceId": s.resource_id }))
            .collect();
        json!({
            "name": region.name,
            "resourceId": region.resource_id,
            "regions": children,
            "sites": sites,
        })
    }

    let tree = Tree::new(regions, sites);
    let mut seen = HashSet::new();
    let mut roots = Vec::new();
    let mut candidates = tree.roots();
    let mut rest: Vec<&Region> = tree.regions.values().copied().collect();
    rest.sort_by(|a, b| a.name.cmp(&b.name));
    candidates.extend(rest);
    for region in candidates {
        if !seen.contains(&region.resource_id) {
            roots.push(node(&tree, region, &mut seen));
        }
    }
    Value::Array(roots)
}
