//! `orch-cli * cluster` - Cluster lifecycle and kubeconfig access

use miette::{IntoDiagnostic, Result};
use serde_json::{json, Value};
use std::io::Write;
use std::path::PathBuf;

use crate::cli::commands::host::HOSTS;
use crate::cli::context::Context;
use crate::cli::helpers::write_text_file;
use crate::cli::output::print_success;
use crate::cli::resource_cmd::{fetch_one, report_created, ResourceConfig};
use crate::cli::table::ColumnDef;
use crate::core::validate::{self, ValidationError};
use crate::core::Feature;
use crate::entities::host::is_uuid;
use crate::entities::TemplateRef;

#[derive(clap::Args, Debug)]
pub struct CreateArgs {
    /// Cluster name (DNS label)
    pub name: String,

    /// Template as NAME-vX.Y.Z (the project default when omitted)
    #[arg(long)]
    pub template: Option<String>,

    /// Nodes as HOST[:ROLE], comma separated; roles are all, controlplane, worker
    #[arg(long, required = true, value_delimiter = ',')]
    pub nodes: Vec<String>,

    /// Cluster labels as key=value (repeatable)
    #[arg(long)]
    pub labels: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    pub name: String,

    /// Replacement labels as key=value (repeatable)
    #[arg(long, required = true)]
    pub labels: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct UpgradeArgs {
    pub name: String,

    /// Template version to move to (vX.Y.Z)
    #[arg(long)]
    pub version: String,
}

#[derive(clap::Args, Debug)]
pub struct KubeconfigArgs {
    /// Cluster name
    pub cluster: String,

    /// Write to this file instead of stdout
    #[arg(long, short = 'f')]
    pub output_file: Option<PathBuf>,
}

const CLUSTER_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("NAME", "name"),
    ColumnDef::new("TEMPLATE", "template"),
    ColumnDef::new("NODES", "nodeQuantity"),
    ColumnDef::new("LIFECYCLE", "lifecyclePhase.indicator"),
    ColumnDef::new("PROVIDER", "providerStatus.indicator"),
    ColumnDef::new("KUBERNETES", "kubernetesVersion"),
];

const CLUSTER_DETAIL: &[ColumnDef] = &[
    ColumnDef::new("Name", "name"),
    ColumnDef::new("Template", "template"),
    ColumnDef::new("Kubernetes", "kubernetesVersion"),
    ColumnDef::new("Nodes", "nodeQuantity"),
    ColumnDef::new("Lifecycle", "lifecyclePhase.message"),
    ColumnDef::new("Provider", "providerStatus.message"),
    ColumnDef::new("Control plane", "controlPlaneReady.message"),
    ColumnDef::new("Infrastructure", "infrastructureReady.message"),
    ColumnDef::new("Node health", "nodeHealth.message"),
    ColumnDef::new("Labels", "labels"),
];

pub const CLUSTERS: ResourceConfig = ResourceConfig {
    name: "cluster",
    name_plural: "clusters",
    feature: Feature::ClusterOrch,
    collection: "/v2/projects/{project}/clusters",
    list_key: "clusters",
    id_field: "name",
    name_field: "name",
    id_prefix: None,
    columns: CLUSTER_COLUMNS,
    detail: CLUSTER_DETAIL,
};

const ROLES: &[&str] = &["all", "controlplane", "worker"];

/// Labels as the JSON object the cluster manager expects
fn labels_object(pairs: &[String]) -> Result<Value> {
    Ok(json!(validate::parse_labels(pairs)?))
}

/// Turn one `HOST[:ROLE]` into a node entry keyed by the host UUID
fn node_entry(spec: &str, ctx: &Context) -> Result<Value> {
    let (host, role) = match spec.rsplit_once(':') {
        Some((host, role)) => (host.trim(), role.trim()),
        None => (spec.trim(), "all"),
    };
    if !ROLES.contains(&role) {
        return Err(ValidationError::Field {
            field: "node role",
            message: format!("'{}' is not one of {}", role, ROLES.join(", ")),
        }
        .into());
    }

    let uuid = if is_uuid(host) {
        host.to_string()
    } else {
        let value = fetch_one(&HOSTS, ctx, host)?;
        value
            .get("uuid")
            .and_then(Value::as_str)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| miette::miette!("host '{}' has no UUID to join a cluster with", host))?
            .to_string()
    };
    Ok(json!({ "id": uuid, "role": role }))
}

pub fn create(args: CreateArgs, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    validate::dns_label("cluster", &args.name)?;
    let template = args
        .template
        .as_deref()
        .map(str::parse::<TemplateRef>)
        .transpose()?;
    let labels = labels_object(&args.labels)?;

    let nodes = args
        .nodes
        .iter()
        .filter(|n| !n.trim().is_empty())
        .map(|n| node_entry(n, ctx))
        .collect::<Result<Vec<_>>>()?;

    let mut body = json!({
        "name": args.name,
        "nodes": nodes,
        "labels": labels,
    });
    if let Some(template) = template {
        body["template"] = json!(template.to_string());
    }

    let path = CLUSTERS.collection_path(ctx)?;
    let created = ctx.client.post(&path, &body, CLUSTERS.name)?;
    let created = match created {
        Value::String(_) | Value::Null => json!({ "name": args.name }),
        other => other,
    };
    report_created(&CLUSTERS, &args.name, &created, ctx, out)
}

pub fn set(args: SetArgs, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    let body = json!({ "labels": labels_object(&args.labels)? });
    let path = format!("{}/labels", CLUSTERS.item_path(ctx, &args.name)?);
    ctx.client.put(&path, &body, CLUSTERS.name)?;
    print_success(out, format!("Updated labels of cluster {}", args.name))
}

pub fn upgrade(args: UpgradeArgs, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    validate::template_version(&args.version)?;

    let cluster = fetch_one(&CLUSTERS, ctx, &args.name)?;
    let current: TemplateRef = cluster
        .get("template")
        .and_then(Value::as_str)
        .ok_or_else(|| miette::miette!("cluster '{}' reports no template", args.name))?
        .parse()?;
    if current.version == args.version {
        return Err(miette::miette!(
            "cluster '{}' already runs {}",
            args.name,
            current
        ));
    }

    let target = TemplateRef::new(current.name.clone(), args.version.clone());
    let path = format!("{}/template", CLUSTERS.item_path(ctx, &args.name)?);
    ctx.client.put(&path, &target.to_value(), CLUSTERS.name)?;
    print_success(
        out,
        format!("Upgrading cluster {} from {} to {}", args.name, current, target),
    )
}

pub fn kubeconfig(args: KubeconfigArgs, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    let path = format!("{}/kubeconfigs", CLUSTERS.item_path(ctx, &args.cluster)?);
    let response = ctx.client.get(&path, CLUSTERS.name)?;
    let kubeconfig = response
        .get("kubeconfig")
        .and_then(Value::as_str)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| {
            miette::miette!(
                help = "the cluster may still be provisioning",
                "no kubeconfig available for cluster '{}'",
                args.cluster
            )
        })?;

    match &args.output_file {
        Some(file) => {
            write_text_file(file, kubeconfig)?;
            print_success(out, format!("Wrote kubeconfig to {}", file.display()))
        }
        None => {
            out.write_all(kubeconfig.as_bytes()).into_diagnostic()?;
            if !kubeconfig.ends_with('\n') {
                writeln!(out).into_diagnostic()?;
            }
            Ok(())
        }
    }
}
