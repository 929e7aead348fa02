//! `orch-cli * deployment` - Application deployments

use miette::Result;
use serde_json::{json, Value};
use std::io::Write;

use crate::cli::commands::catalog::DEPLOYMENT_PACKAGES;
use crate::cli::context::Context;
use crate::cli::output::{print_success, write_structured};
use crate::cli::resource_cmd::ResourceConfig;
use crate::cli::table::ColumnDef;
use crate::cli::OutputFormat;
use crate::core::validate;
use crate::core::Feature;

#[derive(clap::Args, Debug)]
pub struct CreateArgs {
    /// Deployment package name
    pub package: String,

    /// Deployment package version
    pub version: String,

    #[arg(long)]
    pub display_name: Option<String>,

    /// Deployment profile (package default when omitted)
    #[arg(long)]
    pub profile: Option<String>,

    /// Deploy to every cluster carrying these labels (repeatable)
    #[arg(long, conflicts_with = "cluster_id")]
    pub cluster_labels: Vec<String>,

    /// Deploy to these clusters (repeatable)
    #[arg(long)]
    pub cluster_id: Vec<String>,
}

const DEPLOYMENT_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("NAME", "name"),
    ColumnDef::new("DISPLAY NAME", "displayName"),
    ColumnDef::new("PACKAGE", "appName"),
    ColumnDef::new("VERSION", "appVersion"),
    ColumnDef::new("STATUS", "status.state"),
    ColumnDef::new("ID", "deployId"),
];

const DEPLOYMENT_DETAIL: &[ColumnDef] = &[
    ColumnDef::new("Name", "name"),
    ColumnDef::new("Display name", "displayName"),
    ColumnDef::new("Deployment ID", "deployId"),
    ColumnDef::new("Package", "appName"),
    ColumnDef::new("Version", "appVersion"),
    ColumnDef::new("Profile", "profileName"),
    ColumnDef::new("Type", "deploymentType"),
    ColumnDef::new("Status", "status.state"),
    ColumnDef::new("Status message", "status.message"),
    ColumnDef::new("Clusters running", "status.summary.running"),
    ColumnDef::new("Clusters down", "status.summary.down"),
    ColumnDef::new("Created", "createTime"),
];

pub const DEPLOYMENTS: ResourceConfig = ResourceConfig {
    name: "deployment",
    name_plural: "deployments",
    feature: Feature::AppOrch,
    collection: "/v1/projects/{project}/appdeployment/deployments",
    list_key: "deployments",
    id_field: "deployId",
    name_field: "name",
    id_prefix: None,
    columns: DEPLOYMENT_COLUMNS,
    detail: DEPLOYMENT_DETAIL,
};

/// Application names referenced by a deployment package version
fn package_applications(package: &str, version: &str, ctx: &Context) -> Result<Vec<String>> {
    let path = format!(
        "{}/versions/{}",
        DEPLOYMENT_PACKAGES.item_path(ctx, package)?,
        version
    );
    let response = ctx.client.get(&path, DEPLOYMENT_PACKAGES.name)?;
    let apps: Vec<String> = response
        .pointer("/deploymentPackage/applicationReferences")
        .and_then(Value::as_array)
        .map(|refs| {
            refs.iter()
                .filter_map(|r| r.get("name").and_then(Value::as_str))
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();
    if apps.is_empty() {
        return Err(miette::miette!(
            "deployment package {} {} references no applications",
            package,
            version
        ));
    }
    Ok(apps)
}

pub fn create(args: CreateArgs, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    if args.cluster_labels.is_empty() && args.cluster_id.is_empty() {
        return Err(miette::miette!(
            help = "pass --cluster-labels k=v for automatic placement or --cluster-id for targeted",
            "no target clusters"
        ));
    }
    let labels = validate::parse_labels(&args.cluster_labels)?;
    let apps = package_applications(&args.package, &args.version, ctx)?;

    let (deployment_type, targets): (&str, Vec<Value>) = if labels.is_empty() {
        let targets = apps
            .iter()
            .flat_map(|app| {
                args.cluster_id
                    .iter()
                    .map(move |id| json!({ "appName": app, "clusterId": id }))
            })
            .collect();
        ("targeted", targets)
    } else {
        let targets = apps
            .iter()
            .map(|app| json!({ "appName": app, "labels": labels }))
            .collect();
        ("auto-scaling", targets)
    };

    let mut body = json!({
        "appName": args.package,
        "appVersion": args.version,
        "deploymentType": deployment_type,
        "targetClusters": targets,
    });
    if let Some(display_name) = &args.display_name {
        body["displayName"] = json!(display_name);
    }
    if let Some(profile) = &args.profile {
        body["profileName"] = json!(profile);
    }

    let path = DEPLOYMENTS.collection_path(ctx)?;
    let created = ctx.client.post(&path, &body, DEPLOYMENTS.name)?;
    match ctx.format {
        OutputFormat::Table => {
            let id = created
                .get("deploymentId")
                .and_then(Value::as_str)
                .unwrap_or("unknown id");
            print_success(
                out,
                format!(
                    "Created deployment of {} {} ({})",
                    args.package, args.version, id
                ),
            )
        }
        other => write_structured(out, other, &created),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::context::testing::{context, output};
    use crate::core::client::testing::MockTransport;

    fn package() -> Value {
        json!({"deploymentPackage": {
            "name": "web",
            "version": "1.0.0",
            "applicationReferences": [
                {"name": "nginx", "version": "1.0.0"},
                {"name": "redis", "version": "7.0.0"}
            ]
        }})
    }

    fn args(labels: &[&str], clusters: &[&str]) -> CreateArgs {
        CreateArgs {
            package: "web".to_string(),
            version: "1.0.0".to_string(),
            display_name: Some("web-prod".to_string()),
            profile: None,
            cluster_labels: labels.iter().map(|s| s.to_string()).collect(),
            cluster_id: clusters.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_auto_scaling_targets_every_app() {
        let mock = MockTransport::new();
        mock.respond(200, package());
        mock.respond(200, json!({"deploymentId": "d-42"}));
        let ctx = context(&mock);
        let mut out = Vec::new();
        create(args(&["env=prod"], &[]), &ctx, &mut out).unwrap();

        let requests = mock.requests();
        assert_eq!(
            requests[0].path,
            "/v3/projects/acme/catalog/deployment_packages/web/versions/1.0.0"
        );
        let body = requests[1].body.as_ref().unwrap();
        assert_eq!(body["deploymentType"], "auto-scaling");
        assert_eq!(body["targetClusters"].as_array().unwrap().len(), 2);
        assert_eq!(body["targetClusters"][1], json!({"appName": "redis", "labels": {"env": "prod"}}));
        assert_eq!(body["displayName"], "web-prod");
        assert!(output(out).contains("d-42"));
    }

    #[test]
    fn test_targeted_crosses_apps_and_clusters() {
        let mock = MockTransport::new();
        mock.respond(200, package());
        mock.respond(200, json!({"deploymentId": "d-43"}));
        let ctx = context(&mock);
        let mut out = Vec::new();
        create(args(&[], &["c1", "c2"]), &ctx, &mut out).unwrap();

        let body = mock.requests()[1].body.clone().unwrap();
        assert_eq!(body["deploymentType"], "targeted");
        assert_eq!(body["targetClusters"].as_array().unwrap().len(), 4);
        assert_eq!(body["targetClusters"][0], json!({"appName": "nginx", "clusterId": "c1"}));
    }

    #[test]
    fn test_requires_targets() {
        let mock = MockTransport::new();
        let ctx = context(&mock);
        let mut out = Vec::new();
        assert!(create(args(&[], &[]), &ctx, &mut out).is_err());
        assert!(mock.requests().is_empty());
    }
}
