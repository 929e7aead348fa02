//! `orch-cli * osupdatepolicy` - OS update policies

use miette::Result;
use serde_json::{json, Map, Value};
use std::io::Write;

use crate::cli::commands::osprofile::OS_PROFILES;
use crate::cli::context::Context;
use crate::cli::resource_cmd::{report_created, resolve_id, ResourceConfig};
use crate::cli::table::ColumnDef;
use crate::core::validate;
use crate::core::Feature;

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePolicy {
    /// Follow the latest OS version
    Latest,
    /// Pin to the OS profile given with --target-os
    Target,
}

impl UpdatePolicy {
    fn api_value(self) -> &'static str {
        match self {
            UpdatePolicy::Latest => "UPDATE_POLICY_LATEST",
            UpdatePolicy::Target => "UPDATE_POLICY_TARGET",
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct CreateArgs {
    /// Policy name
    pub name: String,

    #[arg(long, value_enum)]
    pub update_policy: UpdatePolicy,

    /// Target OS profile (name or ID), required with --update-policy target
    #[arg(long)]
    pub target_os: Option<String>,

    /// Kernel command line to apply
    #[arg(long)]
    pub kernel_command: Option<String>,

    /// APT source lines (repeatable)
    #[arg(long)]
    pub update_sources: Vec<String>,

    /// Packages to install (repeatable)
    #[arg(long)]
    pub install_packages: Vec<String>,

    #[arg(long, short = 'd')]
    pub description: Option<String>,
}

const POLICY_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("NAME", "name"),
    ColumnDef::new("ID", "resourceId"),
    ColumnDef::new("POLICY", "updatePolicy"),
    ColumnDef::new("TARGET OS", "targetOs.name"),
];

const POLICY_DETAIL: &[ColumnDef] = &[
    ColumnDef::new("Name", "name"),
    ColumnDef::new("Resource ID", "resourceId"),
    ColumnDef::new("Description", "description"),
    ColumnDef::new("Policy", "updatePolicy"),
    ColumnDef::new("Target OS", "targetOs.name"),
    ColumnDef::new("Kernel command", "updateKernelCommand"),
    ColumnDef::new("Update sources", "updateSources"),
    ColumnDef::new("Packages", "updatePackages"),
];

pub const OS_UPDATE_POLICIES: ResourceConfig = ResourceConfig {
    name: "OS update policy",
    name_plural: "OS update policies",
    feature: Feature::EdgeInfra,
    collection: "/v1/projects/{project}/os/update/policy",
    list_key: "osUpdatePolicies",
    id_field: "resourceId",
    name_field: "name",
    id_prefix: Some("osupdatepolicy-"),
    columns: POLICY_COLUMNS,
    detail: POLICY_DETAIL,
};

pub fn create(args: CreateArgs, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    validate::resource_name("OS update policy", &args.name)?;
    if args.update_policy == UpdatePolicy::Target && args.target_os.is_none() {
        return Err(miette::miette!(
            help = "pass --target-os PROFILE",
            "a target policy needs a target OS"
        ));
    }

    let mut body = Map::new();
    body.insert("name".into(), json!(args.name));
    body.insert("updatePolicy".into(), json!(args.update_policy.api_value()));
    if let Some(description) = &args.description {
        body.insert("description".into(), json!(description));
    }
    if let Some(kernel) = &args.kernel_command {
        body.insert("updateKernelCommand".into(), json!(kernel));
    }
    if !args.update_sources.is_empty() {
        body.insert("updateSources".into(), json!(args.update_sources));
    }
    if !args.install_packages.is_empty() {
        body.insert("updatePackages".into(), json!(args.install_packages.join("\n")));
    }
    if let Some(target) = &args.target_os {
        body.insert("targetOsId".into(), json!(resolve_id(&OS_PROFILES, ctx, target)?));
    }

    let path = OS_UPDATE_POLICIES.collection_path(ctx)?;
    let created = ctx
        .client
        .post(&path, &Value::Object(body), OS_UPDATE_POLICIES.name)?;
    report_created(&OS_UPDATE_POLICIES, &args.name, &created, ctx, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::context::testing::context;
    use crate::core::client::testing::MockTransport;

    fn args(policy: UpdatePolicy, target: Option<&str>) -> CreateArgs {
        CreateArgs {
            name: "weekly".to_string(),
            update_policy: policy,
            target_os: target.map(String::from),
            kernel_command: None,
            update_sources: vec![],
            install_packages: vec!["curl".to_string(), "jq".to_string()],
            description: None,
        }
    }

    #[test]
    fn test_target_policy_resolves_os() {
        let mock = MockTransport::new();
        mock.respond(
            200,
            json!({"operatingSystemResources": [{"name": "emt", "resourceId": "os-1"}]}),
        );
        mock.respond(200, json!({"resourceId": "osupdatepolicy-1"}));
        let ctx = context(&mock);
        let mut out = Vec::new();
        create(args(UpdatePolicy::Target, Some("emt")), &ctx, &mut out).unwrap();

        let requests = mock.requests();
        let body = requests[1].body.as_ref().unwrap();
        assert_eq!(requests[1].path, "/v1/projects/acme/os/update/policy");
        assert_eq!(body["updatePolicy"], "UPDATE_POLICY_TARGET");
        assert_eq!(body["targetOsId"], "os-1");
        assert_eq!(body["updatePackages"], "curl\njq");
    }

    #[test]
    fn test_target_policy_needs_target() {
        let mock = MockTransport::new();
        let ctx = context(&mock);
        let mut out = Vec::new();
        assert!(create(args(UpdatePolicy::Target, None), &ctx, &mut out).is_err());
        assert!(mock.requests().is_empty());
    }
}
