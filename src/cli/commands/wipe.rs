//! `orch-cli wipe project` - Delete everything inside a project

use console::style;
use miette::{IntoDiagnostic, Result, WrapErr};
use serde_json::Value;
use std::io::Write;

use crate::cli::commands::cluster::CLUSTERS;
use crate::cli::commands::customconfig::CUSTOM_CONFIGS;
use crate::cli::commands::deployment::DEPLOYMENTS;
use crate::cli::commands::host::HOSTS;
use crate::cli::commands::osupdatepolicy::OS_UPDATE_POLICIES;
use crate::cli::commands::provider::PROVIDERS;
use crate::cli::commands::region::{leaf_first, REGIONS};
use crate::cli::commands::site::SITES;
use crate::cli::commands::sshkey::SSH_KEYS;
use crate::cli::context::Context;
use crate::cli::helpers::confirm;
use crate::cli::resource_cmd::{fetch_all, ResourceConfig};
use crate::entities::Region;

#[derive(clap::Args, Debug)]
pub struct WipeArgs {
    /// Project to empty
    pub name: String,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

/// Collections in the order they are emptied; dependents go first
const ORDER: &[&ResourceConfig] = &[
    &DEPLOYMENTS,
    &CLUSTERS,
    &HOSTS,
    &SITES,
    &REGIONS,
    &OS_UPDATE_POLICIES,
    &CUSTOM_CONFIGS,
    &SSH_KEYS,
    &PROVIDERS,
];

fn label<'a>(config: &ResourceConfig, item: &'a Value, id: &'a str) -> &'a str {
    item.get(config.name_field)
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
        .unwrap_or(id)
}

/// Items of a collection in deletion order, as (id, label) pairs
fn doomed(config: &ResourceConfig, ctx: &Context) -> Result<Vec<(String, String)>> {
    let items = fetch_all(config, ctx, &[])?;
    if config.list_key == REGIONS.list_key {
        let regions: Vec<Region> = items.iter().filter_map(Region::from_value).collect();
        return Ok(leaf_first(&regions)
            .into_iter()
            .map(|r| {
                let name = if r.name.is_empty() { &r.resource_id } else { &r.name };
                (r.resource_id.clone(), name.clone())
            })
            .collect());
    }

    Ok(items
        .iter()
        .filter_map(|item| {
            let id = config.id_of(item)?;
            Some((id.to_string(), label(config, item, id).to_string()))
        })
        .collect())
}

pub fn run(args: WipeArgs, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    let project = ctx.project()?;
    if project != args.name {
        return Err(miette::miette!(
            "context project '{}' does not match '{}'",
            project,
            args.name
        ));
    }

    if !args.yes
        && !confirm(&format!(
            "Delete every deployment, cluster, host and infrastructure object in project '{}'?",
            args.name
        ))?
    {
        writeln!(out, "Aborted.").into_diagnostic()?;
        return Ok(());
    }

    let mut deleted = 0usize;
    for config in ORDER {
        if !ctx.feature_enabled(config.feature) {
            writeln!(
                out,
                "{} skipping {} ({} disabled)",
                style("-").dim(),
                config.name_plural,
                config.feature
            )
            .into_diagnostic()?;
            continue;
        }

        for (id, name) in doomed(config, ctx)? {
            let path = config.item_path(ctx, &id)?;
            ctx.client
                .delete(&path, config.name)
                .map_err(miette::Report::new)
                .wrap_err_with(|| {
                    format!(
                        "wipe stopped at {} '{}' after {} deletions",
                        config.name, name, deleted
                    )
                })?;
            deleted += 1;
            writeln!(out, "{} Deleted {} {}", style("✓").green(), config.name, name)
                .into_diagnostic()?;
        }
    }

    writeln!(
        out,
        "{} Project {} wiped ({} resources deleted)",
        style("✓").green(),
        args.name,
        deleted
    )
    .into_diagnostic()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::context::testing::output;
    use crate::cli::OutputFormat;
    use crate::core::client::testing::MockTransport;
    use crate::core::OrchestratorInfo;
    use reqwest::Method;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn context(mock: &MockTransport) -> Context {
        // Only edge-infra is installed
        let mut features = BTreeMap::new();
        features.insert("app-orch".to_string(), false);
        features.insert("cluster-orch".to_string(), false);
        Context::new(
            Box::new(mock.clone()),
            Some("acme".to_string()),
            OutputFormat::Table,
            OrchestratorInfo {
                version: None,
                features,
            },
        )
    }

    fn args() -> WipeArgs {
        WipeArgs {
            name: "acme".to_string(),
            yes: true,
        }
    }

    #[test]
    fn test_wipe_order_and_skips() {
        let mock = MockTransport::new();
        mock.respond(200, json!({"hosts": [{"resourceId": "host-1", "name": "edge-01"}]}));
        mock.respond(200, Value::Null);
        mock.respond(200, json!({"sites": [{"resourceId": "site-1", "name": "lab"}]}));
        mock.respond(200, Value::Null);
        mock.respond(
            200,
            json!({"regions": [
                {"resourceId": "region-1", "name": "us"},
                {"resourceId": "region-2", "name": "west", "parentRegion": {"resourceId": "region-1"}}
            ]}),
        );
        mock.respond(200, Value::Null);
        mock.respond(200, Value::Null);
        for key in ["osUpdatePolicies", "customConfigs", "localAccounts", "providers"] {
            mock.respond(200, json!({ key: [] }));
        }

        let ctx = context(&mock);
        let mut out = Vec::new();
        run(args(), &ctx, &mut out).unwrap();

        let deletes: Vec<String> = mock
            .requests()
            .into_iter()
            .filter(|r| r.method == Method::DELETE)
            .map(|r| r.path)
            .collect();
        assert_eq!(
            deletes,
            vec![
                "/v1/projects/acme/compute/hosts/host-1",
                "/v1/projects/acme/sites/site-1",
                "/v1/projects/acme/regions/region-2",
                "/v1/projects/acme/regions/region-1",
            ]
        );
        let text = output(out);
        assert!(text.contains("skipping deployments (app-orch disabled)"));
        assert!(text.contains("skipping clusters (cluster-orch disabled)"));
        assert!(text.contains("4 resources deleted"));
    }

    #[test]
    fn test_wipe_stops_on_first_failure() {
        let mock = MockTransport::new();
        mock.respond(
            200,
            json!({"hosts": [
                {"resourceId": "host-1", "name": "edge-01"},
                {"resourceId": "host-2", "name": "edge-02"}
            ]}),
        );
        mock.respond(409, json!({"message": "host is in use"}));

        let ctx = context(&mock);
        let mut out = Vec::new();
        let err = run(args(), &ctx, &mut out).unwrap_err();
        assert!(err.chain().any(|e| e.to_string().contains("host is in use")));
        assert!(err.to_string().contains("wipe stopped at host 'edge-01'"));
        assert_eq!(mock.requests().len(), 2);
    }

    #[test]
    fn test_wipe_requires_matching_project() {
        let mock = MockTransport::new();
        let ctx = context(&mock);
        let mut out = Vec::new();
        let result = run(
            WipeArgs {
                name: "other".to_string(),
                yes: true,
            },
            &ctx,
            &mut out,
        );
        assert!(result.is_err());
        assert!(mock.requests().is_empty());
    }
}
