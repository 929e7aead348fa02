//! `orch-cli * host` - Host registration and management

use console::style;
use miette::{IntoDiagnostic, Result, WrapErr};
use serde_json::{json, Map, Value};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::cli::commands::osprofile::OS_PROFILES;
use crate::cli::commands::region::REGIONS;
use crate::cli::commands::site::SITES;
use crate::cli::context::Context;
use crate::cli::output::{print_success, write_structured};
use crate::cli::resource_cmd::{
    metadata_value, resolve_id, run_list_generic, ListArgs as CommonListArgs, ResourceConfig,
};
use crate::cli::table::ColumnDef;
use crate::cli::OutputFormat;
use crate::core::validate;
use crate::core::Feature;
use crate::entities::host::{read_records, registration_body, HostImportRecord};

#[derive(clap::Args, Debug)]
#[group(skip)]
pub struct ListArgs {
    #[command(flatten)]
    pub common: CommonListArgs,

    /// Only hosts at this site (name or ID)
    #[arg(long, short = 's')]
    pub site: Option<String>,

    /// Only hosts in this region (name or ID)
    #[arg(long, short = 'r')]
    pub region: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Host name or ID
    pub host: String,

    /// New name
    #[arg(long)]
    pub name: Option<String>,

    /// Assign to this site (name or ID)
    #[arg(long, short = 's')]
    pub site: Option<String>,

    /// Replace metadata with these key=value pairs (repeatable)
    #[arg(long, short = 'm')]
    pub metadata: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct RegisterArgs {
    /// Host name
    #[arg(conflicts_with = "import_from_csv")]
    pub name: Option<String>,

    /// Serial number
    #[arg(long)]
    pub serial: Option<String>,

    /// System UUID
    #[arg(long)]
    pub uuid: Option<String>,

    /// Onboard automatically when the host first connects
    #[arg(long)]
    pub auto_onboard: bool,

    /// Register every host listed in a CSV file
    /// (columns: Name,Serial,UUID,OSProfile,Site,Metadata)
    #[arg(long, value_name = "FILE", conflicts_with_all = ["serial", "uuid"])]
    pub import_from_csv: Option<PathBuf>,

    /// Validate the CSV without registering anything
    #[arg(long, requires = "import_from_csv")]
    pub dry_run: bool,
}

#[derive(clap::Args, Debug)]
pub struct DeauthorizeArgs {
    /// Host name or ID
    pub host: String,

    /// Reason recorded with the invalidation
    #[arg(long)]
    pub reason: Option<String>,
}

const HOST_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("NAME", "name"),
    ColumnDef::new("ID", "resourceId"),
    ColumnDef::new("SERIAL", "serialNumber"),
    ColumnDef::new("UUID", "uuid"),
    ColumnDef::new("SITE", "site.name"),
    ColumnDef::new("STATUS", "hostStatus"),
];

const HOST_DETAIL: &[ColumnDef] = &[
    ColumnDef::new("Name", "name"),
    ColumnDef::new("Resource ID", "resourceId"),
    ColumnDef::new("Serial", "serialNumber"),
    ColumnDef::new("UUID", "uuid"),
    ColumnDef::new("Site", "site.name"),
    ColumnDef::new("Status", "hostStatus"),
    ColumnDef::new("Onboarding", "onboardingStatus"),
    ColumnDef::new("Registration", "registrationStatus"),
    ColumnDef::new("OS", "instance.currentOs.name"),
    ColumnDef::new("CPU model", "cpuModel"),
    ColumnDef::new("CPU cores", "cpuCores"),
    ColumnDef::new("Memory (bytes)", "memoryBytes"),
    ColumnDef::new("Metadata", "metadata"),
];

pub const HOSTS: ResourceConfig = ResourceConfig {
    name: "host",
    name_plural: "hosts",
    feature: Feature::EdgeInfra,
    collection: "/v1/projects/{project}/compute/hosts",
    list_key: "hosts",
    id_field: "resourceId",
    name_field: "name",
    id_prefix: Some("host-"),
    columns: HOST_COLUMNS,
    detail: HOST_DETAIL,
};

const INSTANCES_PATH: &str = "/v1/projects/{project}/compute/instances";

pub fn list(args: ListArgs, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    let mut clauses = Vec::new();
    if let Some(site) = &args.site {
        let id = resolve_id(&SITES, ctx, site)?;
        clauses.push(format!("site.resourceId=\"{}\"", id));
    }
    if let Some(region) = &args.region {
        let id = resolve_id(&REGIONS, ctx, region)?;
        clauses.push(format!("site.region.resourceId=\"{}\"", id));
    }
    let query = if clauses.is_empty() {
        Vec::new()
    } else {
        vec![("filter".to_string(), clauses.join(" AND "))]
    };
    run_list_generic(&HOSTS, &args.common, &query, ctx, out)
}

pub fn set(args: SetArgs, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    let mut body = Map::new();
    if let Some(name) = &args.name {
        validate::resource_name("host", name)?;
        body.insert("name".into(), json!(name));
    }
    if !args.metadata.is_empty() {
        body.insert("metadata".into(), metadata_value(&args.metadata)?);
    }
    if let Some(site) = &args.site {
        body.insert("siteId".into(), json!(resolve_id(&SITES, ctx, site)?));
    }
    if body.is_empty() {
        return Err(miette::miette!(
            help = "pass --name, --site or --metadata",
            "nothing to update"
        ));
    }

    let id = resolve_id(&HOSTS, ctx, &args.host)?;
    let path = HOSTS.item_path(ctx, &id)?;
    ctx.client.patch(&path, &Value::Object(body), HOSTS.name)?;
    print_success(out, format!("Updated host {}", args.host))
}

pub fn deauthorize(args: DeauthorizeArgs, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    let id = resolve_id(&HOSTS, ctx, &args.host)?;
    let path = format!("{}/invalidate", HOSTS.item_path(ctx, &id)?);
    let body = match &args.reason {
        Some(reason) => json!({ "note": reason }),
        None => json!({}),
    };
    ctx.client.put(&path, &body, HOSTS.name)?;
    print_success(out, format!("Deauthorized host {}", args.host))
}

pub fn register(args: RegisterArgs, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    if let Some(csv_path) = &args.import_from_csv {
        return register_from_csv(csv_path, args.dry_run, args.auto_onboard, ctx, out);
    }

    let name = args.name.as_deref().ok_or_else(|| {
        miette::miette!(
            help = "pass a host name, or --import-from-csv FILE",
            "missing host name"
        )
    })?;
    if args.serial.is_none() && args.uuid.is_none() {
        return Err(miette::miette!(
            help = "pass --serial, --uuid or both",
            "a host needs a serial number or UUID to register"
        ));
    }

    let record = HostImportRecord {
        name: name.to_string(),
        serial: args.serial.clone().unwrap_or_default(),
        uuid: args.uuid.clone().unwrap_or_default(),
        ..Default::default()
    };
    record.validate()?;

    let body = registration_body(
        name,
        args.serial.as_deref(),
        args.uuid.as_deref(),
        args.auto_onboard,
    );
    let path = format!("{}/register", HOSTS.collection_path(ctx)?);
    let host = ctx.client.post(&path, &body, HOSTS.name)?;

    match ctx.format {
        OutputFormat::Table => {
            let id = HOSTS.id_of(&host).unwrap_or("unknown id");
            print_success(out, format!("Registered host {} ({})", name, id))
        }
        other => write_structured(out, other, &host),
    }
}

/// Outcome of one CSV row
struct RowFailure {
    line: usize,
    host: String,
    message: String,
}

fn register_from_csv(
    path: &Path,
    dry_run: bool,
    auto_onboard: bool,
    ctx: &Context,
    out: &mut dyn Write,
) -> Result<()> {
    let file = File::open(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("cannot open '{}'", path.display()))?;
    let records = read_records(file)
        .into_diagnostic()
        .wrap_err_with(|| format!("cannot parse '{}'", path.display()))?;

    let mut failures = Vec::new();
    let mut registered = 0usize;

    for (index, record) in records.iter().enumerate() {
        // Line 1 is the header
        let line = index + 2;
        let result = record
            .validate()
            .map_err(miette::Report::new)
            .and_then(|_| {
                if dry_run {
                    Ok(())
                } else {
                    register_record(record, auto_onboard, ctx)
                }
            });

        match result {
            Ok(()) => {
                registered += 1;
                let verb = if dry_run { "Valid" } else { "Registered" };
                writeln!(
                    out,
                    "{} {} host {}",
                    style("✓").green(),
                    verb,
                    record.display_name()
                )
                .into_diagnostic()?;
            }
            Err(e) => {
                writeln!(
                    out,
                    "{} line {}: {}: {}",
                    style("✗").red(),
                    line,
                    record.display_name(),
                    e
                )
                .into_diagnostic()?;
                failures.push(RowFailure {
                    line,
                    host: record.display_name().to_string(),
                    message: e.to_string(),
                });
            }
        }
    }

    writeln!(
        out,
        "{} of {} hosts {}",
        registered,
        records.len(),
        if dry_run { "valid" } else { "registered" }
    )
    .into_diagnostic()?;

    if failures.is_empty() {
        Ok(())
    } else {
        let summary: Vec<String> = failures
            .iter()
            .map(|f| format!("line {} ({}): {}", f.line, f.host, f.message))
            .collect();
        Err(miette::miette!(
            help = "fix the listed rows and import them again",
            "{} of {} rows failed:\n{}",
            failures.len(),
            records.len(),
            summary.join("\n")
        ))
    }
}

/// Register one row, then assign its site and provision its OS profile
fn register_record(record: &HostImportRecord, auto_onboard: bool, ctx: &Context) -> Result<()> {
    let register_path = format!("{}/register", HOSTS.collection_path(ctx)?);
    let host = ctx
        .client
        .post(&register_path, &record.register_body(auto_onboard), HOSTS.name)?;
    let host_id = HOSTS
        .id_of(&host)
        .ok_or_else(|| miette::miette!("registration response carried no host ID"))?
        .to_string();

    let mut update = Map::new();
    if !record.site.is_empty() {
        update.insert("siteId".into(), json!(resolve_id(&SITES, ctx, &record.site)?));
    }
    let metadata = record.metadata_pairs()?;
    if !metadata.is_empty() {
        let list: Vec<Value> = metadata
            .into_iter()
            .map(|(key, value)| json!({ "key": key, "value": value }))
            .collect();
        update.insert("metadata".into(), Value::Array(list));
    }
    if !update.is_empty() {
        let path = HOSTS.item_path(ctx, &host_id)?;
        ctx.client.patch(&path, &Value::Object(update), HOSTS.name)?;
    }

    if !record.os_profile.is_empty() {
        let os_id = resolve_id(&OS_PROFILES, ctx, &record.os_profile)?;
        let body = json!({
            "name": format!("{}-instance", record.display_name()),
            "kind": "INSTANCE_KIND_METAL",
            "hostID": host_id,
            "osID": os_id,
        });
        ctx.client.post(&ctx.path(INSTANCES_PATH)?, &body, "instance")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::context::testing::{context, output};
    use crate::core::client::testing::MockTransport;
    use reqwest::Method;
    use tempfile::TempDir;

    #[test]
    fn test_register_single_host() {
        let mock = MockTransport::new();
        mock.respond(200, json!({"resourceId": "host-1a2b3c4d", "name": "edge-01"}));
        let ctx = context(&mock);
        let mut out = Vec::new();
        register(
            RegisterArgs {
                name: Some("edge-01".to_string()),
                serial: Some("FZBC123".to_string()),
                uuid: None,
                auto_onboard: true,
                import_from_csv: None,
                dry_run: false,
            },
            &ctx,
            &mut out,
        )
        .unwrap();

        let req = &mock.requests()[0];
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.path, "/v1/projects/acme/compute/hosts/register");
        let body = req.body.as_ref().unwrap();
        assert_eq!(body["serialNumber"], "FZBC123");
        assert_eq!(body["autoOnboard"], true);
        assert!(output(out).contains("host-1a2b3c4d"));
    }

    #[test]
    fn test_register_requires_identity() {
        let mock = MockTransport::new();
        let ctx = context(&mock);
        let mut out = Vec::new();
        let result = register(
            RegisterArgs {
                name: Some("edge-01".to_string()),
                serial: None,
                uuid: None,
                auto_onboard: false,
                import_from_csv: None,
                dry_run: false,
            },
            &ctx,
            &mut out,
        );
        assert!(result.is_err());
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn test_csv_import_collects_row_failures() {
        let tmp = TempDir::new().unwrap();
        let csv = tmp.path().join("hosts.csv");
        std::fs::write(
            &csv,
            "Name,Serial,UUID,OSProfile,Site,Metadata\n\
             edge-01,S1,,ubuntu,site-1,env=prod\n\
             edge-02,,,,,\n\
             edge-03,S3,,,,\n",
        )
        .unwrap();

        let mock = MockTransport::new();
        // edge-01: register, assign site + metadata, resolve OS profile, create instance
        mock.respond(200, json!({"resourceId": "host-1"}));
        mock.respond(200, json!({}));
        mock.respond(200, json!({"operatingSystemResources": [{"name": "ubuntu", "resourceId": "os-9"}]}));
        mock.respond(200, json!({"resourceId": "inst-1"}));
        // edge-02 fails validation locally; edge-03 is rejected by the backend
        mock.respond(409, json!({"message": "serial already registered"}));

        let ctx = context(&mock);
        let mut out = Vec::new();
        let err = register(
            RegisterArgs {
                name: None,
                serial: None,
                uuid: None,
                auto_onboard: false,
                import_from_csv: Some(csv),
                dry_run: false,
            },
            &ctx,
            &mut out,
        )
        .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("2 of 3 rows failed"));
        assert!(message.contains("line 3 (edge-02)"));
        assert!(message.contains("serial already registered"));

        let requests = mock.requests();
        assert_eq!(requests.len(), 5);
        assert_eq!(requests[1].method, Method::PATCH);
        assert_eq!(requests[1].body.as_ref().unwrap()["siteId"], "site-1");
        assert_eq!(requests[3].path, "/v1/projects/acme/compute/instances");
        assert_eq!(requests[3].body.as_ref().unwrap()["osID"], "os-9");
        assert!(output(out).contains("1 of 3 hosts registered"));
    }

    #[test]
    fn test_csv_dry_run_makes_no_requests() {
        let tmp = TempDir::new().unwrap();
        let csv = tmp.path().join("hosts.csv");
        std::fs::write(&csv, "Name,Serial,UUID,OSProfile,Site,Metadata\nedge-01,S1,,,,\n").unwrap();

        let mock = MockTransport::new();
        let ctx = context(&mock);
        let mut out = Vec::new();
        register(
            RegisterArgs {
                name: None,
                serial: None,
                uuid: None,
                auto_onboard: false,
                import_from_csv: Some(csv),
                dry_run: true,
            },
            &ctx,
            &mut out,
        )
        .unwrap();
        assert!(mock.requests().is_empty());
        assert!(output(out).contains("1 of 1 hosts valid"));
    }

    #[test]
    fn test_deauthorize_puts_invalidate() {
        let mock = MockTransport::new();
        mock.respond(200, Value::Null);
        let ctx = context(&mock);
        let mut out = Vec::new();
        deauthorize(
            DeauthorizeArgs {
                host: "host-1".to_string(),
                reason: Some("stolen".to_string()),
            },
            &ctx,
            &mut out,
        )
        .unwrap();
        let req = &mock.requests()[0];
        assert_eq!(req.method, Method::PUT);
        assert_eq!(req.path, "/v1/projects/acme/compute/hosts/host-1/invalidate");
        assert_eq!(req.body.as_ref().unwrap()["note"], "stolen");
    }
}
