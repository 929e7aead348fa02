//! `orch-cli * clustertemplate` - Cluster templates

use miette::{IntoDiagnostic, Result};
use serde_json::{json, Value};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::cli::context::Context;
use crate::cli::filters;
use crate::cli::helpers::write_text_file;
use crate::cli::output::{print_item, print_list, print_success, write_structured};
use crate::cli::resource_cmd::{ListArgs, ResourceConfig};
use crate::cli::table::ColumnDef;
use crate::cli::OutputFormat;
use crate::core::validate;
use crate::core::Feature;
use crate::entities::TemplateRef;
use crate::schema::{load_manifest, ManifestKind};

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    pub name: String,

    pub version: String,

    /// Make this version the project default
    #[arg(long)]
    pub default: bool,
}

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// Template document (JSON or YAML)
    pub file: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    pub name: String,

    pub version: String,

    /// Destination file; .json writes JSON, anything else YAML
    #[arg(long, short = 'f')]
    pub output_file: Option<PathBuf>,
}

const TEMPLATE_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("NAME", "name"),
    ColumnDef::new("VERSION", "version"),
    ColumnDef::new("KUBERNETES", "kubernetesVersion"),
    ColumnDef::new("DEFAULT", "default"),
    ColumnDef::new("DESCRIPTION", "description"),
];

const TEMPLATE_DETAIL: &[ColumnDef] = &[
    ColumnDef::new("Name", "name"),
    ColumnDef::new("Version", "version"),
    ColumnDef::new("Kubernetes", "kubernetesVersion"),
    ColumnDef::new("Control plane", "controlplaneprovidertype"),
    ColumnDef::new("Infrastructure", "infraprovidertype"),
    ColumnDef::new("Pod CIDRs", "clusterNetwork.pods.cidrBlocks"),
    ColumnDef::new("Service CIDRs", "clusterNetwork.services.cidrBlocks"),
    ColumnDef::new("Labels", "clusterLabels"),
    ColumnDef::new("Description", "description"),
];

pub const TEMPLATES: ResourceConfig = ResourceConfig {
    name: "cluster template",
    name_plural: "cluster templates",
    feature: Feature::ClusterOrch,
    collection: "/v2/projects/{project}/templates",
    list_key: "templateInfoList",
    id_field: "name",
    name_field: "name",
    id_prefix: None,
    columns: TEMPLATE_COLUMNS,
    detail: TEMPLATE_DETAIL,
};

fn template_path(ctx: &Context, template: &TemplateRef) -> Result<String> {
    Ok(format!("{}{}", ctx.path("/v2/projects/{project}")?, template.api_path()))
}

fn checked_ref(name: &str, version: &str) -> Result<TemplateRef> {
    validate::dns_label("cluster template", name)?;
    validate::template_version(version)?;
    Ok(TemplateRef::new(name, version))
}

/// Template rows from a list response, each marked with whether it is the default
fn template_rows(response: Value) -> Vec<Value> {
    let default = response
        .get("defaultTemplateInfo")
        .and_then(TemplateRef::from_value);
    let Some(Value::Array(rows)) = response.get(TEMPLATES.list_key).cloned() else {
        return Vec::new();
    };
    rows.into_iter()
        .map(|mut row| {
            let is_default = default.is_some() && TemplateRef::from_value(&row) == default;
            if let Value::Object(map) = &mut row {
                map.insert("default".into(), json!(is_default));
            }
            row
        })
        .collect()
}

pub fn list(args: &ListArgs, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    let response = ctx
        .client
        .get(&TEMPLATES.collection_path(ctx)?, TEMPLATES.name_plural)?;
    let rows = filters::apply(
        template_rows(response),
        args.filter.as_deref(),
        args.order_by.as_deref(),
    )?;
    print_list(out, ctx.format, &rows, TEMPLATES.columns, TEMPLATES.name_plural)
}

pub fn get(name: &str, version: Option<&str>, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    match version {
        Some(version) => {
            let template = checked_ref(name, version)?;
            let value = ctx.client.get(&template_path(ctx, &template)?, TEMPLATES.name)?;
            print_item(out, ctx.format, &value, TEMPLATES.detail)
        }
        None => {
            let path = format!("{}/{}/versions", TEMPLATES.collection_path(ctx)?, name);
            let response = ctx.client.get(&path, TEMPLATES.name)?;
            print_list(
                out,
                ctx.format,
                &template_rows(response),
                TEMPLATES.columns,
                TEMPLATES.name_plural,
            )
        }
    }
}

pub fn delete(name: &str, version: &str, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    let template = checked_ref(name, version)?;
    ctx.client.delete(&template_path(ctx, &template)?, TEMPLATES.name)?;
    print_success(out, format!("Deleted cluster template {}", template))
}

pub fn set(args: SetArgs, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    if !args.default {
        return Err(miette::miette!(help = "pass --default", "nothing to update"));
    }
    let template = checked_ref(&args.name, &args.version)?;
    let path = format!("{}/{}/default", TEMPLATES.collection_path(ctx)?, template.name);
    ctx.client.put(&path, &template.to_value(), TEMPLATES.name)?;
    print_success(out, format!("{} is now the default cluster template", template))
}

pub fn import(args: ImportArgs, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    let document = load_manifest(ManifestKind::ClusterTemplate, &args.file)?;
    let template = TemplateRef::from_value(&document)
        .ok_or_else(|| miette::miette!("template document has no name or version"))?;

    ctx.client
        .post(&TEMPLATES.collection_path(ctx)?, &document, TEMPLATES.name)?;
    print_success(out, format!("Imported cluster template {}", template))
}

/// Pick the export encoding from the file extension
fn export_format(path: &Path) -> OutputFormat {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => OutputFormat::Json,
        _ => OutputFormat::Yaml,
    }
}

pub fn export(args: ExportArgs, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    let template = checked_ref(&args.name, &args.version)?;
    let value = ctx.client.get(&template_path(ctx, &template)?, TEMPLATES.name)?;

    match &args.output_file {
        Some(file) => {
            let mut buf = Vec::new();
            write_structured(&mut buf, export_format(file), &value)?;
            let text = String::from_utf8(buf).into_diagnostic()?;
            write_text_file(file, &text)?;
            print_success(out, format!("Exported {} to {}", template, file.display()))
        }
        None => {
            let format = match ctx.format {
                OutputFormat::Json => OutputFormat::Json,
                _ => OutputFormat::Yaml,
            };
            write_structured(out, format, &value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::context::testing::{context, output};
    use crate::core::client::testing::MockTransport;
    use reqwest::Method;
    use tempfile::TempDir;

    fn template_list() -> Value {
        json!({
            "templateInfoList": [
                {"name": "baseline", "version": "v2.0.1", "kubernetesVersion": "v1.30.6+rke2r1"},
                {"name": "baseline", "version": "v2.0.2", "kubernetesVersion": "v1.30.10+rke2r1"}
            ],
            "defaultTemplateInfo": {"name": "baseline", "version": "v2.0.2"}
        })
    }

    #[test]
    fn test_list_marks_default() {
        let mock = MockTransport::new();
        mock.respond(200, template_list());
        let ctx = context(&mock);
        let mut out = Vec::new();
        list(
            &ListArgs {
                filter: Some("default=true".to_string()),
                order_by: None,
            },
            &ctx,
            &mut out,
        )
        .unwrap();
        let text = output(out);
        assert!(text.contains("v2.0.2"));
        assert!(!text.contains("v2.0.1"));
    }

    #[test]
    fn test_set_default() {
        let mock = MockTransport::new();
        mock.respond(200, Value::Null);
        let ctx = context(&mock);
        let mut out = Vec::new();
        set(
            SetArgs {
                name: "baseline".to_string(),
                version: "v2.0.1".to_string(),
                default: true,
            },
            &ctx,
            &mut out,
        )
        .unwrap();
        let req = &mock.requests()[0];
        assert_eq!(req.method, Method::PUT);
        assert_eq!(req.path, "/v2/projects/acme/templates/baseline/default");
        assert_eq!(req.body, Some(json!({"name": "baseline", "version": "v2.0.1"})));
    }

    #[test]
    fn test_delete_validates_version() {
        let mock = MockTransport::new();
        let ctx = context(&mock);
        let mut out = Vec::new();
        assert!(delete("baseline", "2.0.1", &ctx, &mut out).is_err());
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn test_import_validates_then_posts() {
        let tmp = TempDir::new().unwrap();
        let good = tmp.path().join("t.yaml");
        std::fs::write(&good, "name: edge\nversion: v0.1.0\nkubernetesVersion: v1.30.6\n").unwrap();
        let bad = tmp.path().join("bad.yaml");
        std::fs::write(&bad, "name: edge\nversion: latest\n").unwrap();

        let mock = MockTransport::new();
        mock.respond(200, Value::Null);
        let ctx = context(&mock);
        let mut out = Vec::new();
        assert!(import(ImportArgs { file: bad }, &ctx, &mut out).is_err());
        import(ImportArgs { file: good }, &ctx, &mut out).unwrap();

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, "/v2/projects/acme/templates");
        assert!(output(out).contains("edge-v0.1.0"));
    }

    #[test]
    fn test_export_format_follows_extension() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("baseline.json");
        let mock = MockTransport::new();
        mock.respond(200, json!({"name": "baseline", "version": "v2.0.1"}));
        let ctx = context(&mock);
        let mut out = Vec::new();
        export(
            ExportArgs {
                name: "baseline".to_string(),
                version: "v2.0.1".to_string(),
                output_file: Some(file.clone()),
            },
            &ctx,
            &mut out,
        )
        .unwrap();

        assert_eq!(
            mock.requests()[0].path,
            "/v2/projects/acme/templates/baseline/versions/v2.0.1"
        );
        let written: Value = serde_json::from_str(&std::fs::read_to_string(file).unwrap()).unwrap();
        assert_eq!(written["version"], "v2.0.1");
        assert_eq!(export_format(Path::new("x.yml")), OutputFormat::Yaml);
    }
}
