//! `orch-cli * customconfig` - Custom cloud-init configs

use miette::Result;
use serde_json::{json, Map, Value};
use std::io::Write;
use std::path::PathBuf;

use crate::cli::context::Context;
use crate::cli::helpers::read_text_file;
use crate::cli::resource_cmd::{report_created, ResourceConfig};
use crate::cli::table::ColumnDef;
use crate::core::validate;
use crate::core::Feature;
use crate::yaml::parse_yaml;

#[derive(clap::Args, Debug)]
pub struct CreateArgs {
    /// Config name
    pub name: String,

    /// cloud-init document to attach
    #[arg(long, value_name = "FILE")]
    pub cloud_init_file: PathBuf,

    #[arg(long, short = 'd')]
    pub description: Option<String>,
}

const CONFIG_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("NAME", "name"),
    ColumnDef::new("ID", "resourceId"),
    ColumnDef::new("DESCRIPTION", "description"),
];

const CONFIG_DETAIL: &[ColumnDef] = &[
    ColumnDef::new("Name", "name"),
    ColumnDef::new("Resource ID", "resourceId"),
    ColumnDef::new("Description", "description"),
    ColumnDef::new("Config", "config"),
];

pub const CUSTOM_CONFIGS: ResourceConfig = ResourceConfig {
    name: "custom config",
    name_plural: "custom configs",
    feature: Feature::EdgeInfra,
    collection: "/v1/projects/{project}/customConfigs",
    list_key: "customConfigs",
    id_field: "resourceId",
    name_field: "name",
    id_prefix: Some("customconfig-"),
    columns: CONFIG_COLUMNS,
    detail: CONFIG_DETAIL,
};

pub fn create(args: CreateArgs, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    validate::resource_name("custom config", &args.name)?;
    let config = read_text_file(&args.cloud_init_file, "cloud-init file")?;
    parse_yaml::<serde_yml::Value>(&config, &args.cloud_init_file.display().to_string())?;

    let mut body = Map::new();
    body.insert("name".into(), json!(args.name));
    body.insert("config".into(), json!(config));
    if let Some(description) = &args.description {
        body.insert("description".into(), json!(description));
    }

    let path = CUSTOM_CONFIGS.collection_path(ctx)?;
    let created = ctx.client.post(&path, &Value::Object(body), CUSTOM_CONFIGS.name)?;
    report_created(&CUSTOM_CONFIGS, &args.name, &created, ctx, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::context::testing::context;
    use crate::core::client::testing::MockTransport;
    use tempfile::TempDir;

    #[test]
    fn test_create_sends_file_contents() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("nginx.yaml");
        std::fs::write(&file, "#cloud-config\npackages:\n  - nginx\n").unwrap();

        let mock = MockTransport::new();
        mock.respond(200, json!({"resourceId": "customconfig-1", "name": "nginx"}));
        let ctx = context(&mock);
        let mut out = Vec::new();
        create(
            CreateArgs {
                name: "nginx".to_string(),
                cloud_init_file: file,
                description: Some("web".to_string()),
            },
            &ctx,
            &mut out,
        )
        .unwrap();

        let body = mock.requests()[0].body.clone().unwrap();
        assert!(body["config"].as_str().unwrap().contains("nginx"));
        assert_eq!(body["description"], "web");
    }

    #[test]
    fn test_create_rejects_non_yaml() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("bad.yaml");
        std::fs::write(&file, "key: [unclosed\n").unwrap();

        let mock = MockTransport::new();
        let ctx = context(&mock);
        let mut out = Vec::new();
        let result = create(
            CreateArgs {
                name: "bad".to_string(),
                cloud_init_file: file,
                description: None,
            },
            &ctx,
            &mut out,
        );
        assert!(result.is_err());
        assert!(mock.requests().is_empty());
    }
}
