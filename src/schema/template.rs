//! Cloud-init generation using embedded Tera templates

use rust_embed::Embed;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Tera, Value};
use thiserror::Error;

#[derive(Embed)]
#[folder = "templates/"]
struct EmbeddedTemplates;

const CLOUD_INIT_TEMPLATE: &str = "cloud-init.yaml.tera";

/// Directory on the node where provisioning scripts are written
pub const SCRIPT_DIR: &str = "/opt/edge-node";

/// A provisioning script embedded into the document
#[derive(Debug, Clone, Serialize)]
pub struct ScriptFile {
    pub name: String,
    pub content: String,
}

/// A user-supplied file from the embedded YAML block
#[derive(Debug, Clone, Serialize)]
pub struct ExtraFile {
    pub path: String,
    pub content: String,
    pub permissions: String,
}

/// Proxy environment entry
#[derive(Debug, Clone, Serialize)]
pub struct EnvEntry {
    pub name: String,
    pub value: String,
}

/// Context for the cloud-init template
#[derive(Debug, Clone, Serialize)]
pub struct CloudInitContext {
    pub cli_version: String,
    pub generated: String,
    pub scripts_source: String,
    pub script_dir: String,
    pub hostname: Option<String>,
    pub user_name: String,
    pub password_hash: String,
    pub ssh_key: Option<String>,
    pub host_type: String,
    pub proxy: Vec<EnvEntry>,
    pub ntp_servers: Vec<String>,
    pub packages: Vec<String>,
    pub runcmd: Vec<String>,
    pub write_files: Vec<ExtraFile>,
    pub scripts: Vec<ScriptFile>,
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Template rendering error: {0}")]
    RenderError(String),

    #[error("Rendered cloud-init is not valid YAML: {0}")]
    InvalidOutput(String),
}

/// Template generator using Tera
pub struct TemplateGenerator {
    tera: Tera,
}

impl TemplateGenerator {
    /// Create a new template generator with embedded templates
    pub fn new() -> Result<Self, TemplateError> {
        let mut tera = Tera::default();
        tera.register_filter("quote", quote_filter);
        tera.register_filter("indent_lines", indent_filter);

        for file in EmbeddedTemplates::iter() {
            let filename = file.as_ref();
            if let Some(content) = EmbeddedTemplates::get(filename) {
                if let Ok(template_str) = std::str::from_utf8(&content.data) {
                    tera.add_raw_template(filename, template_str)
                        .map_err(|e| TemplateError::RenderError(e.to_string()))?;
                }
            }
        }

        Ok(Self { tera })
    }

    /// Render the cloud-init document and check that it parses as YAML
    pub fn generate_cloud_init(&self, ctx: &CloudInitContext) -> Result<String, TemplateError> {
        if !self.tera.get_template_names().any(|n| n == CLOUD_INIT_TEMPLATE) {
            return Err(TemplateError::NotFound(CLOUD_INIT_TEMPLATE.to_string()));
        }

        let context = tera::Context::from_serialize(ctx)
            .map_err(|e| TemplateError::RenderError(e.to_string()))?;
        let rendered = self
            .tera
            .render(CLOUD_INIT_TEMPLATE, &context)
            .map_err(|e| TemplateError::RenderError(render_error_chain(&e)))?;

        let output = collapse_blank_lines(&rendered);
        serde_yml::from_str::<serde_yml::Value>(&output)
            .map_err(|e| TemplateError::InvalidOutput(e.to_string()))?;

        Ok(output)
    }
}

/// Render a value as a double-quoted YAML scalar
fn quote_filter(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    };
    serde_json::to_string(&text)
        .map(Value::String)
        .map_err(|e| tera::Error::msg(e.to_string()))
}

/// Indent every non-empty line by `width` spaces, dropping trailing newlines
fn indent_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let text = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("indent_lines expects a string"))?;
    let width = args.get("width").and_then(Value::as_u64).unwrap_or(4) as usize;
    let pad = " ".repeat(width);

    let indented: Vec<String> = text
        .trim_end_matches('\n')
        .lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", pad, line)
            }
        })
        .collect();
    Ok(Value::String(indented.join("\n")))
}

/// Template control lines leave blank lines behind; keep at most one in a row
fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_blank = false;
    let mut in_block = false;

    for line in text.lines() {
        let blank = line.trim().is_empty();
        // Blank lines inside `content: |` blocks belong to the file content
        if blank && previous_blank && !in_block {
            continue;
        }
        if !blank {
            in_block = line.trim_end().ends_with('|')
                || (in_block && line.starts_with("      "));
        }
        out.push_str(line);
        out.push('\n');
        previous_blank = blank;
    }
    out
}

fn render_error_chain(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(host_type: &str) -> CloudInitContext {
        CloudInitContext {
            cli_version: "0.0.0".to_string(),
            generated: "2026-01-01T00:00:00Z".to_string(),
            scripts_source: "local".to_string(),
            script_dir: SCRIPT_DIR.to_string(),
            hostname: Some("edge-01".to_string()),
            user_name: "edge".to_string(),
            password_hash: "$6$salt$hash".to_string(),
            ssh_key: Some("ssh-ed25519 AAAAC3Nza user@host".to_string()),
            host_type: host_type.to_string(),
            proxy: vec![EnvEntry {
                name: "HTTP_PROXY".to_string(),
                value: "http://proxy:911".to_string(),
            }],
            ntp_servers: vec!["ntp1.example.com".to_string()],
            packages: vec!["jq".to_string()],
            runcmd: vec!["echo done".to_string()],
            write_files: vec![ExtraFile {
                path: "/etc/motd".to_string(),
                content: "welcome\n\nto the edge\n".to_string(),
                permissions: "0644".to_string(),
            }],
            scripts: vec![
                ScriptFile {
                    name: "bootstrap.sh".to_string(),
                    content: "#!/bin/bash\nset -e\n\necho bootstrap\n".to_string(),
                },
                ScriptFile {
                    name: "collect-logs.sh".to_string(),
                    content: "#!/bin/bash\ntar czf /tmp/logs.tgz /var/log\n".to_string(),
                },
            ],
        }
    }

    #[test]
    fn test_cloud_init_renders_valid_yaml() {
        let generator = TemplateGenerator::new().unwrap();
        let output = generator.generate_cloud_init(&context("kubernetes")).unwrap();

        assert!(output.starts_with("#cloud-config\n"));
        let doc: serde_yml::Value = serde_yml::from_str(&output).unwrap();

        assert_eq!(doc["hostname"].as_str(), Some("edge-01"));
        assert_eq!(doc["users"][0]["name"].as_str(), Some("edge"));
        assert_eq!(doc["users"][0]["passwd"].as_str(), Some("$6$salt$hash"));
        assert_eq!(doc["ntp"]["servers"][0].as_str(), Some("ntp1.example.com"));

        let files = doc["write_files"].as_sequence().unwrap();
        let bootstrap = files
            .iter()
            .find(|f| f["path"].as_str() == Some("/opt/edge-node/bootstrap.sh"))
            .unwrap();
        assert_eq!(
            bootstrap["content"].as_str(),
            Some("#!/bin/bash\nset -e\n\necho bootstrap\n")
        );
        let motd = files
            .iter()
            .find(|f| f["path"].as_str() == Some("/etc/motd"))
            .unwrap();
        assert_eq!(motd["content"].as_str(), Some("welcome\n\nto the edge\n"));

        let runcmd = doc["runcmd"].as_sequence().unwrap();
        assert_eq!(runcmd.len(), 3);
        assert_eq!(runcmd[2].as_str(), Some("echo done"));
    }

    #[test]
    fn test_container_host_skips_k3s() {
        let generator = TemplateGenerator::new().unwrap();
        let output = generator.generate_cloud_init(&context("container")).unwrap();
        assert!(!output.contains("k3s-configure.sh"));
        let doc: serde_yml::Value = serde_yml::from_str(&output).unwrap();
        assert_eq!(doc["runcmd"].as_sequence().unwrap().len(), 2);
    }

    #[test]
    fn test_optional_sections_omitted() {
        let mut ctx = context("container");
        ctx.hostname = None;
        ctx.ssh_key = None;
        ctx.proxy.clear();
        ctx.ntp_servers.clear();
        ctx.packages.clear();

        let output = TemplateGenerator::new()
            .unwrap()
            .generate_cloud_init(&ctx)
            .unwrap();
        assert!(!output.contains("hostname:"));
        assert!(!output.contains("ssh_authorized_keys"));
        assert!(!output.contains("ntp:"));
        assert!(!output.contains("/etc/environment"));
    }

    #[test]
    fn test_quote_filter_escapes() {
        let quoted = quote_filter(&Value::String("a \"b\"".to_string()), &HashMap::new()).unwrap();
        assert_eq!(quoted, Value::String("\"a \\\"b\\\"\"".to_string()));
    }

    #[test]
    fn test_indent_filter() {
        let mut args = HashMap::new();
        args.insert("width".to_string(), Value::from(2));
        let out = indent_filter(&Value::String("a\n\nb\n".to_string()), &args).unwrap();
        assert_eq!(out, Value::String("  a\n\n  b".to_string()));
    }
}
