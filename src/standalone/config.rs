//! Standalone node config file
//!
//! ```text
//! USER_NAME=edge
//! USER_PASSWORD="s3cret"
//! HOST_TYPE=kubernetes
//! ---
//! packages:
//!   - jq
//! ```
//!
//! Everything above the `---` line is dotenv; everything below is a YAML block
//! merged into the generated cloud-init.

use miette::{NamedSource, SourceSpan};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::core::validate;
use crate::standalone::StandaloneError;

/// What the node runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostType {
    #[default]
    Kubernetes,
    Container,
}

impl FromStr for HostType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "kubernetes" => Ok(HostType::Kubernetes),
            "container" => Ok(HostType::Container),
            other => Err(format!("'{}' is not kubernetes or container", other)),
        }
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostType::Kubernetes => write!(f, "kubernetes"),
            HostType::Container => write!(f, "container"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Password {
    Plain(String),
    /// Already a crypt(3) hash
    Hash(String),
}

/// A file from the YAML block's `write_files`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WriteFile {
    pub path: String,
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_permissions")]
    pub permissions: String,
}

fn default_permissions() -> String {
    "0644".to_string()
}

/// The YAML block below `---`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtraCloudInit {
    #[serde(default)]
    pub packages: Vec<String>,
    #[serde(default)]
    pub runcmd: Vec<String>,
    #[serde(default)]
    pub write_files: Vec<WriteFile>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandaloneConfig {
    pub user_name: String,
    pub password: Password,
    pub host_type: HostType,
    pub ssh_key: Option<String>,
    pub hostname: Option<String>,
    pub http_proxy: Option<String>,
    pub https_proxy: Option<String>,
    pub no_proxy: Option<String>,
    pub ntp_servers: Vec<String>,
    pub extra: ExtraCloudInit,
}

/// Strip one level of matching quotes, or a trailing ` #` comment when unquoted
fn unquote(raw: &str) -> String {
    let raw = raw.trim();
    for quote in ['"', '\''] {
        if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
            return raw[1..raw.len() - 1].to_string();
        }
    }
    match raw.find(" #") {
        Some(idx) => raw[..idx].trim_end().to_string(),
        None => raw.to_string(),
    }
}

fn syntax_error(content: &str, filename: &str, offset: usize, len: usize, message: String) -> StandaloneError {
    StandaloneError::Syntax {
        message,
        src: NamedSource::new(filename, content.to_string()),
        span: SourceSpan::from((offset, len)),
    }
}

/// Parse the dotenv half into key/value pairs, plus the raw YAML half if any
pub fn parse_dotenv(
    content: &str,
    filename: &str,
) -> Result<(BTreeMap<String, String>, Option<String>), StandaloneError> {
    let mut vars = BTreeMap::new();
    let mut offset = 0usize;
    let mut lines = content.split_inclusive('\n');

    for line in lines.by_ref() {
        let line_start = offset;
        offset += line.len();
        let text = line.trim_end_matches(['\r', '\n']);
        let trimmed = text.trim();

        if trimmed == "---" {
            let rest = &content[offset..];
            return Ok((vars, Some(rest.to_string())));
        }
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let assignment = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        let Some((key, value)) = assignment.split_once('=') else {
            let lead = text.len() - text.trim_start().len();
            return Err(syntax_error(
                content,
                filename,
                line_start + lead,
                trimmed.len().max(1),
                "expected KEY=VALUE".to_string(),
            ));
        };
        let key = key.trim();
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            let lead = text.len() - text.trim_start().len();
            return Err(syntax_error(
                content,
                filename,
                line_start + lead,
                trimmed.len().max(1),
                format!("'{}' is not a valid variable name", key),
            ));
        }
        vars.insert(key.to_string(), unquote(value));
    }

    Ok((vars, None))
}

fn non_empty(vars: &BTreeMap<String, String>, key: &str) -> Option<String> {
    vars.get(key).filter(|v| !v.is_empty()).cloned()
}

impl StandaloneConfig {
    pub fn parse(content: &str, filename: &str) -> Result<Self, StandaloneError> {
        let (vars, yaml) = parse_dotenv(content, filename)?;

        let user_name = non_empty(&vars, "USER_NAME").ok_or(StandaloneError::Missing("USER_NAME"))?;
        validate::user_name("user", &user_name)?;

        let password = match (non_empty(&vars, "USER_PASSWORD_HASH"), non_empty(&vars, "USER_PASSWORD")) {
            (Some(hash), _) => Password::Hash(hash),
            (None, Some(plain)) => Password::Plain(plain),
            (None, None) => return Err(StandaloneError::Missing("USER_PASSWORD or USER_PASSWORD_HASH")),
        };

        let host_type = match non_empty(&vars, "HOST_TYPE") {
            Some(value) => value.parse().map_err(|message| StandaloneError::Invalid {
                key: "HOST_TYPE",
                message,
            })?,
            None => HostType::default(),
        };

        let ssh_key = non_empty(&vars, "SSH_KEY");
        if let Some(key) = &ssh_key {
            validate::ssh_public_key(key)?;
        }

        let ntp_servers = non_empty(&vars, "NTP_SERVERS")
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let extra = match yaml.as_deref().map(str::trim) {
            Some(block) if !block.is_empty() => serde_yml::from_str(block).map_err(|e| {
                StandaloneError::Invalid {
                    key: "embedded YAML",
                    message: e.to_string(),
                }
            })?,
            _ => ExtraCloudInit::default(),
        };

        Ok(Self {
            user_name,
            password,
            host_type,
            ssh_key,
            hostname: non_empty(&vars, "HOSTNAME"),
            http_proxy: non_empty(&vars, "HTTP_PROXY"),
            https_proxy: non_empty(&vars, "HTTPS_PROXY"),
            no_proxy: non_empty(&vars, "NO_PROXY"),
            ntp_servers,
            extra,
        })
    }
}
