//! Standalone edge node cloud-init generation
//!
//! Turns a dotenv-style node description into a `#cloud-config` document that
//! provisions a node without an orchestrator: user account, proxy and NTP
//! settings, plus the provisioning scripts written to disk and run at first boot.

pub mod config;
pub mod scripts;

use chrono::{DateTime, Utc};
use miette::{Diagnostic, NamedSource, SourceSpan};
use std::io::Write;
use std::process::{Command, Stdio};
use thiserror::Error;

use crate::core::validate::ValidationError;
use crate::schema::template::{
    CloudInitContext, EnvEntry, ExtraFile, ScriptFile, TemplateError, TemplateGenerator, SCRIPT_DIR,
};

pub use config::{HostType, Password, StandaloneConfig};
pub use scripts::{ScriptSource, DEFAULT_REF};

#[derive(Debug, Error, Diagnostic)]
pub enum StandaloneError {
    #[error("config syntax error: {message}")]
    #[diagnostic(code(orch::standalone::syntax))]
    Syntax {
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("{message}")]
        span: SourceSpan,
    },

    #[error("missing required setting {0}")]
    #[diagnostic(code(orch::standalone::missing))]
    Missing(&'static str),

    #[error("invalid {key}: {message}")]
    #[diagnostic(code(orch::standalone::invalid))]
    Invalid { key: &'static str, message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    #[error("cannot fetch {source_name}: {message}")]
    #[diagnostic(
        code(orch::standalone::fetch),
        help("check network access, or pass --scripts-dir with local copies")
    )]
    Fetch { source_name: String, message: String },

    #[error("password hashing failed: {0}")]
    #[diagnostic(
        code(orch::standalone::openssl),
        help("install openssl, or set USER_PASSWORD_HASH to a pre-computed SHA-512 crypt hash")
    )]
    Hash(String),

    #[error(transparent)]
    #[diagnostic(code(orch::standalone::template))]
    Template(#[from] TemplateError),
}

/// Hash a password with `openssl passwd -6 -stdin`
pub fn hash_password(plain: &str) -> Result<String, StandaloneError> {
    let mut child = Command::new("openssl")
        .args(["passwd", "-6", "-stdin"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| StandaloneError::Hash(e.to_string()))?;

    if let Some(mut stdin) = child.stdin.take() {
        writeln!(stdin, "{}", plain).map_err(|e| StandaloneError::Hash(e.to_string()))?;
    }
    let output = child
        .wait_with_output()
        .map_err(|e| StandaloneError::Hash(e.to_string()))?;
    if !output.status.success() {
        return Err(StandaloneError::Hash(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if !hash.starts_with("$6$") {
        return Err(StandaloneError::Hash(format!("unexpected output '{}'", hash)));
    }
    Ok(hash)
}

fn proxy_entries(config: &StandaloneConfig) -> Vec<EnvEntry> {
    [
        ("HTTP_PROXY", &config.http_proxy),
        ("HTTPS_PROXY", &config.https_proxy),
        ("NO_PROXY", &config.no_proxy),
    ]
    .into_iter()
    .filter_map(|(name, value)| {
        value.as_ref().map(|v| EnvEntry {
            name: name.to_string(),
            value: v.clone(),
        })
    })
    .collect()
}

/// Render the cloud-init document for a parsed config
///
/// `password_hash` is the crypt hash to install; callers hash plain passwords first.
pub fn render(
    config: &StandaloneConfig,
    password_hash: String,
    source: &ScriptSource,
    generated: DateTime<Utc>,
) -> Result<String, StandaloneError> {
    let scripts = source
        .fetch_all(config.host_type)?
        .into_iter()
        .map(|(name, content)| ScriptFile { name, content })
        .collect();

    let context = CloudInitContext {
        cli_version: env!("CARGO_PKG_VERSION").to_string(),
        generated: generated.to_rfc3339(),
        scripts_source: source.describe(),
        script_dir: SCRIPT_DIR.to_string(),
        hostname: config.hostname.clone(),
        user_name: config.user_name.clone(),
        password_hash,
        ssh_key: config.ssh_key.clone(),
        host_type: config.host_type.to_string(),
        proxy: proxy_entries(config),
        ntp_servers: config.ntp_servers.clone(),
        packages: config.extra.packages.clone(),
        runcmd: config.extra.runcmd.clone(),
        write_files: config
            .extra
            .write_files
            .iter()
            .map(|f| ExtraFile {
                path: f.path.clone(),
                content: f.content.clone(),
                permissions: f.permissions.clone(),
            })
            .collect(),
        scripts,
    };

    Ok(TemplateGenerator::new()?.generate_cloud_init(&context)?)
}

/// Parse, hash and render in one step
pub fn generate(
    content: &str,
    filename: &str,
    source: &ScriptSource,
    generated: DateTime<Utc>,
) -> Result<String, StandaloneError> {
    let config = StandaloneConfig::parse(content, filename)?;
    let hash = match &config.password {
        Password::Hash(hash) => hash.clone(),
        Password::Plain(plain) => hash_password(plain)?,
    };
    render(&config, hash, source, generated)
}
