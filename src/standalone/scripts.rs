//! Provisioning scripts embedded into the standalone cloud-init

use reqwest::blocking::Client;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::standalone::config::HostType;
use crate::standalone::StandaloneError;

/// Git ref fetched when neither a ref nor a local directory is given
pub const DEFAULT_REF: &str = "main";

const RAW_BASE: &str = "https://raw.githubusercontent.com/open-edge-platform/edge-microvisor-toolkit-standalone-node";
const SCRIPTS_SUBDIR: &str = "standalone-node/provisioning_scripts";
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Scripts a host type needs, in the order they are written
pub fn script_names(host_type: HostType) -> &'static [&'static str] {
    match host_type {
        HostType::Kubernetes => &["bootstrap.sh", "collect-logs.sh", "k3s-configure.sh"],
        HostType::Container => &["bootstrap.sh", "collect-logs.sh"],
    }
}

/// Where scripts come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
    Remote { git_ref: String },
    Local(PathBuf),
}

impl ScriptSource {
    pub fn url(git_ref: &str, name: &str) -> String {
        format!("{}/{}/{}/{}", RAW_BASE, git_ref, SCRIPTS_SUBDIR, name)
    }

    /// Human-readable origin recorded in the generated file header
    pub fn describe(&self) -> String {
        match self {
            ScriptSource::Remote { git_ref } => format!("{}@{}", RAW_BASE, git_ref),
            ScriptSource::Local(dir) => dir.display().to_string(),
        }
    }

    /// Read every script for `host_type`
    pub fn fetch_all(&self, host_type: HostType) -> Result<Vec<(String, String)>, StandaloneError> {
        let names = script_names(host_type);
        match self {
            ScriptSource::Remote { git_ref } => {
                let client = Client::builder()
                    .timeout(FETCH_TIMEOUT)
                    .build()
                    .map_err(|e| StandaloneError::Fetch {
                        source_name: "HTTP client".to_string(),
                        message: e.to_string(),
                    })?;
                names
                    .iter()
                    .map(|name| {
                        let content = fetch_remote(&client, &Self::url(git_ref, name))?;
                        Ok((name.to_string(), content))
                    })
                    .collect()
            }
            ScriptSource::Local(dir) => names
                .iter()
                .map(|name| {
                    let path = dir.join(name);
                    let content = fs::read_to_string(&path).map_err(|e| StandaloneError::Fetch {
                        source_name: path.display().to_string(),
                        message: e.to_string(),
                    })?;
                    Ok((name.to_string(), content))
                })
                .collect(),
        }
    }
}

fn fetch_remote(client: &Client, url: &str) -> Result<String, StandaloneError> {
    tracing::debug!("fetching {}", url);
    let fail = |message: String| StandaloneError::Fetch {
        source_name: url.to_string(),
        message,
    };
    let response = client.get(url).send().map_err(|e| fail(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(fail(format!("HTTP {}", status)));
    }
    response.text().map_err(|e| fail(e.to_string()))
}
