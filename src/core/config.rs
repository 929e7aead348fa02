//! Persistent CLI configuration
//!
//! A single YAML file holds the API endpoint, the default project, the session
//! tokens and the orchestrator feature flags. It is read once per invocation and
//! written only by login, logout, token refresh and `config set/unset`.

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::features::{Feature, OrchestratorInfo};

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "ORCH_CLI_CONFIG";

/// Default OAuth client used for the password grant
pub const DEFAULT_CLIENT_ID: &str = "system-client";

/// Default Keycloak realm
pub const DEFAULT_REALM: &str = "master";

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("could not determine a configuration directory for this platform")]
    #[diagnostic(
        code(orch::config::no_dir),
        help("set ORCH_CLI_CONFIG to the path of a config file")
    )]
    NoConfigDir,

    #[error("failed to read config {path}: {source}")]
    #[diagnostic(code(orch::config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    #[diagnostic(
        code(orch::config::parse),
        help("fix or delete the file; `orch-cli login` recreates it")
    )]
    Parse { path: PathBuf, message: String },

    #[error("no API endpoint configured")]
    #[diagnostic(
        code(orch::config::missing_endpoint),
        help("pass --api-endpoint, set ORCH_API_ENDPOINT, or run `orch-cli config set api-endpoint <url>`")
    )]
    MissingEndpoint,

    #[error("unknown config key '{0}'")]
    #[diagnostic(
        code(orch::config::unknown_key),
        help("settable keys are: api-endpoint, project, keycloak-endpoint, client-id, realm")
    )]
    UnknownKey(String),
}

/// Settable configuration keys
pub const SETTABLE_KEYS: &[&str] = &[
    "api-endpoint",
    "project",
    "keycloak-endpoint",
    "client-id",
    "realm",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keycloak_endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_expiry: Option<DateTime<Utc>>,

    #[serde(default)]
    pub orchestrator: OrchestratorInfo,

    /// Where this config was loaded from
    #[serde(skip)]
    pub(crate) path: PathBuf,
}

impl Config {
    /// Resolve the config file location
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if !path.is_empty() {
                return Ok(PathBuf::from(path));
            }
        }

        ProjectDirs::from("", "", "orch-cli")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load the config from its default location
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path()?)
    }

    /// Load a config file; a missing file yields an empty config
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            if content.trim().is_empty() {
                Config::default()
            } else {
                serde_yml::from_str(&content).map_err(|e| ConfigError::Parse {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?
            }
        } else {
            Config::default()
        };
        config.path = path.to_path_buf();
        Ok(config)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the config back to the file it was loaded from
    pub fn save(&self) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let content = serde_yml::to_string(self).map_err(|e| ConfigError::Parse {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        fs::write(&self.path, content).map_err(io_err)?;

        // Tokens live here, keep the file private
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600)).map_err(io_err)?;
        }

        Ok(())
    }

    /// Effective API endpoint: explicit flag first, then config
    pub fn resolve_endpoint(&self, flag: Option<&str>) -> Result<String, ConfigError> {
        flag.map(String::from)
            .or_else(|| self.api_endpoint.clone())
            .filter(|e| !e.trim().is_empty())
            .map(|e| e.trim_end_matches('/').to_string())
            .ok_or(ConfigError::MissingEndpoint)
    }

    pub fn client_id(&self) -> &str {
        self.client_id.as_deref().unwrap_or(DEFAULT_CLIENT_ID)
    }

    pub fn realm(&self) -> &str {
        self.realm.as_deref().unwrap_or(DEFAULT_REALM)
    }

    pub fn is_logged_in(&self) -> bool {
        self.refresh_token.is_some()
    }

    pub fn feature_enabled(&self, feature: Feature) -> bool {
        self.orchestrator.is_enabled(feature)
    }

    /// Drop the session; endpoint and project stay
    pub fn clear_session(&mut self) {
        self.username = None;
        self.refresh_token = None;
        self.access_token = None;
        self.access_token_expiry = None;
        self.orchestrator = OrchestratorInfo::default();
    }

    /// Set one of the [`SETTABLE_KEYS`]
    pub fn set(&mut self, key: &str, value: Option<String>) -> Result<(), ConfigError> {
        let value = value.filter(|v| !v.is_empty());
        match key {
            "api-endpoint" => self.api_endpoint = value,
            "project" => self.project = value,
            "keycloak-endpoint" => self.keycloak_endpoint = value,
            "client-id" => self.client_id = value,
            "realm" => self.realm = value,
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<&str>, ConfigError> {
        let value = match key {
            "api-endpoint" => self.api_endpoint.as_deref(),
            "project" => self.project.as_deref(),
            "keycloak-endpoint" => self.keycloak_endpoint.as_deref(),
            "client-id" => self.client_id.as_deref(),
            "realm" => self.realm.as_deref(),
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        };
        Ok(value)
    }
}
