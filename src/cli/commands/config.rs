//! `orch-cli config` - inspect and edit the stored configuration

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use serde_json::json;
use std::io::Write;

use crate::cli::helpers::truncate_str;
use crate::cli::output::{print_success, write_structured};
use crate::cli::OutputFormat;
use crate::core::config::SETTABLE_KEYS;
use crate::core::Config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the current configuration (tokens are abbreviated)
    Show,

    /// Print the location of the config file
    Path,

    /// Set a configuration value
    Set {
        /// One of: api-endpoint, project, keycloak-endpoint, client-id, realm
        key: String,
        value: String,
    },

    /// Remove a configuration value
    Unset { key: String },
}

pub fn run(cmd: ConfigCommands, format: OutputFormat, out: &mut dyn Write) -> Result<()> {
    let mut config = Config::load()?;
    match cmd {
        ConfigCommands::Show => show(&config, format, out),
        ConfigCommands::Path => writeln!(out, "{}", config.path().display()).into_diagnostic(),
        ConfigCommands::Set { key, value } => {
            config.set(&key, Some(value.clone()))?;
            config.save()?;
            print_success(out, format!("Set {} = {}", key, value))
        }
        ConfigCommands::Unset { key } => {
            config.set(&key, None)?;
            config.save()?;
            print_success(out, format!("Unset {}", key))
        }
    }
}

fn redact(token: Option<&str>) -> Option<String> {
    token.map(|t| truncate_str(t, 12))
}

fn show(config: &Config, format: OutputFormat, out: &mut dyn Write) -> Result<()> {
    let session = json!({
        "username": config.username,
        "refresh-token": redact(config.refresh_token.as_deref()),
        "access-token": redact(config.access_token.as_deref()),
        "access-token-expiry": config.access_token_expiry,
    });

    if format != OutputFormat::Table {
        let mut value = json!({});
        for key in SETTABLE_KEYS {
            value[*key] = json!(config.get(key)?);
        }
        value["session"] = session;
        value["orchestrator"] = json!(config.orchestrator);
        return write_structured(out, format, &value);
    }

    let width = SETTABLE_KEYS.iter().map(|k| k.len()).max().unwrap_or(0);
    for key in SETTABLE_KEYS {
        let value = match config.get(key)? {
            Some(v) => v.to_string(),
            None => style("(unset)").dim().to_string(),
        };
        writeln!(out, "{:<width$}  {}", key, value, width = width).into_diagnostic()?;
    }

    match &config.username {
        Some(user) if config.is_logged_in() => {
            writeln!(out, "\nLogged in as {}", style(user).cyan()).into_diagnostic()?;
            if let Some(expiry) = config.access_token_expiry {
                writeln!(out, "Access token expires {}", expiry.to_rfc3339()).into_diagnostic()?;
            }
        }
        _ => writeln!(out, "\nNot logged in.").into_diagnostic()?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::context::testing::output;

    #[test]
    fn test_show_abbreviates_tokens() {
        let config = Config {
            api_endpoint: Some("https://api.orch.example.com".to_string()),
            username: Some("admin".to_string()),
            refresh_token: Some("eyJhbGciOiJSUzI1NiIsInR5cCIgOiAiSldUIn0.secret".to_string()),
            ..Default::default()
        };

        let mut out = Vec::new();
        show(&config, OutputFormat::Yaml, &mut out).unwrap();
        let text = output(out);
        assert!(text.contains("api-endpoint: https://api.orch.example.com"));
        assert!(text.contains("eyJhbGciO..."));
        assert!(!text.contains("secret"));
    }

    #[test]
    fn test_show_table_when_logged_out() {
        let mut out = Vec::new();
        show(&Config::default(), OutputFormat::Table, &mut out).unwrap();
        let text = output(out);
        assert!(text.lines().any(|l| l.starts_with("project")));
        assert!(text.contains("Not logged in."));
    }
}
