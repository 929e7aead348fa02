//! `orch-cli login` / `logout` / `get features`

use chrono::Utc;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::io::Write;

use crate::cli::context::Context;
use crate::cli::helpers::prompt_password;
use crate::cli::output::{print_success, write_structured};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::features::INFO_PATH;
use crate::core::{
    ApiClient, ApiError, Config, Feature, HttpTransport, KeycloakClient, OrchestratorInfo,
};

#[derive(clap::Args, Debug)]
pub struct LoginArgs {
    /// Keycloak user name
    pub username: String,

    /// Password (prompted for when omitted)
    pub password: Option<String>,

    /// Keycloak endpoint (derived from the API endpoint by default)
    #[arg(long)]
    pub keycloak: Option<String>,

    /// OAuth2 client ID
    #[arg(long)]
    pub client_id: Option<String>,

    /// Keycloak realm
    #[arg(long)]
    pub realm: Option<String>,
}

/// Fetch feature flags; an unreachable info endpoint leaves every feature enabled
pub fn fetch_orchestrator_info(client: &ApiClient) -> OrchestratorInfo {
    match client.get(INFO_PATH, "orchestrator info") {
        Ok(value) => OrchestratorInfo::from_response(&value),
        Err(e) => {
            tracing::warn!("could not read orchestrator feature flags: {}", e);
            OrchestratorInfo::default()
        }
    }
}

pub fn login(
    args: LoginArgs,
    global: &GlobalOpts,
    config: &mut Config,
    out: &mut dyn Write,
) -> Result<()> {
    let endpoint = config.resolve_endpoint(global.api_endpoint.as_deref())?;

    if args.keycloak.is_some() {
        config.keycloak_endpoint = args.keycloak;
    }
    if args.client_id.is_some() {
        config.client_id = args.client_id;
    }
    if args.realm.is_some() {
        config.realm = args.realm;
    }

    let password = match args.password {
        Some(p) => p,
        None => prompt_password("Password")?,
    };

    let keycloak = KeycloakClient::for_config(config, &endpoint, global.debug_headers)?;
    let debug_headers = global.debug_headers;
    start_session(config, &endpoint, &args.username, &password, &keycloak, |token| {
        let transport = HttpTransport::new(&endpoint, Some(token.to_string()), debug_headers)?;
        Ok(ApiClient::new(Box::new(transport)))
    })?;

    print_success(
        out,
        format!("Logged in to {} as {}", style(&endpoint).cyan(), args.username),
    )
}

/// Password grant, feature discovery and persistence of a new session
///
/// `connect` builds the API client for the freshly issued access token.
fn start_session(
    config: &mut Config,
    endpoint: &str,
    username: &str,
    password: &str,
    keycloak: &KeycloakClient,
    connect: impl FnOnce(&str) -> Result<ApiClient, ApiError>,
) -> Result<()> {
    tracing::debug!("requesting token from {}", keycloak.token_url());
    let tokens = keycloak.password_grant(config.client_id(), username, password)?;

    config.clear_session();
    tokens.apply(config, Utc::now());
    config.username = Some(username.to_string());
    config.api_endpoint = Some(endpoint.to_string());

    let client = connect(&tokens.access_token)?;
    config.orchestrator = fetch_orchestrator_info(&client);
    config.save()?;
    Ok(())
}

pub fn logout(global: &GlobalOpts, config: &mut Config, out: &mut dyn Write) -> Result<()> {
    if config.refresh_token.is_none() {
        writeln!(out, "Not logged in.").into_diagnostic()?;
        return Ok(());
    }

    let keycloak = config
        .resolve_endpoint(global.api_endpoint.as_deref())
        .map_err(miette::Report::from)
        .and_then(|endpoint| {
            KeycloakClient::for_config(config, &endpoint, global.debug_headers)
                .map_err(miette::Report::from)
        });
    match keycloak {
        Ok(keycloak) => end_session(config, Some(&keycloak), out),
        Err(e) => {
            tracing::warn!("skipping keycloak logout: {}", e);
            end_session(config, None, out)
        }
    }
}

/// Revoke the refresh token and drop the local session
///
/// The local session is dropped even when Keycloak refuses or cannot be reached.
fn end_session(
    config: &mut Config,
    keycloak: Option<&KeycloakClient>,
    out: &mut dyn Write,
) -> Result<()> {
    if let (Some(keycloak), Some(refresh_token)) = (keycloak, config.refresh_token.as_deref()) {
        if let Err(e) = keycloak.logout(config.client_id(), refresh_token) {
            tracing::warn!("keycloak logout failed: {}", e);
        }
    }

    let username = config.username.clone().unwrap_or_default();
    config.clear_session();
    config.save()?;
    print_success(out, format!("Logged out {}", username).trim_end())
}

/// Live feature flags from the orchestrator
pub fn features(ctx: &Context, out: &mut dyn Write) -> Result<()> {
    let value = ctx.client.get(INFO_PATH, "orchestrator info")?;
    let info = OrchestratorInfo::from_response(&value);

    match ctx.format {
        OutputFormat::Table => print_features(&info, out),
        other => write_structured(out, other, &info),
    }
}

fn print_features(info: &OrchestratorInfo, out: &mut dyn Write) -> Result<()> {
    if let Some(version) = &info.version {
        writeln!(out, "Orchestrator version: {}", version).into_diagnostic()?;
    }
    let width = Feature::all().iter().map(|f| f.key().len()).max().unwrap_or(0);
    for feature in Feature::all() {
        let reported = info.features.contains_key(feature.key());
        let state = match (info.is_enabled(*feature), reported) {
            (true, true) => style("enabled").green().to_string(),
            (true, false) => style("enabled (not reported)").dim().to_string(),
            (false, _) => style("disabled").red().to_string(),
        };
        writeln!(out, "{:<width$}  {}", feature.key(), state, width = width).into_diagnostic()?;
    }
    // Components this CLI has no commands for
    for (name, installed) in &info.features {
        if !Feature::all().iter().any(|f| f.key() == name) {
            writeln!(out, "{:<width$}  {}", name, installed, width = width).into_diagnostic()?;
        }
    }
    Ok(())
}
