//! Per-invocation state shared by API commands

use miette::{Diagnostic, Result};
use thiserror::Error;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::session::Connector;
use crate::core::{
    ApiClient, ApiError, Config, Feature, HttpTransport, KeycloakClient, OrchestratorInfo, SessionTransport,
    Transport,
};

#[derive(Debug, Error, Diagnostic)]
pub enum ContextError {
    #[error("the {0} feature is disabled on this orchestrator")]
    #[diagnostic(
        code(orch::feature_disabled),
        help("the orchestrator reported this component as not installed; log in again if it was enabled since")
    )]
    FeatureDisabled(Feature),

    #[error("no project selected")]
    #[diagnostic(
        code(orch::no_project),
        help("pass --project, set ORCH_PROJECT, or run `orch-cli config set project <name>`")
    )]
    MissingProject,
}

/// Everything a command handler needs to talk to the orchestrator
pub struct Context {
    pub client: ApiClient,
    pub format: OutputFormat,
    project: Option<String>,
    orchestrator: OrchestratorInfo,
}

impl Context {
    pub fn new(
        transport: Box<dyn Transport>,
        project: Option<String>,
        format: OutputFormat,
        orchestrator: OrchestratorInfo,
    ) -> Self {
        Self {
            client: ApiClient::new(transport),
            format,
            project,
            orchestrator,
        }
    }

    /// Build an HTTP-backed context from the global flags and stored config
    ///
    /// Unless `--noauth` is given requests carry the session's access token.
    /// The token is resolved, and refreshed when it has expired, on the first
    /// request so local argument errors are reported before any network call.
    pub fn from_global(global: &GlobalOpts, config: Config) -> Result<Self> {
        let endpoint = config.resolve_endpoint(global.api_endpoint.as_deref())?;
        let project = global
            .project
            .clone()
            .or_else(|| config.project.clone())
            .filter(|p| !p.is_empty());
        let orchestrator = config.orchestrator.clone();
        let debug_headers = global.debug_headers;

        let transport: Box<dyn Transport> = if global.noauth {
            Box::new(HttpTransport::new(&endpoint, None, debug_headers)?)
        } else {
            let keycloak = KeycloakClient::for_config(&config, &endpoint, debug_headers)?;
            let connect: Connector = Box::new(move |token: String| -> Result<_, ApiError> {
                let transport = HttpTransport::new(&endpoint, Some(token), debug_headers)?;
                Ok(Box::new(transport) as Box<dyn Transport>)
            });
            Box::new(SessionTransport::new(config, keycloak, connect))
        };

        Ok(Self::new(transport, project, global.output, orchestrator))
    }

    pub fn project(&self) -> Result<&str, ContextError> {
        self.project.as_deref().ok_or(ContextError::MissingProject)
    }

    /// Expand `{project}` in a path template
    pub fn path(&self, template: &str) -> Result<String, ContextError> {
        if template.contains("{project}") {
            Ok(template.replace("{project}", self.project()?))
        } else {
            Ok(template.to_string())
        }
    }

    pub fn feature_enabled(&self, feature: Feature) -> bool {
        self.orchestrator.is_enabled(feature)
    }

}
