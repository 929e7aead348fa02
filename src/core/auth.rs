//! Keycloak session handling
//!
//! Login performs an OAuth2 password grant; every later authenticated command
//! reuses the stored access token until it expires and then trades the refresh
//! token for a new one.

use chrono::{DateTime, Duration, Utc};
use miette::Diagnostic;
use reqwest::Method;
use serde::Deserialize;
use thiserror::Error;

use crate::core::client::{ApiRequest, ApiResponse, HttpTransport, Transport};
use crate::core::config::{Config, ConfigError};
use crate::core::error::{extract_message, ApiError};

/// Tokens this close to expiry are refreshed eagerly
const EXPIRY_SKEW_SECS: i64 = 30;

#[derive(Debug, Error, Diagnostic)]
pub enum AuthError {
    #[error("not logged in")]
    #[diagnostic(
        code(orch::auth::not_logged_in),
        help("run `orch-cli login <username>` first, or pass --noauth for unauthenticated endpoints")
    )]
    NotLoggedIn,

    #[error("keycloak rejected the request ({status}): {message}")]
    #[diagnostic(
        code(orch::auth::rejected),
        help("check your username, password and client id; an expired session needs a new `orch-cli login`")
    )]
    Rejected { status: u16, message: String },

    #[error("could not reach keycloak at {url}: {message}")]
    #[diagnostic(code(orch::auth::transport))]
    Transport { url: String, message: String },

    #[error("invalid token response: {0}")]
    #[diagnostic(code(orch::auth::decode))]
    Decode(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

/// Token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl TokenResponse {
    pub fn expiry(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.expires_in.map(|secs| now + Duration::seconds(secs))
    }

    /// Store the tokens into the config
    pub fn apply(&self, config: &mut Config, now: DateTime<Utc>) {
        config.access_token = Some(self.access_token.clone());
        config.access_token_expiry = self.expiry(now);
        if let Some(refresh) = &self.refresh_token {
            config.refresh_token = Some(refresh.clone());
        }
    }
}

/// Derive the Keycloak endpoint from the API endpoint
///
/// `https://api.orch.example.com` becomes `https://keycloak.orch.example.com`.
/// Endpoints that do not start with an `api.` host label are used unchanged.
pub fn default_keycloak_endpoint(api_endpoint: &str) -> String {
    let trimmed = api_endpoint.trim_end_matches('/');
    let (scheme, rest) = match trimmed.split_once("://") {
        Some((scheme, rest)) => (Some(scheme), rest),
        None => (None, trimmed),
    };

    let rest = match rest.strip_prefix("api.") {
        Some(host) => format!("keycloak.{}", host),
        None => rest.to_string(),
    };

    match scheme {
        Some(scheme) => format!("{}://{}", scheme, rest),
        None => rest,
    }
}

/// Whether the stored access token must be refreshed before use
pub fn needs_refresh(config: &Config, now: DateTime<Utc>) -> bool {
    match (&config.access_token, config.access_token_expiry) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(_), Some(expiry)) => expiry - Duration::seconds(EXPIRY_SKEW_SECS) <= now,
    }
}

/// Minimal Keycloak OIDC client
///
/// Requests are form posts carried by a [`Transport`] rooted at the Keycloak endpoint.
pub struct KeycloakClient {
    transport: Box<dyn Transport>,
    endpoint: String,
    realm_path: String,
}

impl KeycloakClient {
    pub fn new(transport: Box<dyn Transport>, keycloak_endpoint: &str, realm: &str) -> Self {
        Self {
            transport,
            endpoint: keycloak_endpoint.trim_end_matches('/').to_string(),
            realm_path: format!("/realms/{}/protocol/openid-connect", realm),
        }
    }

    /// HTTP client for a Keycloak endpoint
    pub fn connect(
        keycloak_endpoint: &str,
        realm: &str,
        debug_headers: bool,
    ) -> Result<Self, AuthError> {
        let transport = HttpTransport::new(keycloak_endpoint, None, debug_headers).map_err(|e| {
            AuthError::Transport {
                url: keycloak_endpoint.to_string(),
                message: e.to_string(),
            }
        })?;
        Ok(Self::new(Box::new(transport), keycloak_endpoint, realm))
    }

    /// Resolve the Keycloak client for a config, deriving the endpoint when unset
    pub fn for_config(
        config: &Config,
        api_endpoint: &str,
        debug_headers: bool,
    ) -> Result<Self, AuthError> {
        let endpoint = config
            .keycloak_endpoint
            .clone()
            .unwrap_or_else(|| default_keycloak_endpoint(api_endpoint));
        Self::connect(&endpoint, config.realm(), debug_headers)
    }

    pub fn token_url(&self) -> String {
        format!("{}{}/token", self.endpoint, self.realm_path)
    }

    pub fn password_grant(
        &self,
        client_id: &str,
        username: &str,
        password: &str,
    ) -> Result<TokenResponse, AuthError> {
        self.token_request(&[
            ("grant_type", "password"),
            ("client_id", client_id),
            ("username", username),
            ("password", password),
            ("scope", "openid"),
        ])
    }

    pub fn refresh(&self, client_id: &str, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("client_id", client_id),
            ("refresh_token", refresh_token),
        ])
    }

    /// End the Keycloak session bound to a refresh token
    pub fn logout(&self, client_id: &str, refresh_token: &str) -> Result<(), AuthError> {
        let response = self.post_form(
            "logout",
            &[("client_id", client_id), ("refresh_token", refresh_token)],
        )?;
        if !(200..300).contains(&response.status) {
            return Err(AuthError::Rejected {
                status: response.status,
                message: extract_message(&response.body)
                    .unwrap_or_else(|| "logout failed".to_string()),
            });
        }
        Ok(())
    }

    fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        let response = self.post_form("token", form)?;
        if !(200..300).contains(&response.status) {
            return Err(AuthError::Rejected {
                status: response.status,
                message: keycloak_error(&response.body),
            });
        }

        serde_json::from_str(&response.body).map_err(|e| AuthError::Decode(e.to_string()))
    }

    fn post_form(&self, action: &str, form: &[(&str, &str)]) -> Result<ApiResponse, AuthError> {
        let request =
            ApiRequest::new(Method::POST, format!("{}/{}", self.realm_path, action)).with_form(form);
        tracing::debug!("keycloak {} at {}", action, self.endpoint);
        self.transport.send(&request).map_err(|e| match e {
            ApiError::Transport { url, message } => AuthError::Transport { url, message },
            other => AuthError::Transport {
                url: self.endpoint.clone(),
                message: other.to_string(),
            },
        })
    }
}

/// Keycloak reports `{"error": "...", "error_description": "..."}`
fn keycloak_error(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error_description")
                .and_then(|d| d.as_str())
                .map(String::from)
        })
        .or_else(|| extract_message(body))
        .unwrap_or_else(|| "authentication failed".to_string())
}

/// Return a usable access token, refreshing and persisting it when needed
pub fn access_token(config: &mut Config, keycloak: &KeycloakClient) -> Result<String, AuthError> {
    let now = Utc::now();
    if !needs_refresh(config, now) {
        if let Some(token) = &config.access_token {
            return Ok(token.clone());
        }
    }

    let refresh_token = config.refresh_token.clone().ok_or(AuthError::NotLoggedIn)?;
    let tokens = keycloak.refresh(config.client_id(), &refresh_token)?;

    tracing::info!("refreshed access token for {}", config.username.as_deref().unwrap_or("user"));
    tokens.apply(config, now);
    config.save()?;

    Ok(tokens.access_token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::testing::MockTransport;
    use serde_json::{json, Value};

    #[test]
    fn test_default_keycloak_endpoint() {
        assert_eq!(
            default_keycloak_endpoint("https://api.orch.example.com/"),
            "https://keycloak.orch.example.com"
        );
        assert_eq!(
            default_keycloak_endpoint("http://localhost:8080"),
            "http://localhost:8080"
        );
        assert_eq!(
            default_keycloak_endpoint("api.kind.internal"),
            "keycloak.kind.internal"
        );
    }

    #[test]
    fn test_needs_refresh() {
        let now = Utc::now();
        let mut config = Config::default();
        assert!(needs_refresh(&config, now));

        config.access_token = Some("at".to_string());
        assert!(!needs_refresh(&config, now));

        config.access_token_expiry = Some(now + Duration::minutes(5));
        assert!(!needs_refresh(&config, now));

        config.access_token_expiry = Some(now + Duration::seconds(10));
        assert!(needs_refresh(&config, now));

        config.access_token_expiry = Some(now - Duration::minutes(1));
        assert!(needs_refresh(&config, now));
    }

    #[test]
    fn test_token_response_apply_keeps_old_refresh_token() {
        let now = Utc::now();
        let mut config = Config {
            refresh_token: Some("old".to_string()),
            ..Default::default()
        };
        let tokens: TokenResponse =
            serde_json::from_str(r#"{"access_token":"at","expires_in":300}"#).unwrap();
        tokens.apply(&mut config, now);

        assert_eq!(config.access_token.as_deref(), Some("at"));
        assert_eq!(config.refresh_token.as_deref(), Some("old"));
        assert_eq!(config.access_token_expiry, Some(now + Duration::seconds(300)));
    }

    fn keycloak(mock: &MockTransport) -> KeycloakClient {
        KeycloakClient::new(Box::new(mock.clone()), "https://keycloak.example", "master")
    }

    fn expired_session(dir: &tempfile::TempDir) -> Config {
        let mut config = Config::load_from(&dir.path().join("config.yaml")).unwrap();
        config.username = Some("alice".to_string());
        config.refresh_token = Some("rt-old".to_string());
        config.access_token = Some("at-old".to_string());
        config.access_token_expiry = Some(Utc::now() - Duration::hours(1));
        config
    }

    #[test]
    fn test_access_token_requires_login() {
        let mock = MockTransport::new();
        let mut config = Config::default();
        let err = access_token(&mut config, &keycloak(&mock)).unwrap_err();
        assert!(matches!(err, AuthError::NotLoggedIn));
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn test_access_token_reuses_valid_token() {
        let mock = MockTransport::new();
        let mut config = Config {
            access_token: Some("cached".to_string()),
            access_token_expiry: Some(Utc::now() + Duration::hours(1)),
            ..Default::default()
        };
        assert_eq!(access_token(&mut config, &keycloak(&mock)).unwrap(), "cached");
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn test_access_token_refreshes_and_persists() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut config = expired_session(&tmp);
        let mock = MockTransport::new();
        mock.respond(
            200,
            json!({"access_token": "at-new", "refresh_token": "rt-new", "expires_in": 300}),
        );

        let token = access_token(&mut config, &keycloak(&mock)).unwrap();
        assert_eq!(token, "at-new");

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(requests[0].path, "/realms/master/protocol/openid-connect/token");
        assert_eq!(requests[0].form_param("grant_type"), Some("refresh_token"));
        assert_eq!(requests[0].form_param("refresh_token"), Some("rt-old"));
        assert_eq!(requests[0].form_param("client_id"), Some(config.client_id()));
        assert!(requests[0].body.is_none());

        let saved = Config::load_from(config.path()).unwrap();
        assert_eq!(saved.access_token.as_deref(), Some("at-new"));
        assert_eq!(saved.refresh_token.as_deref(), Some("rt-new"));
        assert!(saved.access_token_expiry.unwrap() > Utc::now());
    }

    #[test]
    fn test_rejected_refresh_leaves_config_untouched() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut config = expired_session(&tmp);
        let mock = MockTransport::new();
        mock.respond(
            400,
            json!({"error": "invalid_grant", "error_description": "Token is not active"}),
        );

        let err = access_token(&mut config, &keycloak(&mock)).unwrap_err();
        match err {
            AuthError::Rejected { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Token is not active");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(config.access_token.as_deref(), Some("at-old"));
        assert!(!config.path().exists());
    }

    #[test]
    fn test_password_grant_form() {
        let mock = MockTransport::new();
        mock.respond(200, json!({"access_token": "at", "refresh_token": "rt"}));

        let tokens = keycloak(&mock)
            .password_grant("system-client", "alice", "s3cret")
            .unwrap();
        assert_eq!(tokens.access_token, "at");
        assert_eq!(tokens.expires_in, None);

        let request = &mock.requests()[0];
        assert_eq!(request.path, "/realms/master/protocol/openid-connect/token");
        assert_eq!(request.form_param("grant_type"), Some("password"));
        assert_eq!(request.form_param("client_id"), Some("system-client"));
        assert_eq!(request.form_param("username"), Some("alice"));
        assert_eq!(request.form_param("password"), Some("s3cret"));
        assert_eq!(request.form_param("scope"), Some("openid"));
    }

    #[test]
    fn test_token_response_without_access_token() {
        let mock = MockTransport::new();
        mock.respond(200, json!({"token_type": "Bearer"}));
        let err = keycloak(&mock).password_grant("c", "u", "p").unwrap_err();
        assert!(matches!(err, AuthError::Decode(_)));
    }

    #[test]
    fn test_logout_posts_refresh_token() {
        let mock = MockTransport::new();
        mock.respond(204, Value::Null).respond(500, json!({"message": "boom"}));
        let client = keycloak(&mock);

        client.logout("system-client", "rt").unwrap();
        let request = &mock.requests()[0];
        assert_eq!(request.path, "/realms/master/protocol/openid-connect/logout");
        assert_eq!(request.form_param("refresh_token"), Some("rt"));

        let err = client.logout("system-client", "rt").unwrap_err();
        assert!(matches!(err, AuthError::Rejected { status: 500, .. }));
    }

    #[test]
    fn test_unreachable_keycloak_is_transport_error() {
        // Nothing queued: the mock fails like a refused connection
        let err = keycloak(&MockTransport::new())
            .refresh("system-client", "rt")
            .unwrap_err();
        assert!(matches!(err, AuthError::Transport { .. }));
    }

    #[test]
    fn test_keycloak_error_description() {
        assert_eq!(
            keycloak_error(r#"{"error":"invalid_grant","error_description":"Invalid user credentials"}"#),
            "Invalid user credentials"
        );
        assert_eq!(keycloak_error(""), "authentication failed");
    }

    #[test]
    fn test_token_url() {
        let client =
            KeycloakClient::new(Box::new(MockTransport::new()), "https://keycloak.example/", "master");
        assert_eq!(
            client.token_url(),
            "https://keycloak.example/realms/master/protocol/openid-connect/token"
        );
    }
}
