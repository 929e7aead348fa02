//! API error types and HTTP status categorization

use miette::Diagnostic;
use serde_json::Value;
use thiserror::Error;

use crate::core::auth::AuthError;

/// Longest raw body snippet carried in an error message
const MAX_RAW_MESSAGE: usize = 200;

/// Errors returned by a backend REST call
#[derive(Debug, Error, Diagnostic)]
pub enum ApiError {
    #[error("not authorized ({status}): {message}")]
    #[diagnostic(
        code(orch::api::unauthorized),
        help("please login with `orch-cli login <username>`, or check that your user may access this project")
    )]
    Unauthorized { status: u16, message: String },

    #[error("{resource} not found: {message}")]
    #[diagnostic(code(orch::api::not_found))]
    NotFound { resource: String, message: String },

    #[error("request for {resource} failed with status {status}: {message}")]
    #[diagnostic(code(orch::api::status))]
    Status {
        resource: String,
        status: u16,
        message: String,
    },

    #[error("could not reach {url}: {message}")]
    #[diagnostic(
        code(orch::api::transport),
        help("check --api-endpoint and your network connection")
    )]
    Transport { url: String, message: String },

    #[error("invalid response for {resource}: {message}")]
    #[diagnostic(code(orch::api::decode))]
    Decode { resource: String, message: String },

    /// The session could not produce an access token for the request
    #[error(transparent)]
    #[diagnostic(transparent)]
    Auth(#[from] AuthError),
}

impl ApiError {
    /// Categorize a non-2xx response
    pub fn from_status(status: u16, body: &str, resource: &str) -> Self {
        let message = extract_message(body).unwrap_or_else(|| default_message(status));
        match status {
            401 | 403 => ApiError::Unauthorized { status, message },
            404 => ApiError::NotFound {
                resource: resource.to_string(),
                message,
            },
            _ => ApiError::Status {
                resource: resource.to_string(),
                status,
                message,
            },
        }
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { status, .. } | ApiError::Status { status, .. } => Some(*status),
            ApiError::NotFound { .. } => Some(404),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }
}

/// Pull a human message out of an error body
///
/// Understands plain `{"message": ...}`, gRPC-gateway `{"code", "message", "details"}`,
/// and `{"error": "..."}` / `{"error": {"message": ...}}` shapes. Falls back to the
/// trimmed raw body for non-JSON responses.
pub fn extract_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(json) => message_from_json(&json),
        Err(_) => Some(truncate(trimmed)),
    }
}

fn message_from_json(json: &Value) -> Option<String> {
    if let Some(msg) = json.get("message").and_then(Value::as_str) {
        if !msg.is_empty() {
            return Some(msg.to_string());
        }
    }

    match json.get("error") {
        Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
        Some(obj @ Value::Object(_)) => {
            if let Some(msg) = obj.get("message").and_then(Value::as_str) {
                return Some(msg.to_string());
            }
        }
        _ => {}
    }

    // grpc-gateway details sometimes carry the only useful text
    json.get("details")
        .and_then(Value::as_array)
        .and_then(|details| {
            details
                .iter()
                .find_map(|d| d.get("message").and_then(Value::as_str))
        })
        .map(String::from)
}

fn default_message(status: u16) -> String {
    match status {
        400 => "bad request".to_string(),
        401 => "unauthenticated".to_string(),
        403 => "forbidden".to_string(),
        404 => "not found".to_string(),
        409 => "conflict".to_string(),
        500 => "internal server error".to_string(),
        503 => "service unavailable".to_string(),
        other => format!("HTTP {}", other),
    }
}

fn truncate(s: &str) -> String {
    if s.chars().count() <= MAX_RAW_MESSAGE {
        s.to_string()
    } else {
        let cut: String = s.chars().take(MAX_RAW_MESSAGE).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_statuses() {
        for status in [401, 403] {
            let err = ApiError::from_status(status, "", "host");
            assert!(matches!(err, ApiError::Unauthorized { .. }));
            assert_eq!(err.status(), Some(status));
        }
    }

    #[test]
    fn test_not_found_uses_body_message() {
        let err = ApiError::from_status(404, r#"{"message":"region region-1 missing"}"#, "region");
        match err {
            ApiError::NotFound { resource, message } => {
                assert_eq!(resource, "region");
                assert_eq!(message, "region region-1 missing");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_grpc_gateway_body() {
        let body = r#"{"code":3,"message":"invalid name","details":[]}"#;
        let err = ApiError::from_status(400, body, "cluster");
        assert_eq!(
            err.to_string(),
            "request for cluster failed with status 400: invalid name"
        );
    }

    #[test]
    fn test_error_object_body() {
        assert_eq!(
            extract_message(r#"{"error":{"message":"quota exceeded"}}"#).as_deref(),
            Some("quota exceeded")
        );
        assert_eq!(
            extract_message(r#"{"error":"boom"}"#).as_deref(),
            Some("boom")
        );
    }

    #[test]
    fn test_raw_body_fallback() {
        assert_eq!(
            extract_message("  upstream connect error  ").as_deref(),
            Some("upstream connect error")
        );
        assert_eq!(extract_message(""), None);
        let long = "x".repeat(500);
        assert!(extract_message(&long).unwrap().ends_with("..."));
    }

    #[test]
    fn test_default_message_when_body_empty() {
        let err = ApiError::from_status(503, "", "catalog");
        assert!(err.to_string().contains("service unavailable"));
    }
}
