//! REST client for the orchestrator services
//!
//! All backend calls go through the [`Transport`] trait so that commands can be
//! exercised against an in-memory backend in tests. [`HttpTransport`] is the real
//! implementation, a thin wrapper over a blocking `reqwest` client.

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;

use crate::core::error::ApiError;

/// Page size requested from paginated list endpoints
pub const PAGE_SIZE: usize = 100;

/// Request timeout for backend calls
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// A single request against the orchestrator API
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API endpoint, starting with `/`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// URL-encoded form body, sent instead of `body` when present
    pub form: Option<Vec<(String, String)>>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            form: None,
        }
    }

    pub fn with_query(mut self, query: &[(String, String)]) -> Self {
        self.query.extend(query.iter().cloned());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_form(mut self, form: &[(&str, &str)]) -> Self {
        self.form = Some(
            form.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self
    }

    /// Look up a form field by name
    pub fn form_param(&self, key: &str) -> Option<&str> {
        self.form
            .as_deref()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Look up a query parameter by name
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Raw response: status plus body text
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

/// Something that can carry an [`ApiRequest`] to a backend
pub trait Transport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError>;
}

/// HTTP transport backed by `reqwest::blocking`
pub struct HttpTransport {
    client: Client,
    base_url: String,
    token: Option<String>,
    debug_headers: bool,
}

impl HttpTransport {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        debug_headers: bool,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("orch-cli/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Transport {
                url: base_url.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            debug_headers,
        })
    }

    fn log_headers(&self, direction: &str, url: &str, headers: &HeaderMap) {
        if !self.debug_headers {
            return;
        }
        for (name, value) in headers {
            let shown = if name == AUTHORIZATION {
                "<redacted>".to_string()
            } else {
                value.to_str().unwrap_or("<binary>").to_string()
            };
            tracing::info!(target: "orch::http", "{} {} {}: {}", direction, url, name, shown);
        }
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = format!("{}{}", self.base_url, request.path);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = &self.token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
                ApiError::Transport {
                    url: url.clone(),
                    message: format!("invalid access token: {}", e),
                }
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .headers(headers.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(form) = &request.form {
            builder = builder.form(form);
        } else if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!("{} {}", request.method, url);
        self.log_headers(">", &url, &headers);

        let response = builder.send().map_err(|e| ApiError::Transport {
            url: url.clone(),
            message: e.to_string(),
        })?;

        let status = response.status().as_u16();
        self.log_headers("<", &url, response.headers());
        let body = response.text().map_err(|e| ApiError::Transport {
            url: url.clone(),
            message: e.to_string(),
        })?;

        tracing::debug!("{} {} -> {}", request.method, url, status);
        Ok(ApiResponse { status, body })
    }
}

/// Typed entry point used by all commands
pub struct ApiClient {
    transport: Box<dyn Transport>,
}

impl ApiClient {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn get(&self, path: &str, resource: &str) -> Result<Value, ApiError> {
        self.execute(ApiRequest::new(Method::GET, path), resource)
    }

    pub fn get_with_query(
        &self,
        path: &str,
        query: &[(String, String)],
        resource: &str,
    ) -> Result<Value, ApiError> {
        self.execute(ApiRequest::new(Method::GET, path).with_query(query), resource)
    }

    pub fn post(&self, path: &str, body: &Value, resource: &str) -> Result<Value, ApiError> {
        self.execute(
            ApiRequest::new(Method::POST, path).with_body(body.clone()),
            resource,
        )
    }

    pub fn put(&self, path: &str, body: &Value, resource: &str) -> Result<Value, ApiError> {
        self.execute(
            ApiRequest::new(Method::PUT, path).with_body(body.clone()),
            resource,
        )
    }

    pub fn patch(&self, path: &str, body: &Value, resource: &str) -> Result<Value, ApiError> {
        self.execute(
            ApiRequest::new(Method::PATCH, path).with_body(body.clone()),
            resource,
        )
    }

    pub fn delete(&self, path: &str, resource: &str) -> Result<Value, ApiError> {
        self.execute(ApiRequest::new(Method::DELETE, path), resource)
    }

    /// Fetch every page of a list endpoint
    ///
    /// Pages are requested one at a time with `pageSize`/`offset` until a short page,
    /// an empty page, or `hasNext: false` is seen. Endpoints that answer with a bare
    /// JSON array are not paginated.
    pub fn list_all(
        &self,
        path: &str,
        list_key: &str,
        query: &[(String, String)],
        resource: &str,
    ) -> Result<Vec<Value>, ApiError> {
        let mut items = Vec::new();
        let mut offset = 0usize;

        loop {
            let mut page_query = query.to_vec();
            page_query.push(("pageSize".to_string(), PAGE_SIZE.to_string()));
            page_query.push(("offset".to_string(), offset.to_string()));

            let page = self.get_with_query(path, &page_query, resource)?;
            let (page_items, has_next) = match page {
                Value::Array(arr) => return Ok(arr),
                Value::Object(mut obj) => {
                    let has_next = obj.get("hasNext").and_then(Value::as_bool);
                    let page_items = match obj.remove(list_key) {
                        Some(Value::Array(arr)) => arr,
                        Some(Value::Null) | None => Vec::new(),
                        Some(other) => {
                            return Err(ApiError::Decode {
                                resource: resource.to_string(),
                                message: format!(
                                    "expected '{}' to be a list, got {}",
                                    list_key, other
                                ),
                            })
                        }
                    };
                    (page_items, has_next)
                }
                Value::Null => (Vec::new(), None),
                other => {
                    return Err(ApiError::Decode {
                        resource: resource.to_string(),
                        message: format!("unexpected list response: {}", other),
                    })
                }
            };

            let count = page_items.len();
            items.extend(page_items);
            tracing::debug!("{}: fetched {} (offset {})", resource, count, offset);

            if count == 0 || count < PAGE_SIZE || has_next == Some(false) {
                break;
            }
            offset += count;
        }

        Ok(items)
    }

    fn execute(&self, request: ApiRequest, resource: &str) -> Result<Value, ApiError> {
        let response = self.transport.send(&request)?;

        if !(200..300).contains(&response.status) {
            return Err(ApiError::from_status(
                response.status,
                &response.body,
                resource,
            ));
        }

        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&response.body).map_err(|e| ApiError::Decode {
            resource: resource.to_string(),
            message: e.to_string(),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::testing::MockTransport;
    use super::*;
    use serde_json::json;

    fn page(n: usize, start: usize) -> Vec<Value> {
        (start..start + n)
            .map(|i| json!({"resourceId": format!("host-{:08x}", i)}))
            .collect()
    }

    #[test]
    fn test_list_all_stops_on_short_page() {
        let mock = MockTransport::new();
        mock.respond(200, json!({"hosts": page(PAGE_SIZE, 0), "hasNext": true}))
            .respond(200, json!({"hosts": page(3, PAGE_SIZE), "hasNext": false}));

        let hosts = mock
            .client()
            .list_all("/v1/projects/p/compute/hosts", "hosts", &[], "hosts")
            .unwrap();

        assert_eq!(hosts.len(), PAGE_SIZE + 3);
        let requests = mock.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].query_param("offset"), Some("0"));
        assert_eq!(requests[1].query_param("offset"), Some("100"));
        assert_eq!(requests[1].query_param("pageSize"), Some("100"));
    }

    #[test]
    fn test_list_all_respects_has_next_false() {
        let mock = MockTransport::new();
        mock.respond(200, json!({"regions": page(PAGE_SIZE, 0), "hasNext": false}));

        let regions = mock
            .client()
            .list_all("/v1/projects/p/regions", "regions", &[], "regions")
            .unwrap();
        assert_eq!(regions.len(), PAGE_SIZE);
        assert_eq!(mock.requests().len(), 1);
    }

    #[test]
    fn test_list_all_bare_array() {
        let mock = MockTransport::new();
        mock.respond(200, json!([{"name": "a"}, {"name": "b"}]));

        let projects = mock
            .client()
            .list_all("/v1/projects", "projects", &[], "projects")
            .unwrap();
        assert_eq!(projects.len(), 2);
    }

    #[test]
    fn test_list_all_missing_key_is_empty() {
        let mock = MockTransport::new();
        mock.respond(200, json!({"totalElements": 0}));

        let sites = mock
            .client()
            .list_all("/v1/projects/p/sites", "sites", &[], "sites")
            .unwrap();
        assert!(sites.is_empty());
    }

    #[test]
    fn test_list_all_passes_extra_query() {
        let mock = MockTransport::new();
        mock.respond(200, json!({"sites": []}));

        let query = vec![("filter".to_string(), "name=\"lab\"".to_string())];
        mock.client()
            .list_all("/v1/projects/p/sites", "sites", &query, "sites")
            .unwrap();
        assert_eq!(
            mock.requests()[0].query_param("filter"),
            Some("name=\"lab\"")
        );
    }

    #[test]
    fn test_execute_maps_errors() {
        let mock = MockTransport::new();
        mock.respond(404, json!({"message": "no such cluster"}));

        let err = mock
            .client()
            .get("/v2/projects/p/clusters/c1", "cluster 'c1'")
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "cluster 'c1' not found: no such cluster");
    }

    #[test]
    fn test_empty_body_is_null() {
        let mock = MockTransport::new();
        mock.respond(204, Value::Null);

        let value = mock.client().delete("/v1/orgs/acme", "organization").unwrap();
        assert!(value.is_null());
        assert_eq!(mock.requests()[0].method, Method::DELETE);
    }

    #[test]
    fn test_invalid_json_is_decode_error() {
        struct Garbage;
        impl Transport for Garbage {
            fn send(&self, _: &ApiRequest) -> Result<ApiResponse, ApiError> {
                Ok(ApiResponse {
                    status: 200,
                    body: "<html>".to_string(),
                })
            }
        }

        let client = ApiClient::new(Box::new(Garbage));
        let err = client.get("/v1/orchestrator/info", "info").unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }
}
