//! Authenticated transport with a deferred session
//!
//! The stored access token (refreshed through Keycloak when it has expired) is
//! only resolved when the first request goes out. Commands that fail local
//! validation therefore never touch the session or the network.

use std::cell::{OnceCell, RefCell};

use crate::core::auth::{self, KeycloakClient};
use crate::core::client::{ApiRequest, ApiResponse, Transport};
use crate::core::config::Config;
use crate::core::error::ApiError;

/// Builds the inner transport once the bearer token is known
pub type Connector = Box<dyn Fn(String) -> Result<Box<dyn Transport>, ApiError>>;

pub struct SessionTransport {
    config: RefCell<Config>,
    keycloak: KeycloakClient,
    connect: Connector,
    inner: OnceCell<Box<dyn Transport>>,
}

impl SessionTransport {
    pub fn new(config: Config, keycloak: KeycloakClient, connect: Connector) -> Self {
        Self {
            config: RefCell::new(config),
            keycloak,
            connect,
            inner: OnceCell::new(),
        }
    }

    fn inner(&self) -> Result<&dyn Transport, ApiError> {
        if let Some(inner) = self.inner.get() {
            return Ok(inner.as_ref());
        }

        let token = auth::access_token(&mut self.config.borrow_mut(), &self.keycloak)?;
        let transport = (self.connect)(token)?;
        Ok(self.inner.get_or_init(|| transport).as_ref())
    }
}

impl Transport for SessionTransport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        self.inner()?.send(request)
    }
}
