//! Core module - session, transport and validation primitives

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod features;
pub mod session;
pub mod validate;

pub use auth::{AuthError, KeycloakClient, TokenResponse};
pub use client::{ApiClient, ApiRequest, ApiResponse, HttpTransport, Transport, PAGE_SIZE};
pub use config::{Config, ConfigError};
pub use error::ApiError;
pub use features::{Feature, OrchestratorInfo};
pub use session::SessionTransport;
pub use validate::ValidationError;
