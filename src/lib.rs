//! orch-cli: command-line client for the edge orchestrator
//!
//! Manages tenancy, infrastructure, clusters and application deployments over
//! the orchestrator's REST APIs, and renders cloud-init documents for
//! standalone edge nodes without talking to an orchestrator at all.

pub mod cli;
pub mod core;
pub mod entities;
pub mod schema;
pub mod standalone;
pub mod yaml;
