//! CLI module - argument parsing, output formatting and command dispatch

pub mod args;
pub mod commands;
pub mod context;
pub mod filters;
pub mod helpers;
pub mod output;
pub mod resource_cmd;
pub mod table;

pub use args::{Cli, Commands, GlobalOpts, OutputFormat};
