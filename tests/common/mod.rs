//! Shared test helpers for integration tests
//!
//! Every command runs against a private config file so tests never see the
//! developer's real session.

#![allow(dead_code)]

use assert_cmd::cargo;
use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Address nothing listens on; commands that reach the network fail fast
pub const UNREACHABLE: &str = "http://127.0.0.1:9";

pub struct TestEnv {
    pub dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("orch-cli").join("config.yaml")
    }

    pub fn write_config(&self, yaml: &str) {
        let path = self.config_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, yaml).unwrap();
    }

    pub fn read_config(&self) -> String {
        fs::read_to_string(self.config_path()).unwrap_or_default()
    }

    /// Helper to get an orch-cli command bound to this environment
    pub fn orch(&self) -> Command {
        let mut cmd = Command::new(cargo::cargo_bin!("orch-cli"));
        cmd.env("ORCH_CLI_CONFIG", self.config_path())
            .env_remove("ORCH_PROJECT")
            .env_remove("ORCH_API_ENDPOINT")
            .env_remove("RUST_LOG")
            .current_dir(self.dir.path());
        cmd
    }

    /// Command that skips authentication against an unreachable endpoint
    pub fn orch_offline(&self) -> Command {
        let mut cmd = self.orch();
        cmd.args(["--noauth", "--api-endpoint", UNREACHABLE, "--project", "acme"]);
        cmd
    }
}
