//! `orch-cli generate standalone-config`

use chrono::Utc;
use miette::{IntoDiagnostic, Result};
use std::io::Write;
use std::path::PathBuf;

use crate::cli::helpers::{read_text_file, write_text_file};
use crate::cli::output::print_success;
use crate::standalone::{self, ScriptSource, DEFAULT_REF};

#[derive(clap::Args, Debug)]
pub struct GenerateArgs {
    /// Node description (dotenv, optionally followed by `---` and YAML)
    #[arg(long, short = 'c', value_name = "FILE")]
    pub config_file: PathBuf,

    /// Write the cloud-init document here instead of stdout
    #[arg(long, short = 'f', value_name = "FILE")]
    pub output_file: Option<PathBuf>,

    /// Read provisioning scripts from this directory instead of downloading them
    #[arg(long, value_name = "DIR", conflicts_with = "scripts_ref")]
    pub scripts_dir: Option<PathBuf>,

    /// Git ref of the standalone node repository to download scripts from
    #[arg(long, value_name = "REF")]
    pub scripts_ref: Option<String>,
}

impl GenerateArgs {
    fn source(&self) -> ScriptSource {
        match &self.scripts_dir {
            Some(dir) => ScriptSource::Local(dir.clone()),
            None => ScriptSource::Remote {
                git_ref: self
                    .scripts_ref
                    .clone()
                    .unwrap_or_else(|| DEFAULT_REF.to_string()),
            },
        }
    }
}

pub fn run(args: GenerateArgs, out: &mut dyn Write) -> Result<()> {
    let content = read_text_file(&args.config_file, "config file")?;
    let filename = args.config_file.display().to_string();
    let document = standalone::generate(&content, &filename, &args.source(), Utc::now())?;

    match &args.output_file {
        Some(file) => {
            write_text_file(file, &document)?;
            print_success(out, format!("Wrote cloud-init to {}", file.display()))
        }
        None => out.write_all(document.as_bytes()).into_diagnostic(),
    }
}
