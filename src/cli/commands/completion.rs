//! `orch-cli completion <shell>`

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use miette::{IntoDiagnostic, Result};
use std::io::Write;

use crate::cli::Cli;

#[derive(clap::Args, Debug)]
pub struct CompletionArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

pub fn run(args: CompletionArgs, out: &mut dyn Write) -> Result<()> {
    let mut cmd = Cli::command();
    let mut buf = Vec::new();
    generate(args.shell, &mut cmd, "orch-cli", &mut buf);
    out.write_all(&buf).into_diagnostic()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::context::testing::output;

    #[test]
    fn test_bash_completion_mentions_nouns() {
        let mut out = Vec::new();
        run(CompletionArgs { shell: Shell::Bash }, &mut out).unwrap();
        let script = output(out);
        assert!(script.contains("orch-cli"));
        assert!(script.contains("clustertemplate"));
    }
}
