//! Shared helper functions for CLI commands

use dialoguer::{theme::ColorfulTheme, Confirm, Password};
use miette::{IntoDiagnostic, Result, WrapErr};
use std::fs;
use std::io::{self, BufRead, IsTerminal};
use std::path::Path;

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Check if stdin is an interactive terminal
pub fn stdin_is_interactive() -> bool {
    io::stdin().is_terminal()
}

/// Ask a y/N question; refuses to guess when stdin is not a terminal
pub fn confirm(prompt: &str) -> Result<bool> {
    if !stdin_is_interactive() {
        return Err(miette::miette!(
            help = "pass --yes to confirm non-interactively",
            "refusing to continue without confirmation"
        ));
    }
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()
        .into_diagnostic()
}

/// Read a secret, hidden when interactive and from the first stdin line otherwise
///
/// The non-interactive path supports `echo "$PASSWORD" | orch-cli login admin`.
pub fn prompt_password(prompt: &str) -> Result<String> {
    if stdin_is_interactive() {
        return Password::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .interact()
            .into_diagnostic();
    }

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).into_diagnostic()?;
    let secret = line.trim_end_matches(['\r', '\n']).to_string();
    if secret.is_empty() {
        return Err(miette::miette!("{} was not provided on stdin", prompt));
    }
    Ok(secret)
}

/// Read a text file named on the command line
pub fn read_text_file(path: &Path, what: &str) -> Result<String> {
    fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("cannot read {} '{}'", what, path.display()))
}

/// Write output to a file named on the command line
pub fn write_text_file(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content)
        .into_diagnostic()
        .wrap_err_with(|| format!("cannot write '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("hi", 2), "hi");
        assert_eq!(truncate_str("ééééé", 4), "é...");
    }

    #[test]
    fn test_read_missing_file_names_it() {
        let tmp = TempDir::new().unwrap();
        let err = read_text_file(&tmp.path().join("nope.pem"), "public key").unwrap_err();
        assert!(err.to_string().contains("public key"));
        assert!(err.to_string().contains("nope.pem"));
    }
}
