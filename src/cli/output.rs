//! Output formatting utilities

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use serde_json::Value;
use std::io::Write;

use crate::cli::table::{render_detail, render_table, ColumnDef};
use crate::cli::OutputFormat;

/// Serialize any value as pretty JSON or YAML
pub fn write_structured<T: Serialize + ?Sized>(
    out: &mut dyn Write,
    format: OutputFormat,
    value: &T,
) -> Result<()> {
    match format {
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(value).into_diagnostic()?;
            write!(out, "{}", yaml).into_diagnostic()
        }
        _ => {
            let json = serde_json::to_string_pretty(value).into_diagnostic()?;
            writeln!(out, "{}", json).into_diagnostic()
        }
    }
}

/// Print a list of resources in the requested format
pub fn print_list(
    out: &mut dyn Write,
    format: OutputFormat,
    rows: &[Value],
    columns: &[ColumnDef],
    name_plural: &str,
) -> Result<()> {
    match format {
        OutputFormat::Table => {
            if rows.is_empty() {
                writeln!(out, "No {} found.", name_plural).into_diagnostic()
            } else {
                write!(out, "{}", render_table(rows, columns)).into_diagnostic()
            }
        }
        other => write_structured(out, other, rows),
    }
}

/// Print one resource in the requested format
pub fn print_item(
    out: &mut dyn Write,
    format: OutputFormat,
    value: &Value,
    fields: &[ColumnDef],
) -> Result<()> {
    match format {
        OutputFormat::Table => write!(out, "{}", render_detail(value, fields)).into_diagnostic(),
        other => write_structured(out, other, value),
    }
}

/// Confirmation line after a successful mutation
pub fn print_success(out: &mut dyn Write, message: impl std::fmt::Display) -> Result<()> {
    writeln!(out, "{} {}", style("✓").green(), message).into_diagnostic()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_print_list_empty_table() {
        let mut out = Vec::new();
        print_list(&mut out, OutputFormat::Table, &[], &[], "regions").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "No regions found.\n");
    }

    #[test]
    fn test_print_list_json_and_yaml() {
        let rows = vec![json!({"name": "a"})];

        let mut out = Vec::new();
        print_list(&mut out, OutputFormat::Json, &rows, &[], "sites").unwrap();
        let parsed: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed, json!([{"name": "a"}]));

        let mut out = Vec::new();
        print_list(&mut out, OutputFormat::Yaml, &rows, &[], "sites").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "- name: a\n");
    }
}
