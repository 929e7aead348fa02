//! Table rendering for JSON rows

use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::{Padding, Style};

use crate::cli::filters::resolve_path;

/// Column definition: header plus dotted path into the row
#[derive(Debug, Clone, Copy)]
pub struct ColumnDef {
    pub header: &'static str,
    pub path: &'static str,
}

impl ColumnDef {
    pub const fn new(header: &'static str, path: &'static str) -> Self {
        Self { header, path }
    }
}

/// Render one value as table text
///
/// Scalars print as-is, scalar arrays are comma-joined, `[{key, value}]`
/// metadata prints as `k=v` pairs and anything else falls back to compact JSON.
pub fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Array(items)) => {
            if items.iter().all(is_scalar) {
                items
                    .iter()
                    .map(|v| cell(Some(v)))
                    .collect::<Vec<_>>()
                    .join(",")
            } else if items.iter().all(is_key_value) {
                items
                    .iter()
                    .map(|v| format!("{}={}", cell(v.get("key")), cell(v.get("value"))))
                    .collect::<Vec<_>>()
                    .join(",")
            } else {
                Value::Array(items.clone()).to_string()
            }
        }
        Some(other) => other.to_string(),
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn is_key_value(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|m| m.contains_key("key") && m.len() <= 2)
}

/// Render rows as an aligned, borderless table
pub fn render_table(rows: &[Value], columns: &[ColumnDef]) -> String {
    let mut builder = Builder::default();
    builder.push_record(columns.iter().map(|c| c.header.to_string()));
    for row in rows {
        builder.push_record(columns.iter().map(|c| cell(resolve_path(row, c.path))));
    }

    let mut table = builder.build();
    table.with(Style::blank()).with(Padding::new(0, 2, 0, 0));

    let mut out = String::new();
    for line in table.to_string().lines() {
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Render a single resource as aligned `Field: value` lines
pub fn render_detail(value: &Value, fields: &[ColumnDef]) -> String {
    let width = fields.iter().map(|f| f.header.len()).max().unwrap_or(0) + 1;
    let mut out = String::new();
    for field in fields {
        let label = format!("{}:", field.header);
        let text = cell(resolve_path(value, field.path));
        out.push_str(format!("{:<width$} {}", label, text, width = width).trim_end());
        out.push('\n');
    }
    out
}
