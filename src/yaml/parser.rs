//! Reading YAML and JSON input files

use serde::de::DeserializeOwned;
use std::path::Path;

use crate::yaml::diagnostics::{YamlError, YamlSyntaxError};

/// Parse YAML content into a typed value with nice error messages
pub fn parse_yaml<T: DeserializeOwned>(content: &str, filename: &str) -> Result<T, YamlError> {
    serde_yml::from_str(content).map_err(|e| {
        YamlError::Syntax(YamlSyntaxError::from_serde_error(&e, content, filename))
    })
}

/// Parse a manifest that may be JSON or YAML, decided by extension
///
/// JSON is a subset of YAML, so anything that is not `.json` goes through the YAML
/// parser; `.json` files get the stricter JSON parser for better messages.
pub fn parse_manifest_file(path: &Path) -> Result<(serde_json::Value, String), YamlError> {
    let content = std::fs::read_to_string(path).map_err(|source| YamlError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let filename = path.display().to_string();

    let is_json = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let value = if is_json {
        serde_json::from_str(&content).map_err(|e| YamlError::Json {
            filename: filename.clone(),
            line: e.line(),
            message: e.to_string(),
        })?
    } else {
        parse_yaml(&content, &filename)?
    };
    Ok((value, content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::fs;
    use tempfile::TempDir;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Manifest {
        name: String,
        replicas: i32,
    }

    #[test]
    fn test_parse_typed_manifest() {
        let yaml = "name: baseline\nreplicas: 3";
        let result: Manifest = parse_yaml(yaml, "template.yaml").unwrap();
        assert_eq!(result.name, "baseline");
        assert_eq!(result.replicas, 3);
    }

    #[test]
    fn test_syntax_error_names_file() {
        let yaml = "name: baseline\n  replicas: [3";
        let err = parse_yaml::<Manifest>(yaml, "template.yaml").unwrap_err();
        assert!(err.to_string().contains("template.yaml"));
    }

    #[test]
    fn test_parse_manifest_json_and_yaml() {
        let tmp = TempDir::new().unwrap();
        let json_path = tmp.path().join("t.json");
        let yaml_path = tmp.path().join("t.yaml");
        fs::write(&json_path, r#"{"name": "baseline"}"#).unwrap();
        fs::write(&yaml_path, "name: baseline\n").unwrap();

        let (json, _) = parse_manifest_file(&json_path).unwrap();
        let (yaml, _) = parse_manifest_file(&yaml_path).unwrap();
        assert_eq!(json, yaml);
    }

    #[test]
    fn test_parse_manifest_bad_json_reports_line() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("t.json");
        fs::write(&path, "{\n  \"name\": \n}").unwrap();

        match parse_manifest_file(&path) {
            Err(YamlError::Json { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected {:?}", other.map(|(v, _)| v)),
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = parse_manifest_file(Path::new("/nonexistent/x.yaml"));
        assert!(matches!(result, Err(YamlError::Io { .. })));
    }
}
