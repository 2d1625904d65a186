//! On-disk formats for structured-data documents.

use serde_json::Value;
use std::path::Path;

use crate::error::BackendError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
    Toml,
}

impl Format {
    /// Pick a format from the file extension; anything unknown is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => Format::Yaml,
            Some("toml") => Format::Toml,
            _ => Format::Json,
        }
    }

    pub fn parse(self, text: &str) -> Result<Value, BackendError> {
        match self {
            Format::Json => {
                serde_json::from_str(text).map_err(|e| BackendError::Malformed(e.to_string()))
            }
            Format::Yaml => {
                serde_yaml::from_str(text).map_err(|e| BackendError::Malformed(e.to_string()))
            }
            Format::Toml => toml::from_str(text).map_err(|e| BackendError::Malformed(e.to_string())),
        }
    }

    /// Pretty-print `value`, ending with a newline.
    pub fn render(self, value: &Value) -> Result<String, BackendError> {
        let mut text = match self {
            Format::Json => serde_json::to_string_pretty(value)
                .map_err(|e| BackendError::Other(e.to_string()))?,
            Format::Yaml => {
                serde_yaml::to_string(value).map_err(|e| BackendError::Other(e.to_string()))?
            }
            Format::Toml => {
                // Going through toml::Value puts plain keys ahead of tables.
                let table = toml::Value::try_from(value)
                    .map_err(|e| BackendError::Unsupported(e.to_string()))?;
                toml::to_string_pretty(&table).map_err(|e| BackendError::Unsupported(e.to_string()))?
            }
        };
        if !text.ends_with('\n') {
            text.push('\n');
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn test_from_path() {
        assert_eq!(Format::from_path(&PathBuf::from("a.yml")), Format::Yaml);
        assert_eq!(Format::from_path(&PathBuf::from("a.YAML")), Format::Yaml);
        assert_eq!(Format::from_path(&PathBuf::from("Cargo.toml")), Format::Toml);
        assert_eq!(Format::from_path(&PathBuf::from("a.json")), Format::Json);
        assert_eq!(Format::from_path(&PathBuf::from("noext")), Format::Json);
    }

    #[test]
    fn test_parse_each_format() {
        let expected = json!({ "name": "demo", "tags": ["a", "b"] });
        assert_eq!(
            Format::Json
                .parse(r#"{"name": "demo", "tags": ["a", "b"]}"#)
                .unwrap(),
            expected
        );
        assert_eq!(
            Format::Yaml.parse("name: demo\ntags:\n  - a\n  - b\n").unwrap(),
            expected
        );
        assert_eq!(
            Format::Toml.parse("name = \"demo\"\ntags = [\"a\", \"b\"]\n").unwrap(),
            expected
        );
    }

    #[test]
    fn test_parse_malformed() {
        let err = Format::Json.parse("{ nope").unwrap_err();
        assert!(matches!(err, BackendError::Malformed(_)));
    }

    #[test]
    fn test_toml_rejects_null() {
        let err = Format::Toml.render(&json!({ "a": null })).unwrap_err();
        assert!(matches!(err, BackendError::Unsupported(_)));
    }
}
