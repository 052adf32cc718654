//! Configuration loading and validation.
//!
//! Junction reads its entire configuration once at startup from a YAML
//! or JSON file; there is no hot reload and no persisted state —
//! operators restart to pick up changes (this also refreshes DNS
//! resolution of target hostnames). Submodules provide the serde data
//! model and the validation pass.

pub mod model;
pub mod validation;

use std::path::{Path, PathBuf};

use crate::error::JunctionError;
use model::Config;

/// Parse a config string based on file extension.
pub fn parse_config_str(
    ext: &str,
    content: &str,
    path_display: &str,
) -> Result<Config, JunctionError> {
    match ext {
        "yaml" | "yml" => serde_yml::from_str(content).map_err(|e| JunctionError::ConfigParse {
            path: path_display.to_string(),
            source: Box::new(e),
        }),

        "json" => serde_json::from_str(content).map_err(|e| JunctionError::ConfigParse {
            path: path_display.to_string(),
            source: Box::new(e),
        }),

        other => Err(JunctionError::UnsupportedFormat(other.to_string())),
    }
}

/// Read, parse, and validate a config file. Any validation finding is
/// fatal.
pub fn load_file(path: &Path) -> Result<Config, JunctionError> {
    if !path.exists() {
        return Err(JunctionError::ConfigFileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path)?;
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let config = parse_config_str(ext, &content, &path.display().to_string())?;

    validation::validate(&config).map_err(|errors| JunctionError::ConfigValidation { errors })?;

    Ok(config)
}

/// Resolve the config path: an explicit `--config` wins, otherwise the
/// current directory is searched for `junction.{yaml,yml,json}`.
pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf, JunctionError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let candidates = ["junction.yaml", "junction.yml", "junction.json"];

    for name in &candidates {
        let path = PathBuf::from(name);
        if path.exists() {
            tracing::info!(path = %path.display(), "auto-detected config file");
            return Ok(path);
        }
    }

    Err(JunctionError::NoConfigFile {
        hint: "Provide --config <file> or create ./junction.yaml.".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_format_returns_error() {
        let result = parse_config_str("xml", "{}", "test.xml");
        assert!(matches!(result, Err(JunctionError::UnsupportedFormat(_))));
    }

    #[test]
    fn unknown_fields_rejected() {
        let result = parse_config_str(
            "yaml",
            r"
groups: []
rules: []
surprise: true
",
            "test.yaml",
        );
        assert!(matches!(result, Err(JunctionError::ConfigParse { .. })));
    }

    #[test]
    fn listener_defaults_are_sensible() {
        let config = parse_config_str(
            "json",
            r#"{"groups": [], "rules": []}"#,
            "test.json",
        )
        .unwrap();
        assert_eq!(config.listener.port, 8080);
        assert_eq!(config.listener.connection_timeout_ms, 5000);
        assert!(!config.listener.proxy_headers);
        assert!(config.listener.session_ttl_ms.is_none());
    }
}
