//! # Engine Configuration
//!
//! [`EngineConfig`] is plain data, deserializable from YAML or JSON. Every
//! field has a default, so an empty document is a valid configuration.
//!
//! ```yaml
//! max_depth: 512
//! assert_formats: true
//! collect_annotations: false
//! default_dialect: https://json-schema.org/draft/2020-12/schema
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dialect::METASCHEMA_2020_12;
use crate::error::ConfigError;

/// Lowest accepted recursion ceiling.
pub const MIN_DEPTH: usize = 1;
/// Highest accepted recursion ceiling.
pub const MAX_DEPTH: usize = 4096;
/// Recursion ceiling used when none is configured.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Tunables for compilation and evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Maximum subschema nesting during one evaluation. Exceeding it aborts
    /// the evaluation with `EvaluationError::DepthExceeded`.
    pub max_depth: usize,
    /// When true, `format` also asserts for every format the catalog knows.
    pub assert_formats: bool,
    /// When false, results carry no annotations. Annotations are still
    /// computed internally for `unevaluated*` keywords.
    pub collect_annotations: bool,
    /// `$schema` assumed for documents that do not declare one.
    pub default_dialect: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            assert_formats: false,
            collect_annotations: true,
            default_dialect: METASCHEMA_2020_12.to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse a YAML configuration.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text).map_err(|e| ConfigError::Parse {
            format: "yaml",
            reason: e.to_string(),
        })?;
        Ok(config.normalized())
    }

    /// Parse a JSON configuration.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(|e| ConfigError::Parse {
            format: "json",
            reason: e.to_string(),
        })?;
        Ok(config.normalized())
    }

    /// Load a configuration file. `.yaml` and `.yml` files are parsed as
    /// YAML, everything else as JSON.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml_str(&content),
            _ => Self::from_json_str(&content),
        }
    }

    /// Clamp out-of-range values into their accepted range.
    pub fn normalized(mut self) -> Self {
        let clamped = self.max_depth.clamp(MIN_DEPTH, MAX_DEPTH);
        if clamped != self.max_depth {
            tracing::warn!(
                requested = self.max_depth,
                clamped,
                "max_depth out of range, clamping"
            );
            self.max_depth = clamped;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_depth, 256);
        assert!(!config.assert_formats);
        assert!(config.collect_annotations);
        assert_eq!(config.default_dialect, METASCHEMA_2020_12);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = EngineConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_yaml_overrides() {
        let config = EngineConfig::from_yaml_str("max_depth: 32\nassert_formats: true\n").unwrap();
        assert_eq!(config.max_depth, 32);
        assert!(config.assert_formats);
        assert!(config.collect_annotations);
    }

    #[test]
    fn test_json_overrides() {
        let config =
            EngineConfig::from_json_str(r#"{"collect_annotations": false, "default_dialect": "https://example.com/d"}"#)
                .unwrap();
        assert!(!config.collect_annotations);
        assert_eq!(config.default_dialect, "https://example.com/d");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = EngineConfig::from_yaml_str("max_dept: 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { format: "yaml", .. }));
    }

    #[test]
    fn test_max_depth_clamped() {
        assert_eq!(EngineConfig::from_yaml_str("max_depth: 0").unwrap().max_depth, MIN_DEPTH);
        assert_eq!(
            EngineConfig::from_yaml_str("max_depth: 100000").unwrap().max_depth,
            MAX_DEPTH
        );
    }

    #[test]
    fn test_from_file_dispatches_on_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();

        let yaml = dir.join("engine.yaml");
        std::fs::write(&yaml, "max_depth: 64\n").unwrap();
        assert_eq!(EngineConfig::from_file(&yaml).unwrap().max_depth, 64);

        let json = dir.join("engine.json");
        std::fs::write(&json, r#"{"max_depth": 65}"#).unwrap();
        assert_eq!(EngineConfig::from_file(&json).unwrap().max_depth, 65);

        let missing = dir.join("missing.json");
        assert!(matches!(EngineConfig::from_file(&missing), Err(ConfigError::Io(_))));
    }
}
