//! Configuration schema (schemaplan.toml)

use serde::{Deserialize, Serialize};

use crate::enums::SqlFormat;

/// Compositing pipeline settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeConfig {
    /// Validate after every overlay is folded in, so violations are
    /// attributed to the overlay that introduced them. When false, only the
    /// final result is validated.
    #[serde(default = "default_true")]
    pub validate_each_overlay: bool,

    /// Format stamped into the database block when no document declares one
    #[serde(default)]
    pub default_format: Option<SqlFormat>,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self {
            validate_each_overlay: true,
            default_format: None,
        }
    }
}

/// Table creation ordering settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderingConfig {
    /// Ignore foreign keys from a table to itself. When false they are
    /// reported as dependency cycles.
    #[serde(default = "default_true")]
    pub allow_self_references: bool,
}

impl Default for OrderingConfig {
    fn default() -> Self {
        Self {
            allow_self_references: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub composite: CompositeConfig,

    #[serde(default)]
    pub ordering: OrderingConfig,
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

        Self::from_toml(&contents)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

        Ok(())
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.composite.validate_each_overlay);
        assert!(config.ordering.allow_self_references);
        assert_eq!(config.composite.default_format, None);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [composite]
            default_format = "mssql10"
            "#,
        )
        .unwrap();

        assert_eq!(config.composite.default_format, Some(SqlFormat::Mssql10));
        assert!(config.composite.validate_each_overlay);
        assert!(config.ordering.allow_self_references);
    }

    #[test]
    fn invalid_format_is_a_parse_error() {
        let err = Config::from_toml("[composite]\ndefault_format = \"oracle\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn config_toml_roundtrip() {
        let mut config = Config::default();
        config.ordering.allow_self_references = false;
        config.composite.default_format = Some(SqlFormat::Pgsql8);

        let toml = toml::to_string(&config).unwrap();
        let parsed = Config::from_toml(&toml).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schemaplan.toml");

        let mut config = Config::default();
        config.composite.validate_each_overlay = false;
        config.save_to_file(&path).unwrap();

        assert_eq!(Config::from_file(&path).unwrap(), config);
        assert!(matches!(
            Config::from_file(&dir.path().join("missing.toml")),
            Err(ConfigError::IoError(_))
        ));
    }
}
