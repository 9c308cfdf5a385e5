//! Selection configuration.

use std::{fs, io, path::Path};

use sasel_route::RouteConfig;
use sasel_scorer::ScorerConfig;
use serde::{Deserialize, Serialize};

/// Errors loading or saving a [`SelectionConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to access configuration: {0}")]
    Io(#[from] io::Error),
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to encode configuration: {0}")]
    Encode(#[from] toml::ser::Error),
}

/// Settings for source address and route selection.
///
/// Every field has a default, so an empty file is a valid configuration:
///
/// ```toml
/// [scorer]
/// strong_end_system = false
/// prefer_temporary = false
///
/// [route]
/// proxy_forwarding = true
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub scorer: ScorerConfig,
    pub route: RouteConfig,
}

impl SelectionConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load the configuration from the given path.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load the configuration from the given path, or create a default one if it doesn't exist.
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();
            config.save(path)?;
            Ok(config)
        }
    }

    /// Save the configuration to the given path.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_empty_is_default() {
        assert_eq!(SelectionConfig::from_toml_str("").unwrap(), SelectionConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = SelectionConfig::from_toml_str(
            r#"
            [scorer]
            strong_end_system = false

            [route]
            proxy_forwarding = true
            "#,
        )
        .unwrap();
        assert!(!config.scorer.strong_end_system);
        assert!(config.scorer.prefer_temporary);
        assert!(config.route.proxy_forwarding);
        assert!(config.route.select_srcif);
    }

    #[test]
    fn test_rejects_bad_types() {
        assert_matches!(
            SelectionConfig::from_toml_str("[scorer]\ndebug = \"yes\""),
            Err(ConfigError::Parse(_))
        );
    }

    #[test]
    fn test_load_or_create_then_load() {
        let dir = std::env::temp_dir().join(format!("sasel-config-{}", std::process::id()));
        let path = dir.join("select.toml");
        let _ = fs::remove_file(&path);

        let created = SelectionConfig::load_or_create(&path).unwrap();
        assert!(path.exists());

        let mut changed = created;
        changed.scorer.nexthop_prefix_rule = false;
        changed.save(&path).unwrap();
        assert_eq!(SelectionConfig::load(&path).unwrap(), changed);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_file() {
        assert_matches!(
            SelectionConfig::load("/nonexistent/sasel/select.toml"),
            Err(ConfigError::Io(_))
        );
    }
}
