//! Backend configuration (`tern.toml`)
//!
//! ```toml
//! [suspend]
//! catch_hint = "__catch"
//!
//! [bridge]
//! primary_suffix = "_impl"
//!
//! [covariance]
//! excluded_formals = ["Comparable.T"]
//! ```
//!
//! Every table and field is optional.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default config file name looked up next to the input.
pub const CONFIG_FILE: &str = "tern.toml";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub suspend: SuspendConfig,
    pub bridge: BridgeConfig,
    pub covariance: CovarianceConfig,
}

/// Name hints for identifiers the hoisting pass allocates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuspendConfig {
    pub catch_hint: String,
    pub ok_hint: String,
    pub cond_hint: String,
}

impl Default for SuspendConfig {
    fn default() -> Self {
        Self {
            catch_hint: "__catch".to_string(),
            ok_hint: "__ok".to_string(),
            cond_hint: "__cond".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Appended to the original name to name the primary implementation
    pub primary_suffix: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            primary_suffix: "_".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CovarianceConfig {
    /// Qualified formals (`Owner.T`) never given wrapper representation.
    /// The builtin comparison formal is listed by default: generic equality
    /// over it boxes value types and breaks when wrapped.
    pub excluded_formals: Vec<String>,
}

impl Default for CovarianceConfig {
    fn default() -> Self {
        Self {
            excluded_formals: vec!["Comparable.T".to_string()],
        }
    }
}

impl BackendConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    /// Load a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&source).with_context(|| format!("invalid config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(BackendConfig::from_toml_str("").unwrap(), BackendConfig::default());
    }

    #[test]
    fn test_partial_tables() {
        let config = BackendConfig::from_toml_str(
            r#"
            [bridge]
            primary_suffix = "_impl"

            [covariance]
            excluded_formals = []
            "#,
        )
        .unwrap();
        assert_eq!(config.bridge.primary_suffix, "_impl");
        assert!(config.covariance.excluded_formals.is_empty());
        assert_eq!(config.suspend, SuspendConfig::default());
    }

    #[test]
    fn test_unknown_field_type_is_error() {
        assert!(BackendConfig::from_toml_str("[bridge]\nprimary_suffix = 3").is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = BackendConfig::load(Path::new("/nonexistent/tern.toml")).unwrap();
        assert_eq!(config, BackendConfig::default());
    }
}
