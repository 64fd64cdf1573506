//! # Runtime Configuration Module
//!
//! Settings for one container instance, loaded from environment variables
//! or a YAML file. This is runtime tuning only: handlers, filters and
//! mappings are always registered in code.
//!
//! ## Environment Variables
//!
//! - `BRRTC_CONTEXT_PATH` - context root, e.g. `/shop` (default: empty)
//! - `BRRTC_CONTEXT_NAME` - display name (default: a generated ULID)
//! - `BRRTC_REQUEST_ENCODING` - default request character encoding
//! - `BRRTC_RESPONSE_ENCODING` - default response character encoding
//!
//! ## YAML
//!
//! ```yaml
//! context_path: /shop
//! context_name: shop
//! response_encoding: UTF-8
//! ```

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ContainerError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContainerConfig {
    /// Context root; empty for the root context
    pub context_path: String,
    /// `None` lets the container generate one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_encoding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_encoding: Option<String>,
}

impl ContainerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let config = Self {
            context_path: env::var("BRRTC_CONTEXT_PATH").unwrap_or_default(),
            context_name: env::var("BRRTC_CONTEXT_NAME").ok(),
            request_encoding: env::var("BRRTC_REQUEST_ENCODING").ok(),
            response_encoding: env::var("BRRTC_RESPONSE_ENCODING").ok(),
        };
        config.validated()
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|err| ContainerError::Config(err.to_string()))?;
        config.validated()
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|err| {
            ContainerError::Config(format!("reading {}: {err}", path.display()))
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// The effective configuration as YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|err| ContainerError::Config(err.to_string()))
    }

    /// Normalize the context path: leading `/`, no trailing `/`, and the
    /// root context as the empty string.
    fn validated(mut self) -> Result<Self> {
        let trimmed = self.context_path.trim().trim_end_matches('/');
        if !trimmed.is_empty() && !trimmed.starts_with('/') {
            return Err(ContainerError::Config(format!(
                "context path '{}' must start with '/'",
                self.context_path
            )));
        }
        self.context_path = trimmed.to_string();
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_with_defaults() {
        let config = ContainerConfig::from_yaml_str("context_path: /shop/\n").unwrap();
        assert_eq!(config.context_path, "/shop");
        assert!(config.context_name.is_none());
        assert!(config.response_encoding.is_none());
    }

    #[test]
    fn test_invalid_yaml_is_a_config_error() {
        let err = ContainerConfig::from_yaml_str("context_path: shop").unwrap_err();
        assert!(matches!(err, ContainerError::Config(_)));
        let err = ContainerConfig::from_yaml_str("unknown_key: 1").unwrap_err();
        assert!(matches!(err, ContainerError::Config(_)));
    }

    #[test]
    fn test_root_context_is_empty() {
        let config = ContainerConfig::from_yaml_str("context_path: /").unwrap();
        assert_eq!(config.context_path, "");
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("context_path: ''"));
    }
}
