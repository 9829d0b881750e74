//! # Router Configuration
//!
//! [`RouterConfig`] describes how a [`SpecRouter`](crate::router::SpecRouter)
//! is built. It is read from a YAML file, then environment variables override
//! individual fields.
//!
//! ```yaml
//! specs_path: specs
//! allow_stub_handlers: false
//! strict_validation: true
//! validators: [DataProductStandards]
//! rules: rules.yaml
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Field |
//! |---|---|
//! | `SPECROUTER_SPECS_PATH` | `specs_path` |
//! | `SPECROUTER_ALLOW_STUBS` | `allow_stub_handlers` |
//! | `SPECROUTER_STRICT_VALIDATION` | `strict_validation` |
//! | `SPECROUTER_RULES` | `rules` |
//!
//! Boolean variables accept `true`/`false`/`1`/`0`; anything else is ignored.

use crate::error::LoadError;
use crate::validator::UnknownValidatorError;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouterConfig {
    /// Root directory (or single file) of the spec tree
    pub specs_path: PathBuf,
    /// Bind `200 {}` stubs to routes without a handler
    pub allow_stub_handlers: bool,
    /// Forbid unknown properties and check `format` in payload validation
    pub strict_validation: bool,
    /// Validators to run after the default one, by name
    pub validators: Vec<String>,
    /// Rules file declaring extra validators
    pub rules: Option<PathBuf>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        RouterConfig {
            specs_path: PathBuf::from("specs"),
            allow_stub_handlers: false,
            strict_validation: false,
            validators: Vec::new(),
            rules: None,
        }
    }
}

impl RouterConfig {
    /// Defaults overridden by the environment
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|key| env::var(key).ok());
        config
    }

    /// Read a YAML file, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Load`] if the file is unreadable or not a valid config.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| LoadError::new(path, e.to_string()))?;
        let mut config = Self::from_yaml(&content).map_err(|reason| LoadError::new(path, reason))?;
        config.apply_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    /// Parse a YAML config without looking at the environment.
    ///
    /// # Errors
    ///
    /// The parser message when the text is not a valid config.
    pub fn from_yaml(content: &str) -> Result<Self, String> {
        serde_yaml::from_str(content).map_err(|e| format!("invalid router config: {e}"))
    }

    pub(crate) fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("SPECROUTER_SPECS_PATH").filter(|p| !p.is_empty()) {
            self.specs_path = PathBuf::from(path);
        }
        if let Some(allow) = lookup("SPECROUTER_ALLOW_STUBS").and_then(|v| parse_bool(&v)) {
            self.allow_stub_handlers = allow;
        }
        if let Some(strict) = lookup("SPECROUTER_STRICT_VALIDATION").and_then(|v| parse_bool(&v)) {
            self.strict_validation = strict;
        }
        if let Some(rules) = lookup("SPECROUTER_RULES").filter(|p| !p.is_empty()) {
            self.rules = Some(PathBuf::from(rules));
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// A configuration that cannot be turned into a router
#[derive(Debug)]
pub enum ConfigError {
    /// Config or rules file unreadable or malformed
    Load(LoadError),
    /// A configured validator name is not defined anywhere
    UnknownValidator(UnknownValidatorError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Load(err) => write!(f, "{err}"),
            ConfigError::UnknownValidator(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Load(err) => Some(err),
            ConfigError::UnknownValidator(err) => Some(err),
        }
    }
}

impl From<LoadError> for ConfigError {
    fn from(err: LoadError) -> Self {
        ConfigError::Load(err)
    }
}

impl From<UnknownValidatorError> for ConfigError {
    fn from(err: UnknownValidatorError) -> Self {
        ConfigError::UnknownValidator(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = RouterConfig::default();
        assert_eq!(config.specs_path, PathBuf::from("specs"));
        assert!(!config.allow_stub_handlers);
        assert!(!config.strict_validation);
        assert!(config.validators.is_empty());
        assert!(config.rules.is_none());
    }

    #[test]
    fn test_yaml_with_partial_fields() {
        let config = RouterConfig::from_yaml(
            "specs_path: api/specs\nstrict_validation: true\nvalidators: [DataProductStandards]\n",
        )
        .unwrap();
        assert_eq!(config.specs_path, PathBuf::from("api/specs"));
        assert!(config.strict_validation);
        assert!(!config.allow_stub_handlers);
        assert_eq!(config.validators, vec!["DataProductStandards"]);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = RouterConfig::from_yaml("spec_path: typo\n").unwrap_err();
        assert!(err.contains("spec_path"), "{err}");
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("SPECROUTER_SPECS_PATH", "/srv/specs"),
            ("SPECROUTER_ALLOW_STUBS", "1"),
            ("SPECROUTER_STRICT_VALIDATION", "maybe"),
            ("SPECROUTER_RULES", "rules.yaml"),
        ]
        .into_iter()
        .collect();
        let mut config = RouterConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.specs_path, PathBuf::from("/srv/specs"));
        assert!(config.allow_stub_handlers);
        assert!(!config.strict_validation);
        assert_eq!(config.rules, Some(PathBuf::from("rules.yaml")));
    }
}
