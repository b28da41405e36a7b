// File: src/config.rs
// Purpose: Navigator configuration, loaded from TOML

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::path::normalize_path;
use crate::route::MatchOptions;

/// What happens to the current view when a location matches no route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnmatchedPolicy {
    /// Leave the current chain, outlets and state untouched
    #[default]
    Keep,
    /// Commit an empty chain: tear down outlets and render a placeholder
    Clear,
}

/// Navigator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigatorConfig {
    /// Prefix stripped from every pathname before matching (default: "/")
    #[serde(default = "default_base_href")]
    pub base_href: String,

    /// Whether literal segments match ignoring ASCII case (default: false)
    #[serde(default = "default_false")]
    pub case_insensitive: bool,

    /// Redirects followed by a single programmatic navigation (default: 8)
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    #[serde(default)]
    pub unmatched: UnmatchedPolicy,

    /// Keep nested outlets mounted when an enclosing route's params change
    /// (default: false, nested routes are re-rendered)
    #[serde(default = "default_false")]
    pub reuse_nested_on_param_change: bool,
}

fn default_base_href() -> String {
    "/".to_string()
}

fn default_max_redirects() -> usize {
    8
}

fn default_false() -> bool {
    false
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            base_href: default_base_href(),
            case_insensitive: false,
            max_redirects: default_max_redirects(),
            unmatched: UnmatchedPolicy::default(),
            reuse_nested_on_param_change: false,
        }
    }
}

impl NavigatorConfig {
    /// Load configuration from a TOML file
    ///
    /// A missing or empty file yields the defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Parse configuration from TOML text
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let mut config: NavigatorConfig =
            toml::from_str(content).context("Invalid navigator configuration")?;
        config.base_href = normalize_path(&config.base_href).into_owned();
        Ok(config)
    }

    pub fn with_base_href(mut self, base_href: impl AsRef<str>) -> Self {
        self.base_href = normalize_path(base_href.as_ref()).into_owned();
        self
    }

    pub fn match_options(&self) -> MatchOptions {
        MatchOptions {
            case_insensitive: self.case_insensitive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NavigatorConfig::default();
        assert_eq!(config.base_href, "/");
        assert!(!config.case_insensitive);
        assert_eq!(config.max_redirects, 8);
        assert_eq!(config.unmatched, UnmatchedPolicy::Keep);
        assert!(!config.reuse_nested_on_param_change);
    }

    #[test]
    fn test_empty_config() {
        let config = NavigatorConfig::from_str("   ").unwrap();
        assert_eq!(config.max_redirects, 8);
    }

    #[test]
    fn test_custom_config() {
        let toml = r#"
            base_href = "app/"
            case_insensitive = true
            unmatched = "clear"
            max_redirects = 3
        "#;
        let config = NavigatorConfig::from_str(toml).unwrap();
        assert_eq!(config.base_href, "/app");
        assert!(config.match_options().case_insensitive);
        assert_eq!(config.unmatched, UnmatchedPolicy::Clear);
        assert_eq!(config.max_redirects, 3);
    }

    #[test]
    fn test_invalid_policy_is_an_error() {
        let err = NavigatorConfig::from_str(r#"unmatched = "explode""#).unwrap_err();
        assert!(err.to_string().contains("Invalid navigator configuration"));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = NavigatorConfig::from_file("/definitely/not/here.toml").unwrap();
        assert_eq!(config.base_href, "/");
    }
}
