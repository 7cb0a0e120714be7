//! Configuration types for the hosts updater
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::mapping::NamePolicy;

/// Description of one flag a snapshot source understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagSpec {
    /// Flag name as given on the command line (e.g. "address")
    pub name: &'static str,
    /// Help text shown to the user
    pub description: &'static str,
    /// Whether the source refuses to start without it
    pub required: bool,
    /// Secret values are redacted from logs and `Debug` output
    pub secret: bool,
}

impl FlagSpec {
    /// A required flag
    pub const fn required(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            required: true,
            secret: false,
        }
    }

    /// An optional flag
    pub const fn optional(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            required: false,
            secret: false,
        }
    }

    /// Mark the flag as secret
    pub const fn secret(mut self) -> Self {
        self.secret = true;
        self
    }
}

/// Configuration handed to a snapshot source factory
///
/// # Security
///
/// The Debug implementation does not expose flag values; use
/// [`SourceConfig::redacted`] to get a printable view.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Provider identifier (e.g. "edgeos", "udm-pro")
    pub provider: String,

    /// Provider-specific flags
    #[serde(default)]
    pub flags: BTreeMap<String, String>,
}

impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.flags.keys().map(String::as_str).collect();
        f.debug_struct("SourceConfig")
            .field("provider", &self.provider)
            .field("flags", &names)
            .finish()
    }
}

impl SourceConfig {
    /// Create a configuration for `provider` with no flags
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            flags: BTreeMap::new(),
        }
    }

    /// Set a flag
    pub fn with_flag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.flags.insert(name.into(), value.into());
        self
    }

    /// Get a required flag
    pub fn required(&self, name: &str) -> Result<&str> {
        match self.flags.get(name) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(Error::config(format!(
                "{} requires flag \"{}\"",
                self.provider, name
            ))),
        }
    }

    /// Get an optional flag (empty values count as absent)
    pub fn optional(&self, name: &str) -> Option<&str> {
        self.flags
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Read a boolean flag, falling back to `default` when absent
    pub fn flag_enabled(&self, name: &str, default: bool) -> Result<bool> {
        match self.optional(name) {
            None => Ok(default),
            Some(value) => match value.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(Error::config(format!(
                    "flag \"{}\" expects true or false, got {:?}",
                    name, value
                ))),
            },
        }
    }

    /// Validate the flags against a source's advertised flag set
    ///
    /// Every required flag must be present and non-empty, and every given
    /// flag must be one the source knows about.
    pub fn validate(&self, specs: &[FlagSpec]) -> Result<()> {
        let missing: Vec<&str> = specs
            .iter()
            .filter(|spec| spec.required && self.optional(spec.name).is_none())
            .map(|spec| spec.name)
            .collect();
        if !missing.is_empty() {
            return Err(Error::config(format!(
                "{} is missing required flag(s): {}",
                self.provider,
                missing.join(", ")
            )));
        }

        let unknown: Vec<&str> = self
            .flags
            .keys()
            .filter(|name| !specs.iter().any(|spec| spec.name == name.as_str()))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            return Err(Error::config(format!(
                "{} does not understand flag(s): {}",
                self.provider,
                unknown.join(", ")
            )));
        }

        Ok(())
    }

    /// Flag values with secrets replaced, for logging
    pub fn redacted(&self, specs: &[FlagSpec]) -> BTreeMap<String, String> {
        self.flags
            .iter()
            .map(|(name, value)| {
                let secret = specs.iter().any(|s| s.secret && s.name == name.as_str());
                let shown = if secret {
                    "<REDACTED>".to_string()
                } else {
                    value.clone()
                };
                (name.clone(), shown)
            })
            .collect()
    }
}

/// Table store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Hosts file on disk
    File {
        /// Path to the hosts file
        path: PathBuf,
    },

    /// In-memory table (not persistent)
    Memory,
}

impl StoreConfig {
    /// The platform's system hosts file
    pub fn system() -> Self {
        StoreConfig::File {
            path: PathBuf::from(default_hosts_path()),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::system()
    }
}

/// Location of the system hosts file
pub fn default_hosts_path() -> &'static str {
    if cfg!(windows) {
        r"C:\Windows\System32\drivers\etc\hosts"
    } else {
        "/etc/hosts"
    }
}

/// Base URL for a router `address` flag
///
/// A bare `host[:port]` is reached over HTTPS; an address that already
/// carries a scheme is used as given.
pub fn base_url(address: &str) -> String {
    let address = address.trim().trim_end_matches('/');
    if address.contains("://") {
        address.to_string()
    } else {
        format!("https://{}", address)
    }
}

/// Settings for one update run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Compute and report changes without saving the table
    #[serde(default)]
    pub dry_run: bool,

    /// Naming rules applied to observed hosts
    #[serde(default)]
    pub name_policy: NamePolicy,
}

impl UpdaterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_name_policy(mut self, policy: NamePolicy) -> Self {
        self.name_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPECS: &[FlagSpec] = &[
        FlagSpec::required("address", "router address"),
        FlagSpec::required("password", "router password").secret(),
        FlagSpec::optional("site", "site name"),
    ];

    #[test]
    fn test_validate_reports_all_missing_flags() {
        let config = SourceConfig::new("edgeos").with_flag("address", "");
        let err = config.validate(SPECS).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("address, password"));
    }

    #[test]
    fn test_validate_rejects_unknown_flags() {
        let config = SourceConfig::new("edgeos")
            .with_flag("address", "10.0.0.1")
            .with_flag("password", "hunter2")
            .with_flag("colour", "blue");
        let err = config.validate(SPECS).unwrap_err();
        assert!(err.to_string().contains("colour"));
    }

    #[test]
    fn test_validate_accepts_optional_flags() {
        let config = SourceConfig::new("edgeos")
            .with_flag("address", "10.0.0.1")
            .with_flag("password", "hunter2")
            .with_flag("site", "default");
        assert!(config.validate(SPECS).is_ok());
        assert_eq!(config.optional("site"), Some("default"));
        assert_eq!(config.required("address").unwrap(), "10.0.0.1");
    }

    #[test]
    fn test_secrets_not_exposed() {
        let config = SourceConfig::new("edgeos")
            .with_flag("address", "10.0.0.1")
            .with_flag("password", "secret_password_123");

        let debug_str = format!("{:?}", config);
        assert!(!debug_str.contains("secret_password_123"));
        assert!(debug_str.contains("SourceConfig"));

        let shown = config.redacted(SPECS);
        assert_eq!(shown["password"], "<REDACTED>");
        assert_eq!(shown["address"], "10.0.0.1");
    }

    #[test]
    fn test_flag_enabled() {
        let config = SourceConfig::new("udm-pro")
            .with_flag("verify-tls", "Yes")
            .with_flag("bad", "maybe");
        assert!(config.flag_enabled("verify-tls", false).unwrap());
        assert!(!config.flag_enabled("missing", false).unwrap());
        assert!(config.flag_enabled("bad", false).is_err());
    }

    #[test]
    fn test_store_config_serde() {
        let json = r#"{"type":"file","path":"/tmp/hosts"}"#;
        let config: StoreConfig = serde_json::from_str(json).unwrap();
        match config {
            StoreConfig::File { path } => assert_eq!(path, PathBuf::from("/tmp/hosts")),
            StoreConfig::Memory => panic!("expected file store"),
        }
    }

    #[test]
    fn test_base_url() {
        assert_eq!(base_url("192.168.1.1"), "https://192.168.1.1");
        assert_eq!(base_url("router.lan:8443/"), "https://router.lan:8443");
        assert_eq!(base_url("http://127.0.0.1:8080"), "http://127.0.0.1:8080");
    }
}
