// Copyright (c) 2025 - Cowboy AI, Inc.
//! Session configuration
//!
//! Loaded from YAML, then overridden from the environment:
//!
//! | Variable | Field |
//! |---|---|
//! | `NAUTOBOT_URL` | `nautobot.url` |
//! | `NAUTOBOT_TOKEN` | `nautobot.token` |
//! | `NAUTOBOT_TIMEOUT_SECS` | `nautobot.timeout_secs` |
//!
//! Every section has defaults, so an empty document is a valid configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::domain::{DeviceDefaults, InterfaceDefaults, PropertySet};
use crate::errors::{SotError, SotResult};
use crate::getter::queries;

/// Connection settings for the inventory backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NautobotConfig {
    /// Base URL (e.g. "http://127.0.0.1:8080")
    #[serde(default = "default_url")]
    pub url: String,

    /// API token for authentication
    #[serde(default)]
    pub token: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for NautobotConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            token: String::new(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Default tables applied when an entity is told to use defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub device: DeviceDefaults,
    pub interface: InterfaceDefaults,
    pub ipv4: PropertySet,
    pub prefix: PropertySet,
    pub vlan: PropertySet,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        let active = PropertySet::new().with("status", "active");
        Self {
            device: DeviceDefaults::default(),
            interface: InterfaceDefaults::default(),
            ipv4: active.clone(),
            prefix: active.clone(),
            vlan: active,
        }
    }
}

/// Complete session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SotConfig {
    #[serde(default)]
    pub nautobot: NautobotConfig,

    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Named graph queries; built-in ones are added for missing names
    #[serde(default)]
    pub queries: BTreeMap<String, String>,
}

impl Default for SotConfig {
    fn default() -> Self {
        let mut config = Self {
            nautobot: NautobotConfig::default(),
            defaults: DefaultsConfig::default(),
            queries: BTreeMap::new(),
        };
        config.add_builtin_queries();
        config
    }
}

impl SotConfig {
    /// Parse a YAML document
    pub fn from_yaml(text: &str) -> SotResult<Self> {
        let mut config: SotConfig = if text.trim().is_empty() {
            SotConfig::default()
        } else {
            serde_yaml::from_str(text)?
        };
        config.add_builtin_queries();
        Ok(config)
    }

    /// Read a YAML file and apply environment overrides
    pub fn load(path: impl AsRef<Path>) -> SotResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SotError::Config(format!("could not read {}: {}", path.display(), e)))?;
        let mut config = Self::from_yaml(&text)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Override connection settings from `NAUTOBOT_*` variables
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("NAUTOBOT_URL") {
            self.nautobot.url = url;
        }
        if let Some(token) = lookup("NAUTOBOT_TOKEN") {
            self.nautobot.token = token;
        }
        if let Some(timeout) = lookup("NAUTOBOT_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            self.nautobot.timeout_secs = timeout;
        }
    }

    pub fn validate(&self) -> SotResult<()> {
        if self.nautobot.url.trim().is_empty() {
            return Err(SotError::Config("nautobot.url must not be empty".to_string()));
        }
        if self.nautobot.timeout_secs == 0 {
            return Err(SotError::Config("nautobot.timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    /// Text of a named query
    pub fn query(&self, name: &str) -> Option<&str> {
        self.queries.get(name).map(String::as_str)
    }

    fn add_builtin_queries(&mut self) {
        for (name, text) in queries::BUILTIN {
            self.queries
                .entry((*name).to_string())
                .or_insert_with(|| (*text).to_string());
        }
    }
}
