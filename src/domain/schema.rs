// Copyright (c) 2025 - Cowboy AI, Inc.
//! Typed property schemas per entity kind
//!
//! Devices and interfaces have mandatory attributes. Their schemas name those
//! attributes explicitly and keep everything else in a flattened
//! [`PropertySet`], so a desired state can be validated before any network call
//! and still carry arbitrary backend fields (custom fields, comments, ...).

use serde::{Deserialize, Serialize};

use crate::domain::invariants::{
    clean_serial_number, ensure_mandatory, ValidationResult, DEVICE_MANDATORY, INTERFACE_MANDATORY,
};
use crate::domain::PropertySet;

/// Default table for mandatory device attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceDefaults {
    pub device_type: String,
    pub device_role: String,
    pub platform: String,
    pub site: String,
    pub status: String,
}

impl Default for DeviceDefaults {
    fn default() -> Self {
        Self {
            device_type: "default-type".to_string(),
            device_role: "default-role".to_string(),
            platform: "ios".to_string(),
            site: "default-site".to_string(),
            status: "active".to_string(),
        }
    }
}

impl DeviceDefaults {
    pub fn to_properties(&self) -> PropertySet {
        PropertySet::new()
            .with("device_type", self.device_type.as_str())
            .with("device_role", self.device_role.as_str())
            .with("platform", self.platform.as_str())
            .with("site", self.site.as_str())
            .with("status", self.status.as_str())
    }
}

/// Default table for mandatory interface attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterfaceDefaults {
    pub description: String,
    pub status: String,
    #[serde(rename = "type")]
    pub interface_type: String,
}

impl Default for InterfaceDefaults {
    fn default() -> Self {
        Self {
            description: String::new(),
            status: "active".to_string(),
            interface_type: "1000base-t".to_string(),
        }
    }
}

impl InterfaceDefaults {
    pub fn to_properties(&self) -> PropertySet {
        PropertySet::new()
            .with("description", self.description.as_str())
            .with("status", self.status.as_str())
            .with("type", self.interface_type.as_str())
    }
}

/// Desired state of a device
///
/// # Examples
///
/// ```rust
/// use cim_sot::domain::{DeviceDefaults, DeviceProperties};
///
/// let props = DeviceProperties::new()
///     .device_type("c9300-48p")
///     .device_role("access")
///     .platform("ios")
///     .site("lab")
///     .status("active");
/// assert!(props.validate(None).is_ok());
///
/// // Missing mandatory fields are rejected unless defaults are supplied
/// assert!(DeviceProperties::new().validate(None).is_err());
/// assert!(DeviceProperties::new().validate(Some(&DeviceDefaults::default())).is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    /// Any further backend field
    #[serde(flatten)]
    pub extra: PropertySet,
}

impl DeviceProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn device_type(mut self, value: impl Into<String>) -> Self {
        self.device_type = Some(value.into());
        self
    }

    pub fn device_role(mut self, value: impl Into<String>) -> Self {
        self.device_role = Some(value.into());
        self
    }

    pub fn platform(mut self, value: impl Into<String>) -> Self {
        self.platform = Some(value.into());
        self
    }

    pub fn site(mut self, value: impl Into<String>) -> Self {
        self.site = Some(value.into());
        self
    }

    pub fn status(mut self, value: impl Into<String>) -> Self {
        self.status = Some(value.into());
        self
    }

    pub fn serial_number(mut self, value: impl Into<String>) -> Self {
        self.serial_number = Some(value.into());
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key, value);
        self
    }

    /// Flatten into a property set without checking mandatory attributes
    pub fn into_properties(self) -> PropertySet {
        let mut set = self.extra;
        let typed = [
            ("device_type", self.device_type),
            ("device_role", self.device_role),
            ("platform", self.platform),
            ("site", self.site),
            ("status", self.status),
        ];
        for (key, value) in typed {
            if let Some(value) = value {
                set.insert(key, value);
            }
        }
        if let Some(serial) = self.serial_number {
            set.insert("serial_number", clean_serial_number(&serial));
        }
        set
    }

    /// Flatten and enforce the mandatory attributes
    pub fn validate(self, defaults: Option<&DeviceDefaults>) -> ValidationResult<PropertySet> {
        let mut set = self.into_properties();
        let defaults = defaults.map(DeviceDefaults::to_properties);
        ensure_mandatory("device", &mut set, &DEVICE_MANDATORY, defaults.as_ref())?;
        Ok(set)
    }
}

impl From<PropertySet> for DeviceProperties {
    fn from(mut set: PropertySet) -> Self {
        let mut take = |key: &str| {
            let value = set.get_text(key);
            if value.is_some() {
                set.remove(key);
            }
            value
        };
        Self {
            device_type: take("device_type"),
            device_role: take("device_role"),
            platform: take("platform"),
            site: take("site"),
            status: take("status"),
            serial_number: take("serial_number"),
            extra: set,
        }
    }
}

/// Desired state of an interface
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterfaceProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub interface_type: Option<String>,
    #[serde(flatten)]
    pub extra: PropertySet,
}

impl InterfaceProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn description(mut self, value: impl Into<String>) -> Self {
        self.description = Some(value.into());
        self
    }

    pub fn status(mut self, value: impl Into<String>) -> Self {
        self.status = Some(value.into());
        self
    }

    pub fn interface_type(mut self, value: impl Into<String>) -> Self {
        self.interface_type = Some(value.into());
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key, value);
        self
    }

    pub fn into_properties(self) -> PropertySet {
        let mut set = self.extra;
        if let Some(description) = self.description {
            set.insert("description", description);
        }
        if let Some(status) = self.status {
            set.insert("status", status);
        }
        if let Some(interface_type) = self.interface_type {
            set.insert("type", interface_type);
        }
        set
    }

    pub fn validate(self, defaults: Option<&InterfaceDefaults>) -> ValidationResult<PropertySet> {
        let mut set = self.into_properties();
        let defaults = defaults.map(InterfaceDefaults::to_properties);
        ensure_mandatory("interface", &mut set, &INTERFACE_MANDATORY, defaults.as_ref())?;
        Ok(set)
    }
}

impl From<PropertySet> for InterfaceProperties {
    fn from(mut set: PropertySet) -> Self {
        let mut take = |key: &str| {
            let value = set.get_text(key);
            if value.is_some() {
                set.remove(key);
            }
            value
        };
        Self {
            description: take("description"),
            status: take("status"),
            interface_type: take("type"),
            extra: set,
        }
    }
}
