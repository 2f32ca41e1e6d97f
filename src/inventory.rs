// Copyright (c) 2025 - Cowboy AI, Inc.
//! Desired-state inventory for batch reconciliation
//!
//! ```yaml
//! update_existing: false
//! devices:
//!   - name: sw1
//!     use_defaults: true
//!     properties: { site: lab, device_role: access }
//!     primary_interface:
//!       name: GigabitEthernet0/0
//!       properties: { description: uplink }
//!     primary_ipv4: 10.0.0.1/24
//!     make_primary: true
//!     tags: [core]
//!     interfaces:
//!       GigabitEthernet0/1: { description: server }
//! ```
//!
//! Each device is applied on its own: a failure is logged and the run goes on
//! with the next device.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

use crate::domain::{DeviceProperties, InterfaceProperties};
use crate::entity::ReconcileAction;
use crate::errors::{SotError, SotResult};
use crate::session::SotSession;

/// Primary interface of a desired device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesiredInterface {
    pub name: String,
    #[serde(default)]
    pub properties: InterfaceProperties,
}

/// One desired device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesiredDevice {
    pub name: String,
    #[serde(default)]
    pub use_defaults: bool,
    #[serde(default)]
    pub properties: DeviceProperties,
    #[serde(default)]
    pub primary_interface: Option<DesiredInterface>,
    #[serde(default)]
    pub primary_ipv4: Option<String>,
    #[serde(default)]
    pub make_primary: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Further interfaces by name
    #[serde(default)]
    pub interfaces: BTreeMap<String, InterfaceProperties>,
}

/// A list of desired devices
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    /// Update devices that already exist instead of skipping them
    #[serde(default)]
    pub update_existing: bool,
    #[serde(default)]
    pub devices: Vec<DesiredDevice>,
}

/// Devices handled by one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
}

impl Inventory {
    pub fn from_yaml(text: &str) -> SotResult<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> SotResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SotError::Config(format!("could not read {}: {}", path.display(), e)))?;
        Self::from_yaml(&text)
    }

    /// Apply every device in order; outcomes land in the session's log
    pub async fn apply(&self, session: &SotSession) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();
        for desired in &self.devices {
            let name = desired.name.clone();
            match desired.apply(session, self.update_existing).await {
                Some(ReconcileAction::Add) => summary.added.push(name),
                Some(ReconcileAction::Update) => summary.updated.push(name),
                Some(ReconcileAction::Skip) => summary.skipped.push(name),
                None => summary.failed.push(name),
            }
        }
        info!(
            "reconciled {} devices: {} added, {} updated, {} skipped, {} failed",
            self.devices.len(),
            summary.added.len(),
            summary.updated.len(),
            summary.skipped.len(),
            summary.failed.len()
        );
        summary
    }
}

impl DesiredDevice {
    /// `None` when the device itself could not be added or updated
    async fn apply(&self, session: &SotSession, update_existing: bool) -> Option<ReconcileAction> {
        let mut device = session.device(self.name.as_str()).use_defaults(self.use_defaults);

        let action = device.reconcile_action(update_existing).await;
        match action {
            ReconcileAction::Skip => return Some(action),
            ReconcileAction::Add => {
                if let Some(primary) = &self.primary_interface {
                    device = device.primary_interface(primary.name.as_str(), primary.properties.clone());
                }
                if let Some(address) = &self.primary_ipv4 {
                    device = device.primary_ipv4(address.as_str()).make_primary(self.make_primary);
                }
                device.add(self.properties.clone()).await?;
            }
            ReconcileAction::Update => {
                device.update(self.properties.clone()).await?;
            }
        }

        if !self.tags.is_empty() {
            let tags = self.tags.clone();
            if device.tags(tags).add().await.is_none() {
                warn!("tags of {} not applied", self.name);
            }
        }
        for (name, properties) in &self.interfaces {
            let mut interface = device.interface(name.as_str());
            let record = match action {
                ReconcileAction::Update => interface.update(properties.clone()).await,
                _ => interface.add(properties.clone()).await,
            };
            if record.is_none() {
                warn!("interface {} of {} not reconciled", name, self.name);
            }
        }
        Some(action)
    }
}
