// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for cim-sot
//!
//! Seeds a [`MemoryBackend`] with the reference data every workflow needs:
//! the default device table's site/type/role/platform, two more sites, three
//! tags and VLANs that share a number across sites.
//!
//! # Design Principles
//! - Every test gets its own backend and session; nothing is shared
//! - Tests reach seeded records through [`Seeded`], never by re-querying

#![allow(dead_code)]

use serde_json::json;
use std::sync::Arc;

use cim_sot::backend::MemoryBackend;
use cim_sot::config::SotConfig;
use cim_sot::domain::{BackendId, Collection};
use cim_sot::{DeviceProperties, InterfaceProperties, SotSession};

pub const DEVICE: &str = "sw1";
pub const PRIMARY_INTERFACE: &str = "GigabitEthernet0/0";
pub const PRIMARY_IP: &str = "10.0.0.1/24";

/// IDs of the seeded reference data
#[derive(Debug, Clone, Copy)]
pub struct Seeded {
    pub default_site: BackendId,
    pub site_s1: BackendId,
    pub site_a: BackendId,
    pub default_type: BackendId,
    pub c9300: BackendId,
    pub default_role: BackendId,
    pub access_role: BackendId,
    pub ios: BackendId,
    pub tag_a: BackendId,
    pub tag_b: BackendId,
    pub tag_x: BackendId,
    /// VLAN 10 without a site
    pub vlan_10_global: BackendId,
    /// VLAN 10 at site s1
    pub vlan_10_s1: BackendId,
    /// VLAN 20 at site s1
    pub vlan_20_s1: BackendId,
    /// VLAN 10 at site A
    pub vlan_10_a: BackendId,
}

/// Backend, session and seeded IDs of one test
pub struct Fixture {
    pub backend: Arc<MemoryBackend>,
    pub session: SotSession,
    pub seeded: Seeded,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(SotConfig::default())
    }

    pub fn with_config(config: SotConfig) -> Self {
        let backend = Arc::new(MemoryBackend::new());
        let seeded = seed(&backend);
        backend.reset_calls();
        let session = SotSession::new(backend.clone(), config);
        Self {
            backend,
            session,
            seeded,
        }
    }

    /// Log lines of the session, in recording order
    pub fn log_lines(&self) -> Vec<String> {
        self.session
            .log()
            .entries()
            .into_iter()
            .map(|outcome| outcome.log)
            .collect()
    }

    /// Add `sw1` at site s1 through the normal workflow
    pub async fn add_device(&self) -> cim_sot::Record {
        self.session
            .device(DEVICE)
            .add(complete_device())
            .await
            .expect("fixture device must be added")
    }

    /// Add `sw1` and one interface on it
    pub async fn add_device_with_interface(&self, interface: &str) -> (cim_sot::Record, cim_sot::Record) {
        let device = self.add_device().await;
        let interface = self
            .session
            .device(DEVICE)
            .interface(interface)
            .add(complete_interface())
            .await
            .expect("fixture interface must be added");
        (device, interface)
    }
}

/// Device properties with every mandatory attribute set
pub fn complete_device() -> DeviceProperties {
    DeviceProperties::new()
        .device_type("c9300")
        .device_role("access")
        .platform("ios")
        .site("s1")
        .status("active")
}

/// Interface properties with every mandatory attribute set
pub fn complete_interface() -> InterfaceProperties {
    InterfaceProperties::new()
        .description("uplink")
        .status("active")
        .interface_type("1000base-t")
}

fn named(backend: &MemoryBackend, collection: Collection, name: &str, slug: &str) -> BackendId {
    backend
        .seed(collection, json!({"name": name, "slug": slug}))
        .id()
}

/// Seed reference data; references are given as IDs and nested by the backend
pub fn seed(backend: &MemoryBackend) -> Seeded {
    let default_site = named(backend, Collection::Sites, "default-site", "default-site");
    let site_s1 = named(backend, Collection::Sites, "s1", "s1");
    let site_a = named(backend, Collection::Sites, "A", "site-a");

    let vlan = |vid: u16, name: &str, site: Option<BackendId>| {
        let site = site.map(BackendId::to_value).unwrap_or(serde_json::Value::Null);
        backend
            .seed(Collection::Vlans, json!({"vid": vid, "name": name, "site": site}))
            .id()
    };

    Seeded {
        default_site,
        site_s1,
        site_a,
        default_type: named(backend, Collection::DeviceTypes, "default-type", "default-type"),
        c9300: named(backend, Collection::DeviceTypes, "c9300", "c9300"),
        default_role: named(backend, Collection::DeviceRoles, "default-role", "default-role"),
        access_role: named(backend, Collection::DeviceRoles, "access", "access"),
        ios: named(backend, Collection::Platforms, "ios", "cisco-ios"),
        tag_a: named(backend, Collection::Tags, "a", "a"),
        tag_b: named(backend, Collection::Tags, "b", "b"),
        tag_x: named(backend, Collection::Tags, "x", "tag-x"),
        vlan_10_global: vlan(10, "global-10", None),
        vlan_10_s1: vlan(10, "s1-10", Some(site_s1)),
        vlan_20_s1: vlan(20, "s1-20", Some(site_s1)),
        vlan_10_a: vlan(10, "a-10", Some(site_a)),
    }
}
