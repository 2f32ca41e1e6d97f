// Copyright (c) 2025 - Cowboy AI, Inc.
//! Backend collections addressed by name

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named collection in the inventory backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Devices,
    Interfaces,
    IpAddresses,
    Prefixes,
    Vlans,
    Tags,
    Sites,
    Manufacturers,
    Platforms,
    DeviceRoles,
    DeviceTypes,
    Locations,
    Cables,
}

impl Collection {
    pub const ALL: [Collection; 13] = [
        Collection::Devices,
        Collection::Interfaces,
        Collection::IpAddresses,
        Collection::Prefixes,
        Collection::Vlans,
        Collection::Tags,
        Collection::Sites,
        Collection::Manufacturers,
        Collection::Platforms,
        Collection::DeviceRoles,
        Collection::DeviceTypes,
        Collection::Locations,
        Collection::Cables,
    ];

    /// Collection name as used in configuration and logs
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Devices => "devices",
            Collection::Interfaces => "interfaces",
            Collection::IpAddresses => "ip_addresses",
            Collection::Prefixes => "prefixes",
            Collection::Vlans => "vlans",
            Collection::Tags => "tags",
            Collection::Sites => "sites",
            Collection::Manufacturers => "manufacturers",
            Collection::Platforms => "platforms",
            Collection::DeviceRoles => "device_roles",
            Collection::DeviceTypes => "device_types",
            Collection::Locations => "locations",
            Collection::Cables => "cables",
        }
    }

    /// REST path below `/api/`
    pub fn api_path(&self) -> &'static str {
        match self {
            Collection::Devices => "dcim/devices",
            Collection::Interfaces => "dcim/interfaces",
            Collection::IpAddresses => "ipam/ip-addresses",
            Collection::Prefixes => "ipam/prefixes",
            Collection::Vlans => "ipam/vlans",
            Collection::Tags => "extras/tags",
            Collection::Sites => "dcim/sites",
            Collection::Manufacturers => "dcim/manufacturers",
            Collection::Platforms => "dcim/platforms",
            Collection::DeviceRoles => "dcim/device-roles",
            Collection::DeviceTypes => "dcim/device-types",
            Collection::Locations => "dcim/locations",
            Collection::Cables => "dcim/cables",
        }
    }

    /// Collection a reference field of a record points into
    pub fn for_reference_field(field: &str) -> Option<Collection> {
        let collection = match field {
            "device" => Collection::Devices,
            "interface" | "lag" => Collection::Interfaces,
            "primary_ip4" => Collection::IpAddresses,
            "untagged_vlan" | "tagged_vlans" => Collection::Vlans,
            "tags" => Collection::Tags,
            "site" => Collection::Sites,
            "manufacturer" => Collection::Manufacturers,
            "platform" => Collection::Platforms,
            "device_role" => Collection::DeviceRoles,
            "device_type" => Collection::DeviceTypes,
            "location" => Collection::Locations,
            _ => return None,
        };
        Some(collection)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_paths_are_unique() {
        let mut paths: Vec<_> = Collection::ALL.iter().map(|c| c.api_path()).collect();
        paths.sort_unstable();
        paths.dedup();
        assert_eq!(paths.len(), Collection::ALL.len());
    }

    #[test]
    fn test_reference_fields() {
        assert_eq!(Collection::for_reference_field("lag"), Some(Collection::Interfaces));
        assert_eq!(Collection::for_reference_field("tagged_vlans"), Some(Collection::Vlans));
        assert_eq!(Collection::for_reference_field("serial_number"), None);
    }
}
