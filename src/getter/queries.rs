// Copyright (c) 2025 - Cowboy AI, Inc.
//! Built-in named graph queries
//!
//! A configuration may replace any of these by defining a query with the same
//! name. Operation names are kept distinct so responses can be told apart in
//! logs.

pub const ALL_TAGS: &str = r#"query AllTags {
  tags {
    id
    name
    slug
    content_types {
      id
      app_label
      model
    }
  }
}"#;

pub const ALL_VLANS_AND_SITES: &str = r#"query AllVlansAndSites {
  vlans {
    id
    vid
    name
    site {
      id
      name
    }
  }
  sites {
    id
    name
    slug
  }
}"#;

pub const DEVICE_PROPERTIES: &str = r#"query DeviceProperties($name: [String], $site: [String], $role: [String], $platform: [String]) {
  devices(name__ie: $name, site: $site, role: $role, platform: $platform) {
    hostname: name
    primary_ip4 {
      address
    }
    device_type {
      model
    }
    device_role {
      name
    }
    platform {
      name
    }
  }
}"#;

pub const DEVICE_PROPERTIES_BY_CIDR: &str = r#"query DevicesByCidr($cidr: [String]) {
  ip_addresses(parent: $cidr) {
    address
    primary_ip4_for {
      hostname: name
      primary_ip4 {
        address
      }
      device_type {
        model
      }
      device_role {
        name
      }
      platform {
        name
      }
    }
  }
}"#;

pub const CHANGES: &str = r#"query Changes($gt: [String], $lt: [String]) {
  object_changes(time__gt: $gt, time__lt: $lt) {
    action
    user_name
    object_repr
    change_context
    change_context_detail
    changed_object_type {
      model
    }
    object_data
    time
  }
}"#;

pub const HLDM: &str = r#"query Hldm($name: [String]) {
  devices(name: $name) {
    name
    serial
    asset_tag
    status {
      name
    }
    device_role {
      name
    }
    device_type {
      model
      manufacturer {
        name
      }
    }
    platform {
      name
    }
    site {
      name
    }
    primary_ip4 {
      address
    }
    tags {
      name
    }
    interfaces {
      name
      description
      enabled
      type
      mode
      status {
        name
      }
      ip_addresses {
        address
      }
      untagged_vlan {
        vid
        name
      }
      tagged_vlans {
        vid
        name
      }
      tags {
        name
      }
    }
    config_context
  }
}"#;

/// Name and text of every built-in query
pub const BUILTIN: &[(&str, &str)] = &[
    ("all_tags", ALL_TAGS),
    ("all_vlans_and_sites", ALL_VLANS_AND_SITES),
    ("device_properties", DEVICE_PROPERTIES),
    ("device_properties_by_cidr", DEVICE_PROPERTIES_BY_CIDR),
    ("changes", CHANGES),
    ("hldm", HLDM),
];
