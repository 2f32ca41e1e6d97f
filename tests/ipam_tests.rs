// Copyright (c) 2025 - Cowboy AI, Inc.
//! IPAM tests: addresses, prefixes, VLANs and assignment

mod fixtures;

use cim_sot::backend::{BackendError, Operation};
use cim_sot::config::SotConfig;
use cim_sot::domain::Collection;
use cim_sot::PropertySet;
use fixtures::*;
use pretty_assertions::assert_eq;

#[tokio::test]
async fn test_add_ip_with_empty_properties_is_active() {
    let f = Fixture::new();
    let ip = f
        .session
        .ipam()
        .ipv4("192.0.2.10/24")
        .add(PropertySet::new())
        .await
        .unwrap();

    assert_eq!(ip.text("address").as_deref(), Some("192.0.2.10/24"));
    assert_eq!(ip.text("status").as_deref(), Some("active"));
    assert_eq!(f.log_lines(), vec!["IP added to sot"]);
}

#[tokio::test]
async fn test_add_existing_ip() {
    let f = Fixture::new();
    let ipam = f.session.ipam();
    let first = ipam.ipv4("192.0.2.10/24").add(PropertySet::new()).await.unwrap();

    let again = ipam.ipv4("192.0.2.10/24").add(PropertySet::new()).await;
    assert_eq!(again.map(|r| r.id()), Some(first.id()));

    let rejected = ipam
        .ipv4("192.0.2.10/24")
        .return_existing(false)
        .add(PropertySet::new())
        .await;
    assert!(rejected.is_none());
    assert_eq!(f.backend.records(Collection::IpAddresses).len(), 1);
}

#[tokio::test]
async fn test_ip_outcome_is_keyed_by_device() {
    let f = Fixture::new();
    f.session
        .ipam()
        .ipv4("192.0.2.10/24")
        .on_device(DEVICE)
        .add(PropertySet::new())
        .await
        .unwrap();

    assert_eq!(f.session.log().for_device(DEVICE).len(), 1);
}

#[tokio::test]
async fn test_update_and_delete_ip() {
    let f = Fixture::new();
    let ipam = f.session.ipam();
    ipam.ipv4("192.0.2.10/24").add(PropertySet::new()).await.unwrap();

    let updated = ipam
        .ipv4("192.0.2.10/24")
        .update(PropertySet::new().with("dns_name", "sw1.lab"))
        .await
        .unwrap();
    assert_eq!(updated.text("dns_name").as_deref(), Some("sw1.lab"));

    let mut ip = ipam.ipv4("192.0.2.10/24");
    assert!(ip.delete().await.is_some());
    assert!(ip.binding().is_absent());
    assert!(ipam.ipv4("192.0.2.10/24").get().await.is_none());
    assert_eq!(
        f.log_lines(),
        vec!["IP added to sot", "IP updated in sot", "IP deleted in sot"]
    );
}

#[tokio::test]
async fn test_prefix_defaults_never_override_explicit_values() {
    let config = SotConfig::from_yaml(
        r#"
defaults:
  prefix:
    status: active
    description: from-defaults
"#,
    )
    .unwrap();
    let f = Fixture::with_config(config);

    let prefix = f
        .session
        .ipam()
        .prefix("192.0.2.0/24")
        .use_defaults(true)
        .add(PropertySet::new().with("status", "reserved"))
        .await
        .unwrap();

    assert_eq!(prefix.text("prefix").as_deref(), Some("192.0.2.0/24"));
    assert_eq!(prefix.text("status").as_deref(), Some("reserved"));
    assert_eq!(prefix.text("description").as_deref(), Some("from-defaults"));
    assert_eq!(f.log_lines(), vec!["Prefix added to sot"]);
}

#[tokio::test]
async fn test_prefix_without_defaults_keeps_properties() {
    let f = Fixture::new();
    let prefix = f
        .session
        .ipam()
        .prefix("198.51.100.0/24")
        .add(PropertySet::new().with("description", "lab"))
        .await
        .unwrap();

    assert_eq!(prefix.text("description").as_deref(), Some("lab"));
    assert!(prefix.is_unset("status"));
}

#[tokio::test]
async fn test_add_vlan_in_site() {
    let f = Fixture::new();
    let vlan = f
        .session
        .ipam()
        .vlan(30)
        .site("s1")
        .add(PropertySet::new())
        .await
        .unwrap();

    assert_eq!(vlan.text("name").as_deref(), Some("vlan-30"));
    assert_eq!(vlan.text("vid").as_deref(), Some("30"));
    assert_eq!(vlan.reference_id("site"), Some(f.seeded.site_s1));

    let again = f
        .session
        .ipam()
        .vlan(30)
        .site("s1")
        .add(PropertySet::new().with("name", "other"))
        .await
        .unwrap();
    assert_eq!(again.id(), vlan.id());
    assert_eq!(f.log_lines(), vec!["VLAN added to sot", "VLAN already in sot"]);
}

#[tokio::test]
async fn test_same_vid_in_another_site_is_a_new_vlan() {
    let f = Fixture::new();
    let vlan = f
        .session
        .ipam()
        .vlan(20)
        .site("A")
        .add(PropertySet::new().with("name", "a-20"))
        .await
        .unwrap();

    assert_ne!(vlan.id(), f.seeded.vlan_20_s1);
    assert_eq!(vlan.reference_id("site"), Some(f.seeded.site_a));
}

#[tokio::test]
async fn test_vlan_lookup_by_site() {
    let f = Fixture::new();
    let ipam = f.session.ipam();

    assert_eq!(ipam.vlan(10).get().await.map(|v| v.id()), Some(f.seeded.vlan_10_global));
    assert_eq!(ipam.vlan(10).site("s1").get().await.map(|v| v.id()), Some(f.seeded.vlan_10_s1));
    assert_eq!(ipam.vlan(10).site("A").get().await.map(|v| v.id()), Some(f.seeded.vlan_10_a));
    assert!(ipam.vlan(20).get().await.is_none());
}

#[tokio::test]
async fn test_update_and_delete_vlan() {
    let f = Fixture::new();
    let ipam = f.session.ipam();

    let updated = ipam
        .vlan(20)
        .site("s1")
        .update(PropertySet::new().with("name", "servers"))
        .await
        .unwrap();
    assert_eq!(updated.id(), f.seeded.vlan_20_s1);
    assert_eq!(updated.text("name").as_deref(), Some("servers"));

    assert!(ipam.vlan(20).site("s1").delete().await.is_some());
    assert!(ipam.vlan(20).site("s1").get().await.is_none());
    assert!(ipam.vlan(20).site("s1").delete().await.is_none());

    assert_eq!(
        f.log_lines(),
        vec!["VLAN updated in sot", "VLAN deleted in sot", "VLAN not found in sot"]
    );
}

#[tokio::test]
async fn test_vlan_lookup_failure() {
    let f = Fixture::new();
    f.backend.fail_on(
        Operation::Filter,
        Some(Collection::Vlans),
        BackendError::Transport("timeout".to_string()),
    );

    let vlan = f.session.ipam().vlan(40).add(PropertySet::new()).await;
    assert!(vlan.is_none());
    assert_eq!(f.backend.call_count(Operation::Create), 0);
    assert_eq!(
        f.log_lines(),
        vec!["VLAN not added to sot; transport error: timeout"]
    );
}

#[tokio::test]
async fn test_assign_existing_ip() {
    let f = Fixture::new();
    let (_, interface) = f.add_device_with_interface("Gi0/1").await;
    f.session.ipam().ipv4("192.0.2.10/24").add(PropertySet::new()).await.unwrap();

    let ip = f
        .session
        .ipam()
        .assign("Gi0/1")
        .on(DEVICE)
        .to("192.0.2.10/24")
        .await
        .unwrap();

    assert_eq!(ip.text("assigned_object_type").as_deref(), Some("dcim.interface"));
    assert_eq!(ip.text("assigned_object_id"), Some(interface.id().to_string()));

    // a second assignment changes nothing and still succeeds
    let again = f.session.ipam().assign(&interface).to("192.0.2.10/24").await;
    assert!(again.is_some());
    assert_eq!(f.log_lines().last().map(String::as_str), Some("IP unchanged in sot"));
}

#[tokio::test]
async fn test_assign_missing_ip() {
    let f = Fixture::new();
    f.add_device_with_interface("Gi0/1").await;

    let missing = f
        .session
        .ipam()
        .assign("Gi0/1")
        .on(DEVICE)
        .to("192.0.2.20/24")
        .await;
    assert!(missing.is_none());
    assert_eq!(f.log_lines().last().map(String::as_str), Some("IP not found in sot"));

    let created = f
        .session
        .ipam()
        .assign("Gi0/1")
        .on(DEVICE)
        .add_missing_ip(true)
        .to("192.0.2.20/24")
        .await
        .unwrap();
    assert_eq!(created.text("description").as_deref(), Some("IP"));
    assert_eq!(created.text("status").as_deref(), Some("active"));
    assert_eq!(f.backend.records(Collection::IpAddresses).len(), 1);
}

#[tokio::test]
async fn test_assign_to_unknown_interface() {
    let f = Fixture::new();
    f.add_device().await;
    f.session.ipam().ipv4("192.0.2.10/24").add(PropertySet::new()).await.unwrap();

    let ip = f
        .session
        .ipam()
        .assign("Gi0/9")
        .on(DEVICE)
        .to("192.0.2.10/24")
        .await;
    assert!(ip.is_none());
    assert_eq!(
        f.log_lines().last().map(String::as_str),
        Some("Interface Gi0/9 not found in sot")
    );
}

#[tokio::test]
async fn test_assign_by_name_needs_a_device() {
    let f = Fixture::new();
    f.session.ipam().ipv4("192.0.2.10/24").add(PropertySet::new()).await.unwrap();

    let ip = f.session.ipam().assign("Gi0/1").to("192.0.2.10/24").await;
    assert!(ip.is_none());
    assert_eq!(
        f.log_lines().last().map(String::as_str),
        Some("no device given for interface Gi0/1")
    );
}
