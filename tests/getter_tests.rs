// Copyright (c) 2025 - Cowboy AI, Inc.
//! Read-side queries and cache warming

mod fixtures;

use chrono::{TimeZone, Utc};
use cim_sot::backend::{Filter, Operation};
use cim_sot::central::ResolveContext;
use cim_sot::domain::{BackendId, Collection};
use cim_sot::{props, ChangeQuery, DeviceSummary, QuerySource, SotError};
use fixtures::*;
use pretty_assertions::assert_eq;
use serde_json::json;

#[tokio::test]
async fn test_device_by_ip() {
    let f = Fixture::new();
    f.add_device().await;
    f.backend.register_query(
        "query DevicesByCidr",
        json!({"data": {"ip_addresses": [{"primary_ip4_for": {"hostname": DEVICE}}]}}),
    );

    let device = f.session.getter().device_by_ip("10.0.0.1/24").await.unwrap();
    assert_eq!(device.and_then(|d| d.name().map(str::to_string)).as_deref(), Some(DEVICE));
}

#[tokio::test]
async fn test_device_by_unknown_ip() {
    let f = Fixture::new();
    f.backend
        .register_query("query DevicesByCidr", json!({"data": {"ip_addresses": []}}));

    let device = f.session.getter().device_by_ip("192.0.2.0/24").await.unwrap();
    assert!(device.is_none());
    assert_eq!(f.backend.call_count(Operation::Get), 0);
}

#[tokio::test]
async fn test_devices_are_keyed_by_hostname() {
    let f = Fixture::new();
    f.backend.register_query(
        "query DeviceProperties",
        json!({"data": {"devices": [
            {
                "hostname": "sw1",
                "primary_ip4": {"address": "10.0.0.1/24"},
                "device_type": {"model": "c9300"},
                "role": {"name": "access"},
                "platform": {"name": "ios"}
            },
            {"hostname": "sw2", "primary_ip4": null}
        ]}}),
    );

    let devices = f
        .session
        .getter()
        .devices(&Filter::new().eq("site", "s1"))
        .await
        .unwrap();

    assert_eq!(devices.len(), 2);
    assert_eq!(
        devices["sw1"],
        DeviceSummary {
            primary_ip: Some("10.0.0.1/24".to_string()),
            device_type: Some("c9300".to_string()),
            device_role: Some("access".to_string()),
            platform: Some("ios".to_string()),
        }
    );
    assert_eq!(devices["sw2"], DeviceSummary::default());
}

#[tokio::test]
async fn test_devices_by_cidr() {
    let f = Fixture::new();
    f.backend.register_query(
        "query DevicesByCidr",
        json!({"data": {"ip_addresses": [
            {"primary_ip4_for": {"hostname": "sw1", "primary_ip4": {"address": "10.0.0.1/24"}}},
            {"primary_ip4_for": null}
        ]}}),
    );

    let devices = f
        .session
        .getter()
        .devices(&Filter::new().eq("cidr", "10.0.0.0/24"))
        .await
        .unwrap();
    assert_eq!(devices.keys().collect::<Vec<_>>(), vec!["sw1"]);
    assert_eq!(devices["sw1"].primary_ip.as_deref(), Some("10.0.0.1/24"));
}

#[tokio::test]
async fn test_changes_filtered_by_context() {
    let f = Fixture::new();
    f.backend.register_query(
        "query Changes",
        json!({"data": {"object_changes": [
            {"action": "update", "change_context_detail": "job sot-sync run 1"},
            {"action": "create", "change_context_detail": "web ui"},
            {"action": "delete"}
        ]}}),
    );
    let window = ChangeQuery::new()
        .start(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
        .end(Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap());

    let all = f.session.getter().changes(&window).await.unwrap();
    assert_eq!(all.len(), 3);

    let synced = f
        .session
        .getter()
        .changes(&window.context_pattern("sot-sync"))
        .await
        .unwrap();
    assert_eq!(synced, vec![json!({"action": "update", "change_context_detail": "job sot-sync run 1"})]);
}

#[test]
fn test_hldm_returns_raw_response() {
    let f = Fixture::new();
    let response = json!({"data": {"devices": [{"name": "sw1", "interfaces": []}]}});
    f.backend.register_query("query Hldm", response.clone());

    let hldm = tokio_test::block_on(f.session.getter().hldm(DEVICE)).unwrap();
    assert_eq!(hldm, response);
}

#[tokio::test]
async fn test_query_text_and_configured_name() {
    let f = Fixture::new();
    f.backend
        .register_query("{ locations { name } }", json!({"data": {"locations": []}}));

    let raw = f
        .session
        .getter()
        .query(QuerySource::text("query { locations { name } }"), &json!({}))
        .await
        .unwrap();
    assert_eq!(raw["data"]["locations"], json!([]));

    let err = f
        .session
        .getter()
        .query(QuerySource::named("no_such_query"), &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, SotError::UnknownQuery(name) if name == "no_such_query"));
}

#[tokio::test]
async fn test_reference_ids_are_cached() {
    let f = Fixture::new();
    let getter = f.session.getter();

    assert_eq!(getter.site_id("s1").await.unwrap(), f.seeded.site_s1);
    assert_eq!(getter.site_id("s1").await.unwrap(), f.seeded.site_s1);
    assert_eq!(f.backend.calls_to(Operation::Get, Collection::Sites), 1);

    assert_eq!(getter.tag_id("tag-x").await.unwrap(), f.seeded.tag_x);
    assert_eq!(getter.vlan_id(10, Some("A")).await.unwrap(), f.seeded.vlan_10_a);
    assert_eq!(getter.vlan_id(10, Some("site-a")).await.unwrap(), f.seeded.vlan_10_a);
    assert_eq!(getter.vlan_id(10, None).await.unwrap(), f.seeded.vlan_10_global);
    assert!(matches!(getter.site_id("nowhere").await, Err(SotError::Resolution(_))));
}

#[tokio::test]
async fn test_load_cache_avoids_lookups() {
    let f = Fixture::new();
    let site = BackendId::generate();
    let tag = BackendId::generate();
    let vlan = BackendId::generate();
    f.backend.register_query(
        "query AllTags",
        json!({"data": {"tags": [{"id": tag, "name": "Core", "slug": "core"}, {"name": "no-id"}]}}),
    );
    f.backend.register_query(
        "query AllVlansAndSites",
        json!({"data": {
            "vlans": [{"id": vlan, "vid": 100, "site": {"name": "dc1"}}, {"id": BackendId::generate()}],
            "sites": [{"id": site, "name": "dc1"}]
        }}),
    );

    let warmup = f.session.getter().load_cache().await.unwrap();
    assert_eq!((warmup.sites, warmup.vlans, warmup.tags), (1, 1, 1));

    f.backend.reset_calls();
    let mut set = props!({ "site": "dc1", "tags": "core", "untagged_vlan": 100 });
    f.session
        .resolver()
        .resolve(&mut set, &ResolveContext::default())
        .await
        .unwrap();

    assert!(f.backend.calls().is_empty());
    assert_eq!(set.get("site"), Some(&site.to_value()));
    assert_eq!(set.get("untagged_vlan"), Some(&vlan.to_value()));
    assert_eq!(set.get("tags"), Some(&json!([tag.to_string()])));
    assert_eq!(f.session.getter().tag_id("Core").await.unwrap(), tag);
    assert!(f.backend.calls().is_empty());
}
