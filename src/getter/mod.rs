// Copyright (c) 2025 - Cowboy AI, Inc.
//! Read-side reporting
//!
//! The [`Getter`] answers questions about the current state of the SoT without
//! writing anything: single devices by name or IP, device summaries, raw graph
//! queries, the change history and the high level data model of a device.
//! Unlike the entity layer it returns [`SotResult`], since a caller asking a
//! question needs the failure, not a log line.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::backend::{Filter, Record};
use crate::central::CacheKey;
use crate::domain::{BackendId, Collection};
use crate::errors::{SotError, SotResult};
use crate::session::SotSession;

pub mod queries;

/// Filter field used by the built-in device query
const DEFAULT_NAME_FILTER: &str = "name__ie";

/// Where the text of a graph query comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuerySource {
    /// A query configured (or built in) under this name
    Named(String),
    /// Literal query text
    Text(String),
}

impl QuerySource {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

/// Window and context filter over the change history
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// Keep only changes whose context detail contains this text
    pub context_pattern: Option<String>,
}

impl ChangeQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    pub fn end(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    pub fn context_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.context_pattern = Some(pattern.into());
        self
    }

    fn variables(&self) -> Value {
        let mut variables = Map::new();
        if let Some(start) = self.start {
            variables.insert("gt".into(), start.to_rfc3339_opts(SecondsFormat::Secs, true).into());
        }
        if let Some(end) = self.end {
            variables.insert("lt".into(), end.to_rfc3339_opts(SecondsFormat::Secs, true).into());
        }
        Value::Object(variables)
    }
}

/// Summary of one device as reported by the device queries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub primary_ip: Option<String>,
    pub device_type: Option<String>,
    pub device_role: Option<String>,
    pub platform: Option<String>,
}

impl DeviceSummary {
    fn from_value(device: &Value) -> Self {
        Self {
            primary_ip: display_text(device.get("primary_ip4")),
            device_type: display_text(device.get("device_type")),
            device_role: display_text(device.get("device_role").or_else(|| device.get("role"))),
            platform: display_text(device.get("platform")),
        }
    }
}

/// Entries added by [`Getter::load_cache`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheWarmup {
    pub sites: usize,
    pub vlans: usize,
    pub tags: usize,
}

/// Read-only view of the SoT
pub struct Getter<'a> {
    session: &'a SotSession,
    name_filter: Option<String>,
}

impl<'a> Getter<'a> {
    pub fn new(session: &'a SotSession) -> Self {
        Self {
            session,
            name_filter: None,
        }
    }

    /// Match device names with `field` instead of `name__ie` in the next query
    pub fn name_filter(mut self, field: impl Into<String>) -> Self {
        self.name_filter = Some(field.into());
        self
    }

    /// Device by name
    pub async fn device(&self, name: &str) -> SotResult<Option<Record>> {
        debug!("getting device {}", name);
        Ok(self
            .session
            .backend()
            .get(Collection::Devices, &Filter::by_name(name))
            .await?)
    }

    /// Device whose primary IPv4 lies in `cidr`
    pub async fn device_by_ip(&self, cidr: &str) -> SotResult<Option<Record>> {
        let response = self
            .query(
                QuerySource::named("device_properties_by_cidr"),
                &serde_json::json!({ "cidr": cidr }),
            )
            .await?;
        let hostname = data_list(&response, "ip_addresses")?
            .first()
            .and_then(|ip| ip.get("primary_ip4_for"))
            .and_then(|device| device.get("hostname"))
            .and_then(Value::as_str)
            .map(str::to_string);

        match hostname {
            Some(hostname) => self.device(&hostname).await,
            None => {
                debug!("device {} not found in sot", cidr);
                Ok(None)
            }
        }
    }

    /// Summaries of all devices matching `filter`, keyed by hostname
    ///
    /// A `cidr` entry in the filter selects devices by primary address;
    /// every other entry is passed to the device query as a variable.
    pub async fn devices(&self, filter: &Filter) -> SotResult<BTreeMap<String, DeviceSummary>> {
        let variables = filter_variables(filter);
        let by_cidr = filter.get("cidr").is_some();
        let source = if by_cidr {
            QuerySource::named("device_properties_by_cidr")
        } else {
            QuerySource::named("device_properties")
        };
        let response = self.query(source, &variables).await?;

        let devices: Vec<&Value> = if by_cidr {
            data_list(&response, "ip_addresses")?
                .iter()
                .filter_map(|ip| ip.get("primary_ip4_for"))
                .collect()
        } else {
            data_list(&response, "devices")?.iter().collect()
        };

        let summaries: BTreeMap<String, DeviceSummary> = devices
            .into_iter()
            .filter_map(|device| {
                let hostname = device.get("hostname")?.as_str()?;
                Some((hostname.to_string(), DeviceSummary::from_value(device)))
            })
            .collect();
        debug!("got {} devices for {}", summaries.len(), filter);
        Ok(summaries)
    }

    /// Raw list of entities matching `filter`
    pub async fn filter(&self, collection: Collection, filter: &Filter) -> SotResult<Vec<Record>> {
        debug!("getting {} filtered by {}", collection, filter);
        Ok(self.session.backend().filter(collection, filter).await?)
    }

    /// Run a graph query and return the raw response
    pub async fn query(&self, source: QuerySource, variables: &Value) -> SotResult<Value> {
        let mut text = match source {
            QuerySource::Named(name) => self
                .session
                .config()
                .query(&name)
                .map(str::to_string)
                .ok_or(SotError::UnknownQuery(name))?,
            QuerySource::Text(text) => text,
        };
        if let Some(field) = &self.name_filter {
            debug!("using {} instead of {}", field, DEFAULT_NAME_FILTER);
            text = text.replace(DEFAULT_NAME_FILTER, field);
        }
        Ok(self.session.backend().query(&text, variables).await?)
    }

    /// Change history, optionally narrowed by time window and context
    pub async fn changes(&self, changes: &ChangeQuery) -> SotResult<Vec<Value>> {
        let response = self
            .query(QuerySource::named("changes"), &changes.variables())
            .await?;
        let entries = data_list(&response, "object_changes")?;

        let Some(pattern) = changes.context_pattern.as_deref() else {
            return Ok(entries.clone());
        };
        Ok(entries
            .iter()
            .filter(|change| {
                change
                    .get("change_context_detail")
                    .and_then(Value::as_str)
                    .is_some_and(|detail| detail.contains(pattern))
            })
            .cloned()
            .collect())
    }

    /// High level data model of one device
    pub async fn hldm(&self, device: &str) -> SotResult<Value> {
        debug!("getting HLDM of device {} from sot", device);
        self.query(QuerySource::named("hldm"), &serde_json::json!({ "name": device }))
            .await
    }

    /// ID of a site, cached for the session
    pub async fn site_id(&self, name: &str) -> SotResult<BackendId> {
        Ok(self.session.resolver().resolve_site(name).await?)
    }

    /// ID of VLAN `vid` in `site` (global VLAN for `None`), cached for the session
    pub async fn vlan_id(&self, vid: u16, site: Option<&str>) -> SotResult<BackendId> {
        Ok(self.session.resolver().resolve_vlan(vid, site).await?)
    }

    /// ID of a tag, cached for the session
    pub async fn tag_id(&self, name: &str) -> SotResult<BackendId> {
        Ok(self.session.resolver().resolve_tag(name).await?)
    }

    /// Fill the resolution cache with all tags, VLANs and sites
    ///
    /// Entries already in the cache are kept.
    pub async fn load_cache(&self) -> SotResult<CacheWarmup> {
        let cache = self.session.cache();
        let mut warmup = CacheWarmup::default();

        let tags = self
            .query(QuerySource::named("all_tags"), &Value::Object(Map::new()))
            .await?;
        for tag in data_list(&tags, "tags")? {
            let Some(id) = entry_id(tag) else { continue };
            for key in ["name", "slug"] {
                if let Some(text) = tag.get(key).and_then(Value::as_str) {
                    cache.insert(CacheKey::tag(text), id);
                }
            }
            warmup.tags += 1;
        }

        let inventory = self
            .query(QuerySource::named("all_vlans_and_sites"), &Value::Object(Map::new()))
            .await?;
        for vlan in data_list(&inventory, "vlans")? {
            let Some(id) = entry_id(vlan) else { continue };
            let Some(vid) = vlan
                .get("vid")
                .and_then(Value::as_u64)
                .and_then(|vid| u16::try_from(vid).ok())
            else {
                warn!("skipping vlan {} without a valid vid", id);
                continue;
            };
            let site = vlan
                .get("site")
                .and_then(|site| site.get("name"))
                .and_then(Value::as_str);
            cache.insert(CacheKey::vlan(vid, site), id);
            warmup.vlans += 1;
        }
        for site in data_list(&inventory, "sites")? {
            let Some(id) = entry_id(site) else { continue };
            if let Some(name) = site.get("name").and_then(Value::as_str) {
                cache.insert(CacheKey::site(name), id);
                warmup.sites += 1;
            }
        }

        info!(
            "cache loaded: {} sites, {} vlans, {} tags",
            warmup.sites, warmup.vlans, warmup.tags
        );
        Ok(warmup)
    }
}

/// `data.<field>` of a graph response, which must be a list
fn data_list<'v>(response: &'v Value, field: &str) -> SotResult<&'v Vec<Value>> {
    response
        .get("data")
        .and_then(|data| data.get(field))
        .and_then(Value::as_array)
        .ok_or_else(|| SotError::UnexpectedResponse(format!("missing data.{}", field)))
}

fn entry_id(entry: &Value) -> Option<BackendId> {
    let id = entry.get("id").and_then(BackendId::from_value);
    if id.is_none() {
        warn!("skipping entry without a valid id: {}", entry);
    }
    id
}

/// Graph variables from a filter; every value is passed as a one-element list
fn filter_variables(filter: &Filter) -> Value {
    let variables: Map<String, Value> = filter
        .pairs()
        .map(|(key, value)| (key.to_string(), Value::Array(vec![value.into()])))
        .collect();
    Value::Object(variables)
}

/// Human readable text of a nested reference (`{"name": ..}`, `{"address": ..}`)
fn display_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) => Some(text.clone()),
        Value::Object(map) => ["address", "name", "model", "slug", "display"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, MemoryBackend, Operation};
    use crate::config::SotConfig;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn session() -> (Arc<MemoryBackend>, SotSession) {
        let backend = Arc::new(MemoryBackend::new());
        let session = SotSession::new(backend.clone(), SotConfig::default());
        (backend, session)
    }

    #[test]
    fn test_display_text() {
        assert_eq!(display_text(Some(&json!("ios"))), Some("ios".to_string()));
        assert_eq!(
            display_text(Some(&json!({"address": "10.0.0.1/24"}))),
            Some("10.0.0.1/24".to_string())
        );
        assert_eq!(display_text(Some(&json!({"model": "c9300"}))), Some("c9300".to_string()));
        assert_eq!(display_text(Some(&Value::Null)), None);
        assert_eq!(display_text(None), None);
    }

    #[test]
    fn test_change_window_variables() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let query = ChangeQuery::new().start(start);
        assert_eq!(query.variables(), json!({"gt": "2024-01-01T00:00:00Z"}));
        assert_eq!(ChangeQuery::new().variables(), json!({}));
    }

    #[tokio::test]
    async fn test_unknown_named_query() {
        let (_, session) = session();
        let result = session
            .getter()
            .query(QuerySource::named("nope"), &json!({}))
            .await;
        assert!(matches!(result, Err(SotError::UnknownQuery(name)) if name == "nope"));
    }

    #[tokio::test]
    async fn test_name_filter_rewrites_query() {
        let (backend, session) = session();
        backend.register_query("name__re", json!({"data": {"devices": []}}));

        let devices = session
            .getter()
            .name_filter("name__re")
            .devices(&Filter::new().eq("name", "lab-.*"))
            .await
            .unwrap();
        assert!(devices.is_empty());
    }

    #[tokio::test]
    async fn test_backend_failure_is_returned() {
        let (backend, session) = session();
        backend.fail_on(
            Operation::Get,
            Some(Collection::Devices),
            BackendError::Transport("refused".into()),
        );
        let result = session.getter().device("sw1").await;
        assert!(matches!(result, Err(SotError::Backend(BackendError::Transport(_)))));
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let (backend, session) = session();
        backend.register_query("Hldm", json!({"errors": []}));
        assert!(session.getter().hldm("sw1").await.is_ok());

        let result = session.getter().changes(&ChangeQuery::new()).await;
        assert!(matches!(result, Err(SotError::Backend(BackendError::Query(_)))));

        backend.register_query("Changes", json!({"data": {}}));
        let result = session.getter().changes(&ChangeQuery::new()).await;
        assert!(matches!(result, Err(SotError::UnexpectedResponse(_))));
    }
}
