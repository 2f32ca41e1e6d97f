// Copyright (c) 2025 - Cowboy AI, Inc.
//! Reference Resolution - symbolic fields to backend IDs
//!
//! Rewrites the human-readable fields of a [`PropertySet`] into backend IDs, in
//! place, before the set is written.
//!
//! # Pipeline
//!
//! Steps run in the fixed order of [`PIPELINE`]:
//!
//! ```text
//! primary_ip4 → device → interface → lag
//!   → manufacturer → platform → device_role → device_type → location
//!   → untagged_vlan → tagged_vlans → tags → serial_number → site
//! ```
//!
//! - `device` runs before `interface`/`lag`: interfaces are looked up by
//!   (device ID, name).
//! - `site` runs last: VLAN steps disambiguate VLAN numbers by the site's
//!   name, which is only available while `site` is still unresolved.
//!
//! # Failure Semantics
//!
//! A field that cannot be resolved is left untouched and the pipeline carries
//! on with the remaining fields. The call fails if any field failed, reporting
//! the last error. A failed set must not be written.
//!
//! Values that are already IDs are skipped, so resolving a set twice yields the
//! same IDs.

use serde_json::Value;
use tracing::{debug, warn};

use super::cache::{CacheKey, ResolutionCache};
use crate::backend::{Backend, BackendError, Filter, Record};
use crate::domain::invariants::clean_serial_number;
use crate::domain::{BackendId, Collection, PropertySet};

/// Why a reference could not be resolved
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    /// No entity matches the natural key
    #[error("unknown {kind} \"{key}\"")]
    Unknown { kind: String, key: String },

    /// No VLAN matches both number and site
    #[error("no VLAN {vid} found for site {site}")]
    UnresolvedVlan { vid: u16, site: String },

    /// VLAN entry is not a VLAN number
    #[error("malformed VLAN entry \"{0}\"")]
    MalformedVlan(String),

    /// One of the requested tags is unknown
    #[error("unknown tag \"{tag}\" found in {tags}")]
    UnknownTag { tags: String, tag: String },

    /// Interface lookup without a device to scope it
    #[error("{field} cannot be resolved without a device")]
    MissingDevice { field: String },

    /// Field holds a value of the wrong shape
    #[error("unsupported value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    /// Backend call failed during the lookup
    #[error("lookup of {kind} \"{key}\" failed: {source}")]
    Backend {
        kind: String,
        key: String,
        #[source]
        source: BackendError,
    },
}

/// One named step of the resolution pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStep {
    PrimaryIp4,
    Device,
    Interface,
    Lag,
    Manufacturer,
    Platform,
    DeviceRole,
    DeviceType,
    Location,
    UntaggedVlan,
    TaggedVlans,
    Tags,
    SerialNumber,
    Site,
}

/// Resolution order; see the module documentation for the dependencies
pub const PIPELINE: [ResolutionStep; 14] = [
    ResolutionStep::PrimaryIp4,
    ResolutionStep::Device,
    ResolutionStep::Interface,
    ResolutionStep::Lag,
    ResolutionStep::Manufacturer,
    ResolutionStep::Platform,
    ResolutionStep::DeviceRole,
    ResolutionStep::DeviceType,
    ResolutionStep::Location,
    ResolutionStep::UntaggedVlan,
    ResolutionStep::TaggedVlans,
    ResolutionStep::Tags,
    ResolutionStep::SerialNumber,
    ResolutionStep::Site,
];

impl ResolutionStep {
    /// Property field the step rewrites
    pub fn field(&self) -> &'static str {
        match self {
            ResolutionStep::PrimaryIp4 => "primary_ip4",
            ResolutionStep::Device => "device",
            ResolutionStep::Interface => "interface",
            ResolutionStep::Lag => "lag",
            ResolutionStep::Manufacturer => "manufacturer",
            ResolutionStep::Platform => "platform",
            ResolutionStep::DeviceRole => "device_role",
            ResolutionStep::DeviceType => "device_type",
            ResolutionStep::Location => "location",
            ResolutionStep::UntaggedVlan => "untagged_vlan",
            ResolutionStep::TaggedVlans => "tagged_vlans",
            ResolutionStep::Tags => "tags",
            ResolutionStep::SerialNumber => "serial_number",
            ResolutionStep::Site => "site",
        }
    }

    fn collection(&self) -> Option<Collection> {
        Collection::for_reference_field(self.field())
    }
}

/// Context a property set does not carry itself
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveContext {
    /// Owning device for `interface`/`lag` lookups
    pub device: Option<BackendId>,
    /// Site name for VLAN lookups when the set has no `site` field
    pub site: Option<String>,
}

impl ResolveContext {
    pub fn for_device(device: BackendId) -> Self {
        Self {
            device: Some(device),
            site: None,
        }
    }

    pub fn with_site(mut self, site: Option<String>) -> Self {
        self.site = site;
        self
    }
}

type StepResult = Result<Option<Value>, ResolutionError>;

/// Rewrites symbolic references to backend IDs
#[derive(Clone, Copy)]
pub struct ReferenceResolver<'a> {
    backend: &'a dyn Backend,
    cache: &'a ResolutionCache,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(backend: &'a dyn Backend, cache: &'a ResolutionCache) -> Self {
        Self { backend, cache }
    }

    /// Run the whole pipeline over `properties`
    pub async fn resolve(
        &self,
        properties: &mut PropertySet,
        context: &ResolveContext,
    ) -> Result<(), ResolutionError> {
        let mut last_error = None;

        for step in PIPELINE {
            let field = step.field();
            let Some(value) = properties.get(field).cloned() else {
                continue;
            };
            match self.run_step(step, &value, properties, context).await {
                Ok(Some(resolved)) => {
                    debug!("resolved {} {} -> {}", field, value, resolved);
                    properties.insert(field, resolved);
                }
                Ok(None) => {}
                Err(err) => {
                    warn!("could not resolve {}: {}", field, err);
                    last_error = Some(err);
                }
            }
        }

        match last_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn run_step(
        &self,
        step: ResolutionStep,
        value: &Value,
        properties: &PropertySet,
        context: &ResolveContext,
    ) -> StepResult {
        match step {
            ResolutionStep::PrimaryIp4 => {
                let address = text(step, value)?;
                self.by_filter(step, &address, Filter::new().eq("address", &address))
                    .await
            }
            ResolutionStep::Device => {
                let name = text(step, value)?;
                self.by_filter(step, &name, Filter::by_name(&name)).await
            }
            ResolutionStep::Interface | ResolutionStep::Lag => {
                let name = text(step, value)?;
                if is_id(&name) {
                    return Ok(None);
                }
                let device = properties
                    .get("device")
                    .and_then(BackendId::from_value)
                    .or(context.device)
                    .ok_or_else(|| ResolutionError::MissingDevice {
                        field: step.field().to_string(),
                    })?;
                self.by_filter(step, &name, Filter::by_name(&name).eq("device_id", device))
                    .await
            }
            ResolutionStep::Manufacturer
            | ResolutionStep::Platform
            | ResolutionStep::DeviceRole
            | ResolutionStep::DeviceType
            | ResolutionStep::Location => {
                let key = text(step, value)?;
                if is_id(&key) {
                    return Ok(None);
                }
                let collection = step.collection().ok_or_else(|| invalid(step, value))?;
                let id = self.name_or_slug(collection, step.field(), &key).await?;
                Ok(Some(id.to_value()))
            }
            ResolutionStep::UntaggedVlan => {
                if value.as_str().is_some_and(is_id) {
                    return Ok(None);
                }
                let vid = parse_vid(value)?;
                let site = vlan_site(properties, context);
                let id = self.resolve_vlan(vid, site.as_deref()).await?;
                Ok(Some(id.to_value()))
            }
            ResolutionStep::TaggedVlans => {
                let entries = list_entries(step, value)?;
                let mut ids = Vec::with_capacity(entries.len());
                let site = vlan_site(properties, context);
                for entry in entries {
                    if entry.as_str().is_some_and(is_id) {
                        ids.push(entry);
                        continue;
                    }
                    let vid = parse_vid(&entry)?;
                    ids.push(self.resolve_vlan(vid, site.as_deref()).await?.to_value());
                }
                Ok(Some(Value::Array(ids)))
            }
            ResolutionStep::Tags => {
                let entries = list_entries(step, value)?;
                let mut ids = Vec::with_capacity(entries.len());
                for entry in entries {
                    let name = text(step, &entry)?;
                    if is_id(&name) {
                        ids.push(entry);
                        continue;
                    }
                    let id = self.resolve_tag(&name).await.map_err(|e| match e {
                        ResolutionError::Unknown { key, .. } => ResolutionError::UnknownTag {
                            tags: value.to_string(),
                            tag: key,
                        },
                        other => other,
                    })?;
                    ids.push(id.to_value());
                }
                Ok(Some(Value::Array(ids)))
            }
            ResolutionStep::SerialNumber => {
                let raw = text(step, value)?;
                let cleaned = clean_serial_number(&raw);
                Ok((cleaned != raw).then(|| Value::String(cleaned)))
            }
            ResolutionStep::Site => {
                let name = text(step, value)?;
                if is_id(&name) {
                    return Ok(None);
                }
                Ok(Some(self.resolve_site(&name).await?.to_value()))
            }
        }
    }

    async fn by_filter(&self, step: ResolutionStep, key: &str, filter: Filter) -> StepResult {
        if is_id(key) {
            return Ok(None);
        }
        let collection = step
            .collection()
            .ok_or_else(|| invalid(step, &Value::String(key.to_string())))?;
        match self.backend.get(collection, &filter).await {
            Ok(Some(record)) => Ok(Some(record.id().to_value())),
            Ok(None) => Err(unknown(step.field(), key)),
            Err(source) => Err(ResolutionError::Backend {
                kind: step.field().to_string(),
                key: key.to_string(),
                source,
            }),
        }
    }

    /// Look an entity up by name, falling back to its slug
    async fn name_or_slug(
        &self,
        collection: Collection,
        kind: &str,
        key: &str,
    ) -> Result<BackendId, ResolutionError> {
        let backend_error = |source| ResolutionError::Backend {
            kind: kind.to_string(),
            key: key.to_string(),
            source,
        };
        if let Some(record) = self
            .backend
            .get(collection, &Filter::by_name(key))
            .await
            .map_err(backend_error)?
        {
            return Ok(record.id());
        }
        self.backend
            .get(collection, &Filter::new().eq("slug", key))
            .await
            .map_err(backend_error)?
            .map(|record| record.id())
            .ok_or_else(|| unknown(kind, key))
    }

    /// Site name (or slug) to ID, cached
    pub async fn resolve_site(&self, name: &str) -> Result<BackendId, ResolutionError> {
        let key = CacheKey::site(name);
        if let Some(id) = self.cache.get(&key) {
            debug!("site {} resolved from cache", name);
            return Ok(id);
        }
        let id = self.name_or_slug(Collection::Sites, "site", name).await?;
        Ok(self.cache.insert(key, id))
    }

    /// Tag name to ID, cached
    pub async fn resolve_tag(&self, name: &str) -> Result<BackendId, ResolutionError> {
        let key = CacheKey::tag(name);
        if let Some(id) = self.cache.get(&key) {
            debug!("tag {} resolved from cache", name);
            return Ok(id);
        }
        let id = self.name_or_slug(Collection::Tags, "tag", name).await?;
        Ok(self.cache.insert(key, id))
    }

    /// VLAN number within a site (or the global VLAN when `site` is `None`), cached
    pub async fn resolve_vlan(&self, vid: u16, site: Option<&str>) -> Result<BackendId, ResolutionError> {
        let key = CacheKey::vlan(vid, site);
        if let Some(id) = self.cache.get(&key) {
            debug!("vlan {} resolved from cache", vid);
            return Ok(id);
        }
        let vlan = self
            .find_vlan(vid, site)
            .await?
            .ok_or_else(|| ResolutionError::UnresolvedVlan {
                vid,
                site: site.unwrap_or("<global>").to_string(),
            })?;
        Ok(self.cache.insert(key, vlan.id()))
    }

    /// Find the VLAN with number `vid` belonging to `site`
    ///
    /// Several VLANs may share a number across sites, including a site-less
    /// global one. Candidates are filtered by number and compared by site; the
    /// first match wins. `site` may be a site name, slug or ID; a candidate whose
    /// site name differs is compared by the resolved site ID.
    pub async fn find_vlan(&self, vid: u16, site: Option<&str>) -> Result<Option<Record>, ResolutionError> {
        let candidates = self
            .backend
            .filter(Collection::Vlans, &Filter::new().eq("vid", vid))
            .await
            .map_err(|source| ResolutionError::Backend {
                kind: "vlan".to_string(),
                key: vid.to_string(),
                source,
            })?;

        let Some(site) = site else {
            return Ok(candidates.into_iter().find(|vlan| vlan.is_unset("site")));
        };

        let explicit_id = site.parse::<BackendId>().ok();
        let mut looked_up_id: Option<Option<BackendId>> = None;
        for vlan in candidates {
            if vlan.is_unset("site") {
                continue;
            }
            if let Some(id) = explicit_id {
                if vlan.reference_id("site") == Some(id) {
                    return Ok(Some(vlan));
                }
                continue;
            }
            if vlan.reference_name("site").as_deref() == Some(site) {
                return Ok(Some(vlan));
            }
            // a slug, or a backend that only returned the site's ID
            if looked_up_id.is_none() {
                looked_up_id = Some(self.resolve_site(site).await.ok());
            }
            if let Some(Some(id)) = looked_up_id {
                if vlan.reference_id("site") == Some(id) {
                    return Ok(Some(vlan));
                }
            }
        }
        debug!("no VLAN {} found for site {}", vid, site);
        Ok(None)
    }
}

fn is_id(text: &str) -> bool {
    text.parse::<BackendId>().is_ok()
}

fn unknown(kind: &str, key: &str) -> ResolutionError {
    ResolutionError::Unknown {
        kind: kind.to_string(),
        key: key.to_string(),
    }
}

fn invalid(step: ResolutionStep, value: &Value) -> ResolutionError {
    ResolutionError::InvalidValue {
        field: step.field().to_string(),
        value: value.to_string(),
    }
}

fn text(step: ResolutionStep, value: &Value) -> Result<String, ResolutionError> {
    match value {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(invalid(step, other)),
    }
}

/// Comma-separated string or list; an empty string is an empty list
fn list_entries(step: ResolutionStep, value: &Value) -> Result<Vec<Value>, ResolutionError> {
    match value {
        Value::String(s) => Ok(s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| Value::String(part.to_string()))
            .collect()),
        Value::Array(items) => Ok(items.clone()),
        Value::Number(_) => Ok(vec![value.clone()]),
        Value::Null => Ok(Vec::new()),
        other => Err(invalid(step, other)),
    }
}

fn parse_vid(value: &Value) -> Result<u16, ResolutionError> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|v| u16::try_from(v).ok()),
        Value::String(s) => s.trim().parse::<u16>().ok(),
        _ => None,
    };
    match parsed {
        Some(vid) if (1..=4094).contains(&vid) => Ok(vid),
        _ => Err(ResolutionError::MalformedVlan(match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })),
    }
}

/// Site used to scope VLAN lookups: the set's own (still unresolved) site first
fn vlan_site(properties: &PropertySet, context: &ResolveContext) -> Option<String> {
    properties.get_text("site").or_else(|| context.site.clone())
}
