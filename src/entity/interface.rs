// Copyright (c) 2025 - Cowboy AI, Inc.
//! InterfaceEntity - one interface on one device
//!
//! The natural key is (device, interface name). The device may be given by
//! name or by ID; a name is looked up once and the ID kept. VLAN numbers in the
//! interface's properties are looked up within the device's site.

use async_trait::async_trait;
use tracing::debug;

use super::binding::{Binding, BindingEvent};
use super::tags::{TagRequest, Taggable};
use crate::backend::{BackendError, Filter, Record};
use crate::central::{ExistingPolicy, Lookup, ResolveContext, WriteOptions};
use crate::domain::{BackendId, Collection, EntityRef, InterfaceProperties, JobContext, PropertySet};
use crate::session::SotSession;

/// One interface, selected by device and name
pub struct InterfaceEntity<'a> {
    session: &'a SotSession,
    device: EntityRef,
    device_id: Option<BackendId>,
    device_label: String,
    device_site: Option<String>,
    name: String,
    use_defaults: bool,
    return_existing: bool,
    binding: Binding,
}

impl<'a> InterfaceEntity<'a> {
    pub fn new(session: &'a SotSession, device: impl Into<EntityRef>, name: impl Into<String>) -> Self {
        let device = device.into();
        Self {
            session,
            device_id: device.id(),
            device_label: device.to_string(),
            device_site: None,
            device,
            name: name.into(),
            use_defaults: false,
            return_existing: true,
            binding: Binding::Unbound,
        }
    }

    /// Use an already fetched device record
    pub fn with_device(mut self, device: &Record) -> Self {
        self.device_id = Some(device.id());
        self.device_label = device.label();
        self.device_site = site_of(device);
        self
    }

    pub fn use_defaults(mut self, use_defaults: bool) -> Self {
        self.use_defaults = use_defaults;
        self
    }

    pub fn return_existing(mut self, return_existing: bool) -> Self {
        self.return_existing = return_existing;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    fn key(&self, device: BackendId) -> Filter {
        Filter::new().eq("device_id", device).eq("name", &self.name)
    }

    fn context(&self, job: &str) -> JobContext {
        JobContext::new(job, "Interface", &self.name).on_device(&self.device_label)
    }

    /// ID of the owning device; `Err(None)` when the device does not exist
    async fn device_id(&mut self) -> Result<BackendId, Option<BackendError>> {
        if let Some(id) = self.device_id {
            return Ok(id);
        }
        let key = match &self.device {
            EntityRef::Id(id) => Filter::by_id(*id),
            EntityRef::Key(name) => Filter::by_name(name),
        };
        match self.session.gateway().fetch(Collection::Devices, &key).await {
            Lookup::Found(device) => {
                self.device_id = Some(device.id());
                self.device_site = site_of(&device);
                Ok(device.id())
            }
            Lookup::NotFound => Err(None),
            Lookup::Failed(err) => Err(Some(err)),
        }
    }

    async fn device_or_log(&mut self, ctx: &JobContext) -> Option<BackendId> {
        match self.device_id().await {
            Ok(id) => Some(id),
            Err(err) => {
                let line = match err {
                    None => format!("Device {} not found in sot", self.device_label),
                    Some(err) => format!("could not look up device {}; {}", self.device_label, err),
                };
                self.session.gateway().failure(ctx, line);
                None
            }
        }
    }

    /// Name and owning device, plus defaults and mandatory checks on add
    ///
    /// Updates never take defaults: the interface already has its values and
    /// a default would overwrite them.
    async fn prepare(
        &mut self,
        properties: InterfaceProperties,
        enforce_mandatory: bool,
        ctx: &JobContext,
    ) -> Option<(PropertySet, BackendId)> {
        let device = self.device_or_log(ctx).await?;
        let defaults = self.use_defaults.then_some(&self.session.defaults().interface);

        let mut set = if enforce_mandatory {
            match properties.validate(defaults) {
                Ok(set) => set,
                Err(err) => {
                    self.session.gateway().failure(ctx, err.to_string());
                    return None;
                }
            }
        } else {
            properties.into_properties()
        };
        set.insert("name", self.name.as_str());
        set.insert("device", device.to_value());
        Some((set, device))
    }

    fn write_options(&self, device: BackendId) -> WriteOptions {
        WriteOptions::new()
            .existing(ExistingPolicy::from_flag(self.return_existing))
            .context(ResolveContext::for_device(device).with_site(self.device_site.clone()))
    }

    /// Interface record, fetched once and then reused
    pub async fn get(&mut self) -> Option<Record> {
        let device = self.device_id().await.ok()?;
        let gateway = self.session.gateway();
        let key = self.key(device);
        self.binding
            .fetch(&gateway, Collection::Interfaces, &key, false)
            .await
            .found()
    }

    pub async fn add(&mut self, properties: InterfaceProperties) -> Option<Record> {
        let ctx = self.context("add interface");
        let (set, device) = self.prepare(properties, true, &ctx).await?;

        let gateway = self.session.gateway();
        let record = gateway
            .upsert(Collection::Interfaces, set, &self.key(device), &self.write_options(device), &ctx)
            .await;
        self.binding.settle(record.as_ref());
        record
    }

    pub async fn update(&mut self, properties: InterfaceProperties) -> Option<Record> {
        let ctx = self.context("update interface");
        let (set, device) = self.prepare(properties, false, &ctx).await?;

        let gateway = self.session.gateway();
        let record = gateway
            .update(Collection::Interfaces, set, &self.key(device), &self.write_options(device), &ctx)
            .await;
        if let Some(record) = &record {
            self.binding.apply(BindingEvent::Fetched(record.clone()));
        }
        record
    }

    pub async fn delete(&mut self) -> Option<Record> {
        let ctx = self.context("delete interface");
        let device = self.device_or_log(&ctx).await?;

        let deleted = self
            .session
            .gateway()
            .delete(Collection::Interfaces, &self.key(device), &ctx)
            .await;
        if deleted.is_some() {
            self.binding.apply(BindingEvent::Deleted);
        }
        deleted
    }

    pub fn tags<I, S>(&mut self, names: I) -> TagRequest<'_, Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TagRequest::new(self, names)
    }

    /// Cable this interface to `interface` on `device`
    pub async fn connect_to(&mut self, device: impl Into<EntityRef>, interface: &str) -> Option<Record> {
        let mut peer = InterfaceEntity::new(self.session, device, interface);
        let target = format!(
            "{}/{} -> {}/{}",
            self.device_label, self.name, peer.device_label, peer.name
        );
        let ctx = JobContext::new("connect interface", "Cable", target).on_device(&self.device_label);
        let gateway = self.session.gateway();

        let Some(side_a) = self.get().await else {
            gateway.failure(&ctx, format!("Interface {} not found in sot", self.name));
            return None;
        };
        let Some(side_b) = peer.get().await else {
            gateway.failure(
                &ctx,
                format!("Interface {}/{} not found in sot", peer.device_label, peer.name),
            );
            return None;
        };

        debug!("connecting {} to {}", side_a, side_b);
        let cable = PropertySet::new()
            .with("termination_a_type", "dcim.interface")
            .with("termination_a_id", side_a.id().to_string())
            .with("termination_b_type", "dcim.interface")
            .with("termination_b_id", side_b.id().to_string())
            .with("type", "cat5e")
            .with("status", "connected");
        gateway
            .upsert(
                Collection::Cables,
                cable,
                &Filter::new(),
                &WriteOptions::new().without_resolution(),
                &ctx,
            )
            .await
    }
}

/// Site that scopes VLAN lookups for the device's interfaces
///
/// A record updated in place holds the site as a bare ID; the resolver accepts
/// either form.
fn site_of(device: &Record) -> Option<String> {
    device
        .reference_name("site")
        .or_else(|| device.reference_id("site").map(|id| id.to_string()))
}

#[async_trait]
impl Taggable for InterfaceEntity<'_> {
    fn session(&self) -> &SotSession {
        self.session
    }

    fn collection(&self) -> Collection {
        Collection::Interfaces
    }

    fn title(&self) -> &'static str {
        "Interface"
    }

    fn tag_context(&self, job: &str) -> JobContext {
        JobContext::new(job, "Tags", &self.name).on_device(&self.device_label)
    }

    async fn refresh(&mut self) -> Lookup {
        let device = match self.device_id().await {
            Ok(device) => device,
            Err(None) => return Lookup::NotFound,
            Err(Some(err)) => return Lookup::Failed(err),
        };
        let gateway = self.session.gateway();
        let key = self.key(device);
        self.binding.fetch(&gateway, Collection::Interfaces, &key, true).await
    }

    fn settle(&mut self, record: Option<&Record>) {
        self.binding.settle(record);
    }
}
