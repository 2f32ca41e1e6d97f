// Copyright (c) 2025 - Cowboy AI, Inc.
//! DeviceEntity - one network device
//!
//! # Adding a Device
//!
//! ```text
//! validate mandatory attributes (defaults when enabled) ── fail → no backend call
//!     ↓
//! upsert device
//!     ↓ (primary interface staged)
//! upsert interface ── fail → stop, return the device
//!     ↓ (primary IPv4 staged)
//! upsert IP address ── fail → stop, return the device
//!     ↓
//! assign IP to interface
//!     ↓ (make primary)
//! set device.primary_ip4
//! ```
//!
//! Completed steps are never rolled back. Each step records its own outcome,
//! keyed by the device name, so the per-device log tells what is missing.

use async_trait::async_trait;
use tracing::{debug, info};

use super::binding::{Binding, BindingEvent};
use super::interface::InterfaceEntity;
use super::tags::{TagRequest, Taggable};
use crate::backend::{Filter, Record};
use crate::central::{ExistingPolicy, Lookup, ResolveContext, WriteOptions};
use crate::domain::invariants::validate_key;
use crate::domain::{
    Collection, DeviceProperties, EntityRef, InterfaceProperties, JobContext, PropertySet,
};
use crate::session::SotSession;

/// What a batch job should do with a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Not in the SoT yet
    Add,
    /// Present, and updating existing devices is enabled
    Update,
    /// Present (or unknown because the lookup failed); leave it alone
    Skip,
}

/// Primary interface staged for the add workflow
#[derive(Debug, Clone, PartialEq)]
struct PrimaryInterface {
    name: String,
    properties: InterfaceProperties,
}

/// One device, selected by name
pub struct DeviceEntity<'a> {
    session: &'a SotSession,
    name: String,
    use_defaults: bool,
    return_existing: bool,
    primary_interface: Option<PrimaryInterface>,
    primary_ipv4: Option<String>,
    make_primary: bool,
    binding: Binding,
}

impl<'a> DeviceEntity<'a> {
    pub fn new(session: &'a SotSession, name: impl Into<String>) -> Self {
        Self {
            session,
            name: name.into(),
            use_defaults: false,
            return_existing: true,
            primary_interface: None,
            primary_ipv4: None,
            make_primary: false,
            binding: Binding::Unbound,
        }
    }

    /// Fill missing mandatory attributes from the default table
    pub fn use_defaults(mut self, use_defaults: bool) -> Self {
        self.use_defaults = use_defaults;
        self
    }

    /// Whether adding an existing device counts as success
    pub fn return_existing(mut self, return_existing: bool) -> Self {
        self.return_existing = return_existing;
        self
    }

    /// Stage a primary interface to create after the device
    pub fn primary_interface(mut self, name: impl Into<String>, properties: InterfaceProperties) -> Self {
        self.primary_interface = Some(PrimaryInterface {
            name: name.into(),
            properties,
        });
        self
    }

    /// Stage the address assigned to the primary interface
    pub fn primary_ipv4(mut self, address: impl Into<String>) -> Self {
        self.primary_ipv4 = Some(address.into());
        self
    }

    /// Make the staged IPv4 the device's primary address
    pub fn make_primary(mut self, make_primary: bool) -> Self {
        self.make_primary = make_primary;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    fn key(&self) -> Filter {
        Filter::by_name(&self.name)
    }

    fn context(&self, job: &str) -> JobContext {
        JobContext::new(job, "Device", &self.name).on_device(&self.name)
    }

    /// Device record, fetched once and then reused
    pub async fn get(&mut self) -> Option<Record> {
        let gateway = self.session.gateway();
        let key = self.key();
        self.binding
            .fetch(&gateway, Collection::Devices, &key, false)
            .await
            .found()
    }

    /// Add the device and run the staged primary interface workflow
    pub async fn add(&mut self, properties: DeviceProperties) -> Option<Record> {
        let gateway = self.session.gateway();
        let ctx = self.context("add device");

        if let Err(err) = validate_key("device", &self.name) {
            gateway.failure(&ctx, err.to_string());
            return None;
        }
        let defaults = self.use_defaults.then_some(&self.session.defaults().device);
        let mut properties = match properties.validate(defaults) {
            Ok(properties) => properties,
            Err(err) => {
                gateway.failure(&ctx, err.to_string());
                return None;
            }
        };
        properties.insert("name", self.name.as_str());

        // an existing device stays bound even when the add is rejected
        let policy = ExistingPolicy::from_flag(self.return_existing);
        let key = self.key();
        let device = match self.binding.fetch(&gateway, Collection::Devices, &key, true).await {
            Lookup::Found(existing) => gateway.report_existing(existing, policy, &ctx)?,
            Lookup::NotFound => {
                let options = WriteOptions::new().existing(policy);
                let created = gateway
                    .upsert(Collection::Devices, properties, &Filter::new(), &options, &ctx)
                    .await;
                self.binding.settle(created.as_ref());
                created?
            }
            Lookup::Failed(err) => {
                gateway.failure(&ctx, format!("Device not added to sot; {}", err));
                return None;
            }
        };

        Some(self.complete_primary(device).await)
    }

    async fn complete_primary(&mut self, device: Record) -> Record {
        let Some(primary) = self.primary_interface.clone() else {
            return device;
        };
        let session = self.session;
        let gateway = session.gateway();
        let ctx = self.context("add device");

        debug!("adding primary interface {} to {}", primary.name, self.name);
        let interface = InterfaceEntity::new(session, self.name.as_str(), primary.name.as_str())
            .with_device(&device)
            .use_defaults(true)
            .return_existing(true)
            .add(primary.properties)
            .await;
        let Some(interface) = interface else {
            gateway.failure(
                &ctx,
                format!("primary interface {} not added; remaining steps skipped", primary.name),
            );
            return device;
        };
        gateway.log().record(ctx.success(format!("primary interface {} added to device", primary.name)));

        let Some(address) = self.primary_ipv4.clone() else {
            debug!("no primary IPv4 staged for {}", self.name);
            return device;
        };
        let ip = session
            .ipam()
            .ipv4(address.as_str())
            .use_defaults(true)
            .return_existing(true)
            .on_device(self.name.as_str())
            .add(PropertySet::new().with("status", "active"))
            .await;
        let Some(ip) = ip else {
            gateway.failure(&ctx, format!("could not add ip address {}", address));
            return device;
        };

        let assigned = session
            .ipam()
            .assign(&interface)
            .on(&device)
            .device_label(self.name.as_str())
            .to(address.as_str())
            .await;
        if assigned.is_none() {
            gateway.failure(
                &ctx,
                format!("could not assign interface {} to ip {}", primary.name, address),
            );
            return device;
        }
        gateway.log().record(ctx.success(format!(
            "primary interface {} assigned to IP {}",
            primary.name, address
        )));

        if !self.make_primary {
            return device;
        }
        let ctx = JobContext::new("make primary", "Primary IP", &self.name).on_device(&self.name);
        let properties = PropertySet::new().with("primary_ip4", ip.id().to_value());
        match gateway
            .update_record(Collection::Devices, device.clone(), &properties, &ctx)
            .await
        {
            Some(updated) => {
                info!("{} is now primary on {}", address, self.name);
                self.binding.apply(BindingEvent::Fetched(updated.clone()));
                updated
            }
            None => device,
        }
    }

    /// Update a device that must already exist
    pub async fn update(&mut self, properties: DeviceProperties) -> Option<Record> {
        let gateway = self.session.gateway();
        let ctx = self.context("update device");
        let key = self.key();

        let record = match self.binding.fetch(&gateway, Collection::Devices, &key, true).await {
            Lookup::Found(record) => record,
            Lookup::NotFound => {
                gateway.failure(&ctx, "Device not found in sot".to_string());
                return None;
            }
            Lookup::Failed(err) => {
                gateway.failure(&ctx, format!("Device not updated in sot; {}", err));
                return None;
            }
        };

        let mut properties = properties.into_properties();
        if !gateway.resolve(&mut properties, &ResolveContext::default(), &ctx).await {
            return None;
        }
        let updated = gateway
            .update_record(Collection::Devices, record, &properties, &ctx)
            .await;
        if let Some(record) = &updated {
            self.binding.apply(BindingEvent::Fetched(record.clone()));
        }
        updated
    }

    /// Delete the device; an absent device yields `None`
    pub async fn delete(&mut self) -> Option<Record> {
        let gateway = self.session.gateway();
        let ctx = self.context("delete device");
        let deleted = gateway.delete(Collection::Devices, &self.key(), &ctx).await;
        if deleted.is_some() {
            self.binding.apply(BindingEvent::Deleted);
        }
        deleted
    }

    /// Start a tag request on the device
    pub fn tags<I, S>(&mut self, names: I) -> TagRequest<'_, Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TagRequest::new(self, names)
    }

    /// Select an interface of this device
    pub fn interface(&self, name: impl Into<String>) -> InterfaceEntity<'a> {
        let interface = InterfaceEntity::new(self.session, self.name.as_str(), name)
            .use_defaults(self.use_defaults)
            .return_existing(self.return_existing);
        match self.binding.record() {
            Some(record) => interface.with_device(record),
            None => interface,
        }
    }

    /// Create `<prefix>/<n>` for every `n` from the index in `first` up to `last`
    ///
    /// Each interface is created from the session's interface defaults. Returns
    /// the records of the interfaces that exist afterwards.
    pub async fn add_interface_range(&mut self, first: &str, last: u32) -> Vec<Record> {
        let gateway = self.session.gateway();
        let ctx = JobContext::new("add interface range", "Interface", first).on_device(&self.name);

        let Some((prefix, start)) = first
            .rsplit_once('/')
            .and_then(|(prefix, index)| index.parse::<u32>().ok().map(|start| (prefix, start)))
        else {
            gateway.failure(&ctx, format!("interface {} has no numeric index", first));
            return Vec::new();
        };

        let Some(device) = self.get().await else {
            gateway.failure(&ctx, "Device not found in sot".to_string());
            return Vec::new();
        };

        let defaults = InterfaceProperties::from(self.session.defaults().interface.to_properties());
        let mut created = Vec::new();
        for index in start..=last {
            let name = format!("{}/{}", prefix, index);
            let interface = InterfaceEntity::new(self.session, self.name.as_str(), name)
                .with_device(&device)
                .use_defaults(self.use_defaults)
                .return_existing(true)
                .add(defaults.clone())
                .await;
            created.extend(interface);
        }
        created
    }

    /// Decide between add, update and skip for a batch job
    pub async fn reconcile_action(&mut self, update_existing: bool) -> ReconcileAction {
        let gateway = self.session.gateway();
        let key = self.key();
        match self.binding.fetch(&gateway, Collection::Devices, &key, true).await {
            Lookup::NotFound => ReconcileAction::Add,
            Lookup::Found(_) if update_existing => {
                info!("device {} found in sot; updating", self.name);
                ReconcileAction::Update
            }
            Lookup::Found(_) => {
                info!("device {} found in sot; skipping", self.name);
                ReconcileAction::Skip
            }
            Lookup::Failed(err) => {
                info!("could not look up {}: {}; skipping", self.name, err);
                ReconcileAction::Skip
            }
        }
    }
}

#[async_trait]
impl Taggable for DeviceEntity<'_> {
    fn session(&self) -> &SotSession {
        self.session
    }

    fn collection(&self) -> Collection {
        Collection::Devices
    }

    fn title(&self) -> &'static str {
        "Device"
    }

    fn tag_context(&self, job: &str) -> JobContext {
        JobContext::new(job, "Tags", &self.name).on_device(&self.name)
    }

    async fn refresh(&mut self) -> Lookup {
        let gateway = self.session.gateway();
        let key = self.key();
        self.binding.fetch(&gateway, Collection::Devices, &key, true).await
    }

    fn settle(&mut self, record: Option<&Record>) {
        self.binding.settle(record);
    }
}

impl From<&DeviceEntity<'_>> for EntityRef {
    fn from(device: &DeviceEntity<'_>) -> Self {
        match device.binding.record() {
            Some(record) => EntityRef::Id(record.id()),
            None => EntityRef::Key(device.name.clone()),
        }
    }
}
