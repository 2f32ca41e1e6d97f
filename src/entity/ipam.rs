// Copyright (c) 2025 - Cowboy AI, Inc.
//! IPAM - IP addresses, prefixes, VLANs and IP assignment
//!
//! | Entity | Natural key |
//! |---|---|
//! | [`IpAddressEntity`] | address (`10.0.0.1/24`) |
//! | [`PrefixEntity`] | CIDR (`10.0.0.0/24`) |
//! | [`VlanEntity`] | VLAN number + optional site |
//!
//! VLAN numbers repeat across sites, and a site-less VLAN is a global one.
//! VLAN lookups therefore filter by number and pick the candidate whose site
//! matches; see [`ReferenceResolver::find_vlan`](crate::central::ReferenceResolver::find_vlan).
//!
//! # Assignment
//!
//! ```rust,ignore
//! session.ipam()
//!     .assign("GigabitEthernet0/1")
//!     .on("sw1")
//!     .add_missing_ip(true)
//!     .to("10.0.0.1/24")
//!     .await;
//! ```
//!
//! Re-assigning an address that already points at the interface is a
//! successful no-op.

use tracing::{debug, warn};

use super::binding::{Binding, BindingEvent};
use crate::backend::{Filter, Record};
use crate::central::{ExistingPolicy, Lookup, ResolutionError, ResolveContext, WriteOptions};
use crate::domain::{Collection, EntityRef, JobContext, PropertySet};
use crate::session::SotSession;

/// Entry point for IPAM entities
#[derive(Clone, Copy)]
pub struct Ipam<'a> {
    session: &'a SotSession,
}

impl<'a> Ipam<'a> {
    pub fn new(session: &'a SotSession) -> Self {
        Self { session }
    }

    pub fn ipv4(&self, address: impl Into<String>) -> IpAddressEntity<'a> {
        IpAddressEntity {
            session: self.session,
            address: address.into(),
            options: IpamOptions::default(),
            binding: Binding::Unbound,
        }
    }

    pub fn prefix(&self, prefix: impl Into<String>) -> PrefixEntity<'a> {
        PrefixEntity {
            session: self.session,
            prefix: prefix.into(),
            options: IpamOptions::default(),
            binding: Binding::Unbound,
        }
    }

    pub fn vlan(&self, vid: u16) -> VlanEntity<'a> {
        VlanEntity {
            session: self.session,
            vid,
            site: None,
            options: IpamOptions::default(),
            binding: Binding::Unbound,
        }
    }

    /// Start assigning an address to `interface` (a name, or an interface ID)
    pub fn assign(&self, interface: impl Into<EntityRef>) -> Assignment<'a> {
        Assignment {
            session: self.session,
            interface: interface.into(),
            device: None,
            device_label: None,
            add_missing_ip: false,
        }
    }
}

/// Flags shared by the IPAM entities
#[derive(Debug, Clone)]
struct IpamOptions {
    use_defaults: bool,
    return_existing: bool,
    device: Option<String>,
}

impl Default for IpamOptions {
    fn default() -> Self {
        Self {
            use_defaults: false,
            return_existing: true,
            device: None,
        }
    }
}

impl IpamOptions {
    fn context(&self, job: &str, title: &str, target: &str) -> JobContext {
        let ctx = JobContext::new(job, title, target);
        match &self.device {
            Some(device) => ctx.on_device(device),
            None => ctx,
        }
    }

    fn write_options(&self) -> WriteOptions {
        WriteOptions::new().existing(ExistingPolicy::from_flag(self.return_existing))
    }

    /// Caller properties, then `{status: active}` when empty, then defaults
    fn prepare(&self, mut properties: PropertySet, defaults: &PropertySet) -> PropertySet {
        if properties.is_empty() {
            properties.insert("status", "active");
        }
        if self.use_defaults {
            properties.fill_from(defaults);
        }
        properties
    }
}

macro_rules! ipam_builders {
    () => {
        /// Fill missing properties from the session's default table
        pub fn use_defaults(mut self, use_defaults: bool) -> Self {
            self.options.use_defaults = use_defaults;
            self
        }

        /// Whether adding an existing entity counts as success
        pub fn return_existing(mut self, return_existing: bool) -> Self {
            self.options.return_existing = return_existing;
            self
        }

        /// Key outcomes by this device name as well
        pub fn on_device(mut self, device: impl Into<String>) -> Self {
            self.options.device = Some(device.into());
            self
        }

        pub fn binding(&self) -> &Binding {
            &self.binding
        }
    };
}

/// One IP address
pub struct IpAddressEntity<'a> {
    session: &'a SotSession,
    address: String,
    options: IpamOptions,
    binding: Binding,
}

impl<'a> IpAddressEntity<'a> {
    ipam_builders!();

    fn key(&self) -> Filter {
        Filter::new().eq("address", &self.address)
    }

    pub async fn get(&mut self) -> Option<Record> {
        let gateway = self.session.gateway();
        let key = self.key();
        self.binding
            .fetch(&gateway, Collection::IpAddresses, &key, false)
            .await
            .found()
    }

    pub async fn add(&mut self, properties: PropertySet) -> Option<Record> {
        let ctx = self.options.context("add ip address", "IP", &self.address);
        let mut properties = self.options.prepare(properties, &self.session.defaults().ipv4);
        properties.insert("address", self.address.as_str());

        let record = self
            .session
            .gateway()
            .upsert(Collection::IpAddresses, properties, &self.key(), &self.options.write_options(), &ctx)
            .await;
        self.binding.settle(record.as_ref());
        record
    }

    pub async fn update(&mut self, mut properties: PropertySet) -> Option<Record> {
        let ctx = self.options.context("update ip address", "IP", &self.address);
        properties.insert("address", self.address.as_str());

        let record = self
            .session
            .gateway()
            .update(Collection::IpAddresses, properties, &self.key(), &self.options.write_options(), &ctx)
            .await;
        if let Some(record) = &record {
            self.binding.apply(BindingEvent::Fetched(record.clone()));
        }
        record
    }

    pub async fn delete(&mut self) -> Option<Record> {
        let ctx = self.options.context("delete ip address", "IP", &self.address);
        let deleted = self
            .session
            .gateway()
            .delete(Collection::IpAddresses, &self.key(), &ctx)
            .await;
        if deleted.is_some() {
            self.binding.apply(BindingEvent::Deleted);
        }
        deleted
    }
}

/// One prefix
pub struct PrefixEntity<'a> {
    session: &'a SotSession,
    prefix: String,
    options: IpamOptions,
    binding: Binding,
}

impl<'a> PrefixEntity<'a> {
    ipam_builders!();

    fn key(&self) -> Filter {
        Filter::new().eq("prefix", &self.prefix)
    }

    pub async fn get(&mut self) -> Option<Record> {
        let gateway = self.session.gateway();
        let key = self.key();
        self.binding
            .fetch(&gateway, Collection::Prefixes, &key, false)
            .await
            .found()
    }

    pub async fn add(&mut self, properties: PropertySet) -> Option<Record> {
        let ctx = self.options.context("add prefix", "Prefix", &self.prefix);
        let mut properties = self.options.prepare(properties, &self.session.defaults().prefix);
        properties.insert("prefix", self.prefix.as_str());

        let record = self
            .session
            .gateway()
            .upsert(Collection::Prefixes, properties, &self.key(), &self.options.write_options(), &ctx)
            .await;
        self.binding.settle(record.as_ref());
        record
    }

    pub async fn update(&mut self, mut properties: PropertySet) -> Option<Record> {
        let ctx = self.options.context("update prefix", "Prefix", &self.prefix);
        properties.insert("prefix", self.prefix.as_str());

        let record = self
            .session
            .gateway()
            .update(Collection::Prefixes, properties, &self.key(), &self.options.write_options(), &ctx)
            .await;
        if let Some(record) = &record {
            self.binding.apply(BindingEvent::Fetched(record.clone()));
        }
        record
    }

    pub async fn delete(&mut self) -> Option<Record> {
        let ctx = self.options.context("delete prefix", "Prefix", &self.prefix);
        let deleted = self
            .session
            .gateway()
            .delete(Collection::Prefixes, &self.key(), &ctx)
            .await;
        if deleted.is_some() {
            self.binding.apply(BindingEvent::Deleted);
        }
        deleted
    }
}

/// One VLAN, global unless a site is given
pub struct VlanEntity<'a> {
    session: &'a SotSession,
    vid: u16,
    site: Option<String>,
    options: IpamOptions,
    binding: Binding,
}

impl<'a> VlanEntity<'a> {
    ipam_builders!();

    /// Scope the VLAN to a site (name or ID)
    pub fn site(mut self, site: impl Into<String>) -> Self {
        self.site = Some(site.into());
        self
    }

    fn target(&self) -> String {
        match &self.site {
            Some(site) => format!("{}@{}", self.vid, site),
            None => self.vid.to_string(),
        }
    }

    async fn lookup(&mut self, site: Option<&str>) -> Lookup {
        match self.session.resolver().find_vlan(self.vid, site).await {
            Ok(Some(vlan)) => {
                self.binding.apply(BindingEvent::Fetched(vlan.clone()));
                Lookup::Found(vlan)
            }
            Ok(None) => {
                self.binding.apply(BindingEvent::NotFound);
                Lookup::NotFound
            }
            Err(err) => {
                warn!("lookup of VLAN {} failed: {}", self.target(), err);
                match err {
                    ResolutionError::Backend { source, .. } => Lookup::Failed(source),
                    _ => Lookup::NotFound,
                }
            }
        }
    }

    pub async fn get(&mut self) -> Option<Record> {
        if let Some(record) = self.binding.record() {
            return Some(record.clone());
        }
        let site = self.site.clone();
        self.lookup(site.as_deref()).await.found()
    }

    pub async fn add(&mut self, properties: PropertySet) -> Option<Record> {
        let target = self.target();
        let ctx = self.options.context("add vlan", "VLAN", &target);
        let gateway = self.session.gateway();

        let mut properties = self.options.prepare(properties, &self.session.defaults().vlan);
        properties.insert_missing("name", format!("vlan-{}", self.vid));
        properties.insert("vid", self.vid);
        if let Some(site) = &self.site {
            properties.insert_missing("site", site.as_str());
        }
        let site = properties.get_text("site");

        let record = match self.lookup(site.as_deref()).await {
            Lookup::Found(existing) => gateway.report_existing(existing, self.options.write_options().existing, &ctx),
            Lookup::NotFound => {
                let options = self.options.write_options().context(ResolveContext::default().with_site(site));
                gateway
                    .upsert(Collection::Vlans, properties, &Filter::new(), &options, &ctx)
                    .await
            }
            Lookup::Failed(err) => {
                gateway.failure(&ctx, format!("VLAN not added to sot; {}", err));
                None
            }
        };
        self.binding.settle(record.as_ref());
        record
    }

    pub async fn update(&mut self, mut properties: PropertySet) -> Option<Record> {
        let target = self.target();
        let ctx = self.options.context("update vlan", "VLAN", &target);
        let gateway = self.session.gateway();

        let site = self.site.clone();
        let existing = match self.lookup(site.as_deref()).await {
            Lookup::Found(existing) => existing,
            Lookup::NotFound => {
                gateway.failure(&ctx, "VLAN not found in sot".to_string());
                return None;
            }
            Lookup::Failed(err) => {
                gateway.failure(&ctx, format!("VLAN not updated in sot; {}", err));
                return None;
            }
        };

        properties.remove("vid");
        let context = ResolveContext::default().with_site(site);
        if !gateway.resolve(&mut properties, &context, &ctx).await {
            return None;
        }
        let record = gateway
            .update_record(Collection::Vlans, existing, &properties, &ctx)
            .await;
        if let Some(record) = &record {
            self.binding.apply(BindingEvent::Fetched(record.clone()));
        }
        record
    }

    pub async fn delete(&mut self) -> Option<Record> {
        let target = self.target();
        let ctx = self.options.context("delete vlan", "VLAN", &target);
        let gateway = self.session.gateway();

        let site = self.site.clone();
        let existing = match self.lookup(site.as_deref()).await {
            Lookup::Found(existing) => existing,
            Lookup::NotFound => {
                gateway.failure(&ctx, "VLAN not found in sot".to_string());
                return None;
            }
            Lookup::Failed(err) => {
                gateway.failure(&ctx, format!("VLAN not deleted in sot; {}", err));
                return None;
            }
        };

        let deleted = gateway
            .delete(Collection::Vlans, &Filter::by_id(existing.id()), &ctx)
            .await;
        if deleted.is_some() {
            self.binding.apply(BindingEvent::Deleted);
        }
        deleted
    }
}

/// Pending assignment of an IP address to an interface
pub struct Assignment<'a> {
    session: &'a SotSession,
    interface: EntityRef,
    device: Option<EntityRef>,
    device_label: Option<String>,
    add_missing_ip: bool,
}

impl<'a> Assignment<'a> {
    /// Device owning the interface (a name, or a device ID)
    pub fn on(mut self, device: impl Into<EntityRef>) -> Self {
        let device = device.into();
        if let EntityRef::Key(name) = &device {
            self.device_label.get_or_insert_with(|| name.clone());
        }
        self.device = Some(device);
        self
    }

    /// Device name used to key the outcomes
    pub fn device_label(mut self, name: impl Into<String>) -> Self {
        self.device_label = Some(name.into());
        self
    }

    /// Create the address when it is not in the SoT yet
    pub fn add_missing_ip(mut self, add_missing_ip: bool) -> Self {
        self.add_missing_ip = add_missing_ip;
        self
    }

    fn context(&self, address: &str) -> JobContext {
        let ctx = JobContext::new("assign ip address", "IP", address);
        match &self.device_label {
            Some(device) => ctx.on_device(device),
            None => ctx,
        }
    }

    /// Point `address` at the interface
    pub async fn to(self, address: &str) -> Option<Record> {
        let ctx = self.context(address);
        let gateway = self.session.gateway();

        let ip = match gateway
            .fetch(Collection::IpAddresses, &Filter::new().eq("address", address))
            .await
        {
            Lookup::Found(ip) => ip,
            Lookup::NotFound if self.add_missing_ip => {
                debug!("adding missing IP {} before assignment", address);
                let mut entity = self.session.ipam().ipv4(address).return_existing(true);
                if let Some(device) = &self.device_label {
                    entity = entity.on_device(device.as_str());
                }
                let properties = PropertySet::new()
                    .with("description", "IP")
                    .with("status", "active");
                let Some(ip) = entity.add(properties).await else {
                    gateway.failure(&ctx, format!("could not add IP {}; assignment not possible", address));
                    return None;
                };
                ip
            }
            Lookup::NotFound => {
                gateway.failure(&ctx, "IP not found in sot".to_string());
                return None;
            }
            Lookup::Failed(err) => {
                gateway.failure(&ctx, format!("IP not assigned; {}", err));
                return None;
            }
        };

        let interface = self.interface_record(&ctx).await?;
        let properties = PropertySet::new()
            .with("assigned_object_type", "dcim.interface")
            .with("assigned_object_id", interface.id().to_string());
        gateway
            .update_record(Collection::IpAddresses, ip, &properties, &ctx)
            .await
    }

    async fn interface_record(&self, ctx: &JobContext) -> Option<Record> {
        let gateway = self.session.gateway();
        let key = match &self.interface {
            EntityRef::Id(id) => Filter::by_id(*id),
            EntityRef::Key(name) => {
                let device = match &self.device {
                    Some(EntityRef::Id(id)) => *id,
                    Some(EntityRef::Key(device)) => {
                        match gateway.fetch(Collection::Devices, &Filter::by_name(device)).await {
                            Lookup::Found(record) => record.id(),
                            Lookup::NotFound => {
                                gateway.failure(ctx, format!("Device {} not found in sot", device));
                                return None;
                            }
                            Lookup::Failed(err) => {
                                gateway.failure(ctx, format!("could not look up device {}; {}", device, err));
                                return None;
                            }
                        }
                    }
                    None => {
                        gateway.failure(ctx, format!("no device given for interface {}", name));
                        return None;
                    }
                };
                Filter::new().eq("device_id", device).eq("name", name)
            }
        };

        match gateway.fetch(Collection::Interfaces, &key).await {
            Lookup::Found(interface) => Some(interface),
            Lookup::NotFound => {
                gateway.failure(ctx, format!("Interface {} not found in sot", self.interface));
                None
            }
            Lookup::Failed(err) => {
                gateway.failure(ctx, format!("could not look up interface {}; {}", self.interface, err));
                None
            }
        }
    }
}
