// Copyright (c) 2025 - Cowboy AI, Inc.
//! Domain entities
//!
//! Fluent builders over the [`EntityGateway`](crate::central::EntityGateway):
//! select an entity by its natural key, set flags (`use_defaults`,
//! `return_existing`), stage sub-requests, then call `add`, `update`,
//! `delete` or `get`.
//!
//! ```rust,ignore
//! let mut device = session
//!     .device("sw1")
//!     .use_defaults(true)
//!     .primary_interface("GigabitEthernet0/0", InterfaceProperties::new())
//!     .primary_ipv4("10.0.0.1/24")
//!     .make_primary(true);
//! device.add(DeviceProperties::new().site("lab")).await;
//! device.tags(["core"]).add().await;
//! device.interface("GigabitEthernet0/1").add(InterfaceProperties::new()).await;
//! ```
//!
//! Mutating operations return `Option<Record>`; the reason for a `None` is in
//! the session's OperationLog.

pub mod binding;
pub mod device;
pub mod interface;
pub mod ipam;
pub mod tags;

pub use binding::{Binding, BindingEvent};
pub use device::{DeviceEntity, ReconcileAction};
pub use interface::InterfaceEntity;
pub use ipam::{Assignment, IpAddressEntity, Ipam, PrefixEntity, VlanEntity};
pub use tags::{TagRequest, Taggable};
