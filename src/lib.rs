//! Source-of-truth reconciliation for the Composable Information Machine
//!
//! This crate keeps a network inventory service (devices, interfaces, IP
//! addresses, prefixes, VLANs, tags) in line with a desired state. Callers
//! describe entities by human names; the crate resolves those names to backend
//! IDs, creates or updates what is missing, and records one outcome per step.
//!
//! # Layers
//!
//! ```text
//! SotSession ─ device() / ipam() / getter()
//!     ↓
//! entity      DeviceEntity, InterfaceEntity, Ipam, TagRequest
//!     ↓
//! central     EntityGateway → ReferenceResolver → ResolutionCache
//!     ↓
//! backend     Backend trait (MemoryBackend, NautobotBackend)
//! ```
//!
//! Mutating operations never return errors; they return `Option<Record>` and
//! leave the reason in the session's [`OperationLog`](domain::OperationLog).

pub mod backend;
pub mod central;
pub mod config;
pub mod domain;
pub mod entity;
pub mod errors;
pub mod getter;
pub mod inventory;
pub mod session;

// Re-export commonly used types
pub use backend::{Backend, BackendError, Filter, MemoryBackend, Record};
#[cfg(feature = "nautobot")]
pub use backend::NautobotBackend;
pub use central::{ExistingPolicy, Lookup, ResolutionError};
pub use config::SotConfig;
pub use domain::{
    BackendId, Collection, DeviceProperties, EntityRef, InterfaceProperties, OperationLog,
    OperationOutcome, PropertySet,
};
pub use entity::{DeviceEntity, InterfaceEntity, Ipam, ReconcileAction, TagRequest};
pub use errors::{SotError, SotResult};
pub use getter::{ChangeQuery, DeviceSummary, Getter, QuerySource};
pub use inventory::{Inventory, ReconcileSummary};
pub use session::SotSession;
