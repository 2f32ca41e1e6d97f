// Copyright (c) 2025 - Cowboy AI, Inc.
//! Source-of-Truth Domain Models
//!
//! Core concepts shared by the reconciliation layer.
//!
//! # Value Objects
//!
//! - [`PropertySet`] - desired attributes of an entity, mutated in place by
//!   reference resolution
//! - [`BackendId`] / [`EntityRef`] - resolved IDs and natural keys
//! - [`Collection`] - named backend collections
//!
//! # Schemas and Invariants
//!
//! - [`DeviceProperties`] / [`InterfaceProperties`] - typed desired state with
//!   mandatory attributes
//! - [`DeviceDefaults`] / [`InterfaceDefaults`] - default tables applied when
//!   "use defaults" is set
//! - [`invariants`] - pure validation and tag algebra
//!
//! # Bookkeeping
//!
//! - [`OperationOutcome`] / [`OperationLog`] - per-step outcomes, global and per
//!   device

pub mod collection;
pub mod invariants;
pub mod outcome;
pub mod properties;
pub mod reference;
pub mod schema;

pub use collection::Collection;
pub use invariants::{TagMode, ValidationError, ValidationResult};
pub use outcome::{JobContext, OperationLog, OperationOutcome};
pub use properties::PropertySet;
pub use reference::{BackendId, EntityRef};
pub use schema::{DeviceDefaults, DeviceProperties, InterfaceDefaults, InterfaceProperties};
