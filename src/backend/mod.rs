// Copyright (c) 2025 - Cowboy AI, Inc.
//! Inventory Backend Abstraction
//!
//! The inventory service (devices, interfaces, IPs, VLANs, tags, sites, ...) is
//! an external system. This module defines the narrow interface the
//! reconciliation layer consumes from it and two implementations:
//!
//! - [`MemoryBackend`] - in-process store used by tests and dry runs
//! - [`NautobotBackend`] - REST + GraphQL client (feature `nautobot`)
//!
//! # Architecture
//!
//! ```text
//! DeviceEntity / InterfaceEntity / Ipam
//!         ↓
//! EntityGateway  (never raises, logs outcomes)
//!         ↓
//! Backend trait  (get / filter / create / update / delete / query)
//!         ↓
//! Inventory service
//! ```
//!
//! Implementations report every failure as a [`BackendError`]; turning those
//! into outcomes is the gateway's job.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{Collection, PropertySet};

pub mod memory;
#[cfg(feature = "nautobot")]
pub mod nautobot;
pub mod record;

pub use memory::{BackendCall, MemoryBackend, Operation};
#[cfg(feature = "nautobot")]
pub use nautobot::NautobotBackend;
pub use record::{values_equivalent, Filter, Record};

/// Result type for backend calls
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors raised by a backend call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Connection, TLS or timeout failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Backend answered with a non-success status
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body could not be decoded
    #[error("could not decode backend response: {0}")]
    Decode(String),

    /// A lookup expected one entity and found several
    #[error("got {count} {collection} for {filter}; expected at most one")]
    MultipleResults {
        collection: Collection,
        filter: String,
        count: usize,
    },

    /// Record to update does not exist any more
    #[error("{collection} {id} does not exist")]
    Missing { collection: Collection, id: String },

    /// Graph query was rejected
    #[error("graph query failed: {0}")]
    Query(String),
}

/// Primitives the reconciliation layer needs from the inventory service
#[async_trait]
pub trait Backend: Send + Sync {
    /// Look up at most one entity; more than one match is an error
    async fn get(&self, collection: Collection, filter: &Filter) -> BackendResult<Option<Record>>;

    /// All entities matching the filter
    async fn filter(&self, collection: Collection, filter: &Filter) -> BackendResult<Vec<Record>>;

    /// Create an entity from a resolved property set
    async fn create(&self, collection: Collection, properties: &PropertySet) -> BackendResult<Record>;

    /// Update an entity; `Ok(false)` means nothing had to change
    async fn update(
        &self,
        collection: Collection,
        record: &Record,
        properties: &PropertySet,
    ) -> BackendResult<bool>;

    /// Delete an entity; `Ok(false)` means it was already gone
    async fn delete(&self, collection: Collection, record: &Record) -> BackendResult<bool>;

    /// Graph-style read query for reporting paths
    async fn query(&self, query: &str, variables: &Value) -> BackendResult<Value>;
}
