// Copyright (c) 2025 - Cowboy AI, Inc.
//! Backend identifiers and entity references
//!
//! Records in the inventory backend are keyed by UUID. Callers usually know an
//! entity by a natural key instead (device name, tag name, VLAN number + site),
//! so every place that accepts an entity takes an [`EntityRef`] which is either
//! an ID the caller already holds or a key that still has to be resolved.
//!
//! Resolution is one-directional: once a field holds a [`BackendId`] it is never
//! looked up again.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque backend identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendId(Uuid);

impl BackendId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Fresh identifier, used by the in-memory backend
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Parse a value that already holds an ID (a UUID string)
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_str().and_then(|s| s.parse().ok())
    }

    pub fn to_value(self) -> Value {
        Value::String(self.0.to_string())
    }
}

impl FromStr for BackendId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

impl From<Uuid> for BackendId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<BackendId> for Value {
    fn from(id: BackendId) -> Self {
        id.to_value()
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to an entity: a resolved ID or a natural key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Id(BackendId),
    Key(String),
}

impl EntityRef {
    /// UUID text is an ID, anything else a natural key
    pub fn parse(text: &str) -> Self {
        match text.parse::<BackendId>() {
            Ok(id) => Self::Id(id),
            Err(_) => Self::Key(text.to_string()),
        }
    }

    pub fn id(&self) -> Option<BackendId> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Key(_) => None,
        }
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Id(_) => None,
            Self::Key(key) => Some(key),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Id(_))
    }
}

impl From<BackendId> for EntityRef {
    fn from(id: BackendId) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for EntityRef {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}

impl From<String> for EntityRef {
    fn from(text: String) -> Self {
        Self::parse(&text)
    }
}

impl From<&crate::backend::Record> for EntityRef {
    fn from(record: &crate::backend::Record) -> Self {
        Self::Id(record.id())
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{}", id),
            Self::Key(key) => write!(f, "{}", key),
        }
    }
}
