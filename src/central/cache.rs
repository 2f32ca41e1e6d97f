// Copyright (c) 2025 - Cowboy AI, Inc.
//! Session-scoped resolution cache
//!
//! Sites, VLANs and tags are resolved over and over within one batch job, so
//! their natural-key → ID mappings are remembered for the lifetime of the
//! session. Entries are added on first successful resolution and never
//! invalidated.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use crate::domain::BackendId;

/// Kinds of lookups that are cached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CachedKind {
    Site,
    Vlan,
    Tag,
}

impl fmt::Display for CachedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CachedKind::Site => "site",
            CachedKind::Vlan => "vlan",
            CachedKind::Tag => "tag",
        };
        f.write_str(name)
    }
}

/// Natural key of a cached lookup
///
/// VLANs are scoped by site; `scope: None` is the global VLAN with that number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: CachedKind,
    pub key: String,
    pub scope: Option<String>,
}

impl CacheKey {
    pub fn site(name: impl Into<String>) -> Self {
        Self {
            kind: CachedKind::Site,
            key: name.into(),
            scope: None,
        }
    }

    pub fn tag(name: impl Into<String>) -> Self {
        Self {
            kind: CachedKind::Tag,
            key: name.into(),
            scope: None,
        }
    }

    pub fn vlan(vid: u16, site: Option<&str>) -> Self {
        Self {
            kind: CachedKind::Vlan,
            key: vid.to_string(),
            scope: site.map(str::to_string),
        }
    }
}

/// Append-only map from natural key to resolved ID
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: Mutex<HashMap<CacheKey, BackendId>>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<BackendId> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()
    }

    /// Remember a resolution; an existing entry is kept
    pub fn insert(&self, key: CacheKey, id: BackendId) -> BackendId {
        *self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_insert(id)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count(&self, kind: CachedKind) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .filter(|k| k.kind == kind)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_resolution_wins() {
        let cache = ResolutionCache::new();
        let first = BackendId::generate();
        let second = BackendId::generate();

        assert_eq!(cache.insert(CacheKey::site("lab"), first), first);
        assert_eq!(cache.insert(CacheKey::site("lab"), second), first);
        assert_eq!(cache.get(&CacheKey::site("lab")), Some(first));
    }

    #[test]
    fn test_vlan_scope_distinguishes_global_and_site() {
        let cache = ResolutionCache::new();
        let global = BackendId::generate();
        let scoped = BackendId::generate();
        cache.insert(CacheKey::vlan(10, None), global);
        cache.insert(CacheKey::vlan(10, Some("A")), scoped);

        assert_eq!(cache.get(&CacheKey::vlan(10, None)), Some(global));
        assert_eq!(cache.get(&CacheKey::vlan(10, Some("A"))), Some(scoped));
        assert_eq!(cache.get(&CacheKey::vlan(10, Some("B"))), None);
        assert_eq!(cache.count(CachedKind::Vlan), 2);
    }
}
