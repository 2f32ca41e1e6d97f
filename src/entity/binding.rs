// Copyright (c) 2025 - Cowboy AI, Inc.
//! Binding State Machine
//!
//! Tracks whether a domain entity's natural key has been matched to a backend
//! record.
//!
//! # States
//!
//! - Unbound: nothing fetched yet (or the handle was invalidated)
//! - Bound: backend record fetched and cached
//! - Absent: fetch confirmed the entity does not exist
//!
//! # Events
//!
//! - Fetched(record): any → Bound
//! - NotFound: any → Absent
//! - Deleted: any → Absent
//! - Invalidate: any → Unbound
//!
//! A failed lookup is not an event: the binding stays where it was, so a
//! transport error is never recorded as absence.

use crate::backend::{Filter, Record};
use crate::central::{EntityGateway, Lookup};
use crate::domain::Collection;

/// Input of the binding machine
#[derive(Debug, Clone, PartialEq)]
pub enum BindingEvent {
    Fetched(Record),
    NotFound,
    Deleted,
    Invalidate,
}

/// Relationship between a domain entity and its backend record
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Binding {
    #[default]
    Unbound,
    Bound(Record),
    Absent,
}

impl Binding {
    /// Pure transition function
    pub fn transition(&self, event: BindingEvent) -> Binding {
        match event {
            BindingEvent::Fetched(record) => Binding::Bound(record),
            BindingEvent::NotFound | BindingEvent::Deleted => Binding::Absent,
            BindingEvent::Invalidate => Binding::Unbound,
        }
    }

    pub fn apply(&mut self, event: BindingEvent) {
        *self = self.transition(event);
    }

    pub fn record(&self) -> Option<&Record> {
        match self {
            Binding::Bound(record) => Some(record),
            _ => None,
        }
    }

    pub fn is_bound(&self) -> bool {
        matches!(self, Binding::Bound(_))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Binding::Absent)
    }

    /// Bind from a write result: a record binds, `None` invalidates
    pub fn settle(&mut self, record: Option<&Record>) {
        match record {
            Some(record) => self.apply(BindingEvent::Fetched(record.clone())),
            None => self.apply(BindingEvent::Invalidate),
        }
    }

    /// Fetch the record, reusing a bound handle unless `refresh` is set
    pub async fn fetch(
        &mut self,
        gateway: &EntityGateway<'_>,
        collection: Collection,
        key: &Filter,
        refresh: bool,
    ) -> Lookup {
        if !refresh {
            if let Binding::Bound(record) = self {
                return Lookup::Found(record.clone());
            }
        }
        let lookup = gateway.fetch(collection, key).await;
        match &lookup {
            Lookup::Found(record) => self.apply(BindingEvent::Fetched(record.clone())),
            Lookup::NotFound => self.apply(BindingEvent::NotFound),
            Lookup::Failed(_) => {}
        }
        lookup
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BackendId;
    use serde_json::Map;

    fn record() -> Record {
        Record::new(BackendId::generate(), Map::new())
    }

    #[test]
    fn test_transitions() {
        let bound = Binding::Unbound.transition(BindingEvent::Fetched(record()));
        assert!(bound.is_bound());
        assert!(bound.transition(BindingEvent::Deleted).is_absent());
        assert!(Binding::Unbound.transition(BindingEvent::NotFound).is_absent());
        assert_eq!(bound.transition(BindingEvent::Invalidate), Binding::Unbound);
        assert!(Binding::Absent.transition(BindingEvent::Fetched(record())).is_bound());
    }

    #[test]
    fn test_settle() {
        let mut binding = Binding::Absent;
        let rec = record();
        binding.settle(Some(&rec));
        assert_eq!(binding.record(), Some(&rec));
        binding.settle(None);
        assert_eq!(binding, Binding::Unbound);
    }
}
