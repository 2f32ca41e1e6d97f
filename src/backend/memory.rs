// Copyright (c) 2025 - Cowboy AI, Inc.
//! In-memory inventory backend
//!
//! Behaves like the real inventory service closely enough to exercise the
//! reconciliation layer without a network:
//!
//! - reference fields written as IDs are stored as nested objects
//!   (`{"id": .., "name": ..}`), the way the service returns them
//! - device names and (device, interface name) pairs are unique
//! - `update` reports `false` when nothing changed
//!
//! Every call is recorded so tests can assert on call counts, and failures can
//! be injected per operation and collection.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

use super::{Backend, BackendError, BackendResult, Filter, Record};
use crate::domain::{BackendId, Collection, PropertySet};

/// Backend primitive, used for call accounting and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    Filter,
    Create,
    Update,
    Delete,
    Query,
}

/// One recorded backend call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendCall {
    pub operation: Operation,
    pub collection: Option<Collection>,
}

#[derive(Debug, Clone)]
struct InjectedFailure {
    operation: Operation,
    collection: Option<Collection>,
    error: BackendError,
}

#[derive(Debug, Default)]
struct MemoryState {
    records: BTreeMap<Collection, Vec<Record>>,
    calls: Vec<BackendCall>,
    failures: Vec<InjectedFailure>,
    queries: Vec<(String, Value)>,
}

/// In-process backend
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a record directly, bypassing call accounting
    ///
    /// Non-object values seed an empty record.
    pub fn seed(&self, collection: Collection, fields: Value) -> Record {
        let fields = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let mut state = self.lock();
        let fields = hydrate(&state.records, fields);
        let record = Record::new(BackendId::generate(), fields);
        state.records.entry(collection).or_default().push(record.clone());
        record
    }

    /// Snapshot of a collection
    pub fn records(&self, collection: Collection) -> Vec<Record> {
        self.lock().records.get(&collection).cloned().unwrap_or_default()
    }

    /// Current state of one record
    pub fn record(&self, collection: Collection, id: BackendId) -> Option<Record> {
        self.lock()
            .records
            .get(&collection)
            .and_then(|records| records.iter().find(|r| r.id() == id).cloned())
    }

    /// Answer graph queries containing `marker` with `response`
    pub fn register_query(&self, marker: impl Into<String>, response: Value) {
        self.lock().queries.push((marker.into(), response));
    }

    /// Make every call of `operation` (optionally on one collection) fail
    pub fn fail_on(&self, operation: Operation, collection: Option<Collection>, error: BackendError) {
        self.lock().failures.push(InjectedFailure {
            operation,
            collection,
            error,
        });
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, operation: Operation) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    pub fn calls_to(&self, operation: Operation, collection: Collection) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.operation == operation && c.collection == Some(collection))
            .count()
    }

    pub fn reset_calls(&self) {
        self.lock().calls.clear();
    }

    /// Record a call and return the injected failure for it, if any
    fn enter(state: &mut MemoryState, operation: Operation, collection: Option<Collection>) -> BackendResult<()> {
        state.calls.push(BackendCall {
            operation,
            collection,
        });
        let injected = state.failures.iter().find(|f| {
            f.operation == operation && (f.collection.is_none() || f.collection == collection)
        });
        match injected {
            Some(failure) => Err(failure.error.clone()),
            None => Ok(()),
        }
    }
}

/// Replace ID-valued reference fields with nested objects
fn hydrate(records: &BTreeMap<Collection, Vec<Record>>, fields: Map<String, Value>) -> Map<String, Value> {
    fields
        .into_iter()
        .map(|(key, value)| {
            let value = match Collection::for_reference_field(&key) {
                Some(target) => match value {
                    Value::Array(items) => Value::Array(
                        items
                            .into_iter()
                            .map(|item| nest(records, target, item))
                            .collect(),
                    ),
                    other => nest(records, target, other),
                },
                None => value,
            };
            (key, value)
        })
        .collect()
}

fn nest(records: &BTreeMap<Collection, Vec<Record>>, target: Collection, value: Value) -> Value {
    let Some(id) = BackendId::from_value(&value) else {
        return value;
    };
    let Some(record) = records
        .get(&target)
        .and_then(|items| items.iter().find(|r| r.id() == id))
    else {
        return value;
    };

    let mut nested = Map::new();
    nested.insert("id".to_string(), id.to_value());
    for key in ["name", "slug", "address", "prefix", "vid"] {
        if let Some(v) = record.get(key) {
            nested.insert(key.to_string(), v.clone());
        }
    }
    Value::Object(nested)
}

fn unique_violation(
    records: &BTreeMap<Collection, Vec<Record>>,
    collection: Collection,
    candidate: &Map<String, Value>,
) -> Option<String> {
    let existing = records.get(&collection)?;
    let name = candidate.get("name")?.as_str()?;
    match collection {
        Collection::Devices | Collection::Sites | Collection::Tags => existing
            .iter()
            .any(|r| r.name() == Some(name))
            .then(|| format!("{} with this name already exists", collection)),
        Collection::Interfaces => {
            let device = candidate.get("device").and_then(|d| match d {
                Value::Object(m) => m.get("id").and_then(BackendId::from_value),
                other => BackendId::from_value(other),
            })?;
            existing
                .iter()
                .any(|r| r.name() == Some(name) && r.reference_id("device") == Some(device))
                .then(|| "interface with this name already exists on device".to_string())
        }
        _ => None,
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn get(&self, collection: Collection, filter: &Filter) -> BackendResult<Option<Record>> {
        let mut state = self.lock();
        Self::enter(&mut state, Operation::Get, Some(collection))?;
        let mut matches: Vec<Record> = state
            .records
            .get(&collection)
            .map(|records| records.iter().filter(|r| r.matches(filter)).cloned().collect())
            .unwrap_or_default();
        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            count => Err(BackendError::MultipleResults {
                collection,
                filter: filter.to_string(),
                count,
            }),
        }
    }

    async fn filter(&self, collection: Collection, filter: &Filter) -> BackendResult<Vec<Record>> {
        let mut state = self.lock();
        Self::enter(&mut state, Operation::Filter, Some(collection))?;
        Ok(state
            .records
            .get(&collection)
            .map(|records| records.iter().filter(|r| r.matches(filter)).cloned().collect())
            .unwrap_or_default())
    }

    async fn create(&self, collection: Collection, properties: &PropertySet) -> BackendResult<Record> {
        let mut state = self.lock();
        Self::enter(&mut state, Operation::Create, Some(collection))?;
        let fields = hydrate(&state.records, properties.as_map().clone());
        if let Some(reason) = unique_violation(&state.records, collection, &fields) {
            return Err(BackendError::Status {
                status: 400,
                body: reason,
            });
        }
        let record = Record::new(BackendId::generate(), fields);
        debug!("memory backend created {} {}", collection, record);
        state.records.entry(collection).or_default().push(record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        collection: Collection,
        record: &Record,
        properties: &PropertySet,
    ) -> BackendResult<bool> {
        let mut state = self.lock();
        Self::enter(&mut state, Operation::Update, Some(collection))?;
        let hydrated: PropertySet = hydrate(&state.records, properties.as_map().clone()).into();
        let stored = state
            .records
            .get_mut(&collection)
            .and_then(|records| records.iter_mut().find(|r| r.id() == record.id()))
            .ok_or_else(|| BackendError::Missing {
                collection,
                id: record.id().to_string(),
            })?;
        let changed = stored.changed_fields(&hydrated);
        if changed.is_empty() {
            return Ok(false);
        }
        stored.apply(&changed);
        Ok(true)
    }

    async fn delete(&self, collection: Collection, record: &Record) -> BackendResult<bool> {
        let mut state = self.lock();
        Self::enter(&mut state, Operation::Delete, Some(collection))?;
        let Some(records) = state.records.get_mut(&collection) else {
            return Ok(false);
        };
        let before = records.len();
        records.retain(|r| r.id() != record.id());
        Ok(records.len() < before)
    }

    async fn query(&self, query: &str, _variables: &Value) -> BackendResult<Value> {
        let mut state = self.lock();
        Self::enter(&mut state, Operation::Query, None)?;
        state
            .queries
            .iter()
            .find(|(marker, _)| query.contains(marker.as_str()))
            .map(|(_, response)| response.clone())
            .ok_or_else(|| BackendError::Query("no response registered for query".to_string()))
    }
}
