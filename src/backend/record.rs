// Copyright (c) 2025 - Cowboy AI, Inc.
//! Backend record handle and filters
//!
//! A [`Record`] is the handle of one entity as the backend returned it: its ID
//! plus whatever fields came back. Reference fields arrive either as a bare ID
//! or as a nested object (`{"id": .., "name": ..}`), status fields either as a
//! string or as `{"value": .., "label": ..}`; the accessors here accept both.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::domain::{BackendId, PropertySet};

/// One entity fetched from the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    id: BackendId,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl Record {
    pub fn new(id: BackendId, fields: Map<String, Value>) -> Self {
        Self { id, fields }
    }

    pub fn id(&self) -> BackendId {
        self.id
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Field rendered as text (strings, numbers, `value`/`name` of objects)
    pub fn text(&self, field: &str) -> Option<String> {
        self.fields.get(field).and_then(scalar_text)
    }

    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(Value::as_str)
    }

    /// Human label: name, address, prefix or VLAN number, whichever exists
    pub fn label(&self) -> String {
        ["name", "address", "prefix", "vid"]
            .iter()
            .find_map(|key| self.text(key))
            .unwrap_or_else(|| self.id.to_string())
    }

    /// ID behind a reference field
    pub fn reference_id(&self, field: &str) -> Option<BackendId> {
        self.fields.get(field).and_then(reference_id)
    }

    /// Name behind a reference field, if the backend nested it
    pub fn reference_name(&self, field: &str) -> Option<String> {
        match self.fields.get(field)? {
            Value::Object(map) => map.get("name").and_then(Value::as_str).map(str::to_string),
            Value::String(s) if s.parse::<BackendId>().is_err() => Some(s.clone()),
            _ => None,
        }
    }

    /// True when the field is absent or null
    pub fn is_unset(&self, field: &str) -> bool {
        matches!(self.fields.get(field), None | Some(Value::Null))
    }

    /// IDs of the tags the record carries
    pub fn tag_ids(&self) -> Vec<BackendId> {
        match self.fields.get("tags") {
            Some(Value::Array(items)) => items.iter().filter_map(reference_id).collect(),
            _ => Vec::new(),
        }
    }

    /// Fields of `desired` whose value differs from this record
    pub fn changed_fields(&self, desired: &PropertySet) -> PropertySet {
        desired
            .iter()
            .filter(|(key, value)| match self.fields.get(key.as_str()) {
                Some(current) => !values_equivalent(current, value),
                None => true,
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Apply properties locally after a successful update
    pub fn apply(&mut self, properties: &PropertySet) {
        for (key, value) in properties.iter() {
            self.fields.insert(key.clone(), value.clone());
        }
    }

    /// Whether the record satisfies every condition of the filter
    pub fn matches(&self, filter: &Filter) -> bool {
        filter.pairs().all(|(key, expected)| self.matches_condition(key, expected))
    }

    fn matches_condition(&self, key: &str, expected: &str) -> bool {
        if key == "id" {
            return self.id.to_string() == expected;
        }
        if let Some(field) = key.strip_suffix("__ie") {
            return self
                .text(field)
                .is_some_and(|v| v.eq_ignore_ascii_case(expected));
        }
        if let Some(field) = key.strip_suffix("_id") {
            if self.fields.contains_key(field) {
                return self
                    .reference_id(field)
                    .is_some_and(|id| id.to_string() == expected);
            }
        }
        match self.fields.get(key) {
            Some(Value::Object(map)) => ["id", "name", "slug", "value"].iter().any(|k| {
                map.get(*k).and_then(scalar_text).as_deref() == Some(expected)
            }),
            Some(Value::Null) | None => expected == "null",
            Some(value) => scalar_text(value).as_deref() == Some(expected),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.id)
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(map) => ["value", "name", "address"]
            .iter()
            .find_map(|k| map.get(*k).and_then(scalar_text)),
        _ => None,
    }
}

fn reference_id(value: &Value) -> Option<BackendId> {
    match value {
        Value::Object(map) => map.get("id").and_then(BackendId::from_value),
        other => BackendId::from_value(other),
    }
}

/// Canonical form used to compare a stored value with a desired one
fn canonical(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            if let Some(id) = map.get("id") {
                return id.clone();
            }
            if let Some(v) = map.get("value") {
                return canonical(v);
            }
            value.clone()
        }
        Value::Number(n) => Value::String(n.to_string()),
        other => other.clone(),
    }
}

/// Compare a stored field with a desired value, ignoring representation
///
/// Nested references compare by ID, choice fields by value, numbers by their
/// text, and lists as sets.
pub fn values_equivalent(current: &Value, desired: &Value) -> bool {
    match (current, desired) {
        (Value::Array(a), Value::Array(b)) => {
            if a.len() != b.len() {
                return false;
            }
            let mut a: Vec<String> = a.iter().map(|v| canonical(v).to_string()).collect();
            let mut b: Vec<String> = b.iter().map(|v| canonical(v).to_string()).collect();
            a.sort();
            b.sort();
            a == b
        }
        _ => canonical(current) == canonical(desired),
    }
}

/// Attribute filter used to look entities up
///
/// Conditions keep their insertion order so requests and log lines are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter(Vec<(String, String)>);

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.0.push((key.into(), value.to_string()));
        self
    }

    pub fn by_name(name: impl ToString) -> Self {
        Self::new().eq("name", name)
    }

    pub fn by_id(id: BackendId) -> Self {
        Self::new().eq("id", id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs().find(|(k, _)| *k == key).map(|(_, v)| v)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}
