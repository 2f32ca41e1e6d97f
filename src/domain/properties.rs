// Copyright (c) 2025 - Cowboy AI, Inc.
//! PropertySet - desired attributes of an entity
//!
//! A `PropertySet` is the mapping from field name to value that describes the
//! desired state of a device, interface, IP address, prefix or VLAN. Values are
//! scalars, lists of scalars or nested mappings, so the set is backed by a JSON
//! object and serialises transparently into a backend request body.
//!
//! The [`ReferenceResolver`](crate::central::ReferenceResolver) rewrites symbolic
//! fields of a set in place. Ownership moves along the call chain; nothing in the
//! crate retains a set after the operation that consumed it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Mapping from field name to desired value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertySet(Map<String, Value>);

impl PropertySet {
    /// Create an empty property set
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Insert only when the key is absent. Returns true if the value was added.
    pub fn insert_missing(&mut self, key: &str, value: impl Into<Value>) -> bool {
        if self.0.contains_key(key) {
            return false;
        }
        self.0.insert(key.to_string(), value.into());
        true
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    /// String view of a field; numbers are rendered, other values yield `None`
    pub fn get_text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Copy every entry of `defaults` whose key is not already present
    pub fn fill_from(&mut self, defaults: &PropertySet) {
        for (key, value) in defaults.iter() {
            self.insert_missing(key, value.clone());
        }
    }

    /// Overwrite entries with those of `other`
    pub fn merge(&mut self, other: PropertySet) {
        for (key, value) in other.0 {
            self.0.insert(key, value);
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for PropertySet {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for PropertySet {
    type Error = Value;

    /// Only JSON objects convert; any other value is handed back
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for PropertySet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl fmt::Display for PropertySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Object(self.0.clone()))
    }
}

/// Build a [`PropertySet`] from a `serde_json::json!` object literal
///
/// ```rust
/// use cim_sot::props;
///
/// let set = props!({"name": "sw1", "status": "active"});
/// assert_eq!(set.get_text("name").as_deref(), Some("sw1"));
/// ```
#[macro_export]
macro_rules! props {
    ($($json:tt)+) => {
        match ::serde_json::json!($($json)+) {
            ::serde_json::Value::Object(map) => $crate::domain::PropertySet::from(map),
            _ => $crate::domain::PropertySet::new(),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_missing_keeps_explicit_value() {
        let mut set = PropertySet::new().with("status", "planned");
        assert!(!set.insert_missing("status", "active"));
        assert!(set.insert_missing("platform", "ios"));
        assert_eq!(set.get("status"), Some(&json!("planned")));
        assert_eq!(set.get("platform"), Some(&json!("ios")));
    }

    #[test]
    fn test_fill_from_defaults() {
        let defaults = PropertySet::new()
            .with("status", "active")
            .with("description", "");
        let mut set = PropertySet::new().with("status", "offline");
        set.fill_from(&defaults);

        assert_eq!(set.get_text("status").as_deref(), Some("offline"));
        assert_eq!(set.get_text("description").as_deref(), Some(""));
    }

    #[test]
    fn test_get_text_renders_numbers() {
        let set = PropertySet::new().with("vid", 10).with("tags", json!(["a"]));
        assert_eq!(set.get_text("vid").as_deref(), Some("10"));
        assert_eq!(set.get_text("tags"), None);
    }

    #[test]
    fn test_props_macro() {
        let set = crate::props!({"name": "sw1", "vid": 10});
        assert_eq!(set.len(), 2);
        assert_eq!(set.into_value(), json!({"name": "sw1", "vid": 10}));
    }

    #[test]
    fn test_try_from_rejects_non_objects() {
        assert!(PropertySet::try_from(json!([1, 2])).is_err());
        assert!(PropertySet::try_from(json!({"a": 1})).is_ok());
    }
}
