// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Record Comparison

use cim_sot::backend::{values_equivalent, Record};
use cim_sot::domain::{BackendId, PropertySet};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        "[a-z0-9-]{0,12}".prop_map(Value::from),
        any::<u16>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
    ]
}

proptest! {
    /// Property: every value is equivalent to itself
    #[test]
    fn prop_equivalence_is_reflexive(value in scalar()) {
        prop_assert!(values_equivalent(&value, &value));
    }

    /// Property: a number and its text form compare equal
    #[test]
    fn prop_numbers_compare_with_their_text(n in any::<u16>()) {
        prop_assert!(values_equivalent(&json!(n), &json!(n.to_string())));
    }

    /// Property: list comparison ignores order
    #[test]
    fn prop_lists_compare_as_sets(mut items in prop::collection::vec("[a-z]{1,6}", 0..6)) {
        let forward = json!(items.clone());
        items.reverse();
        prop_assert!(values_equivalent(&forward, &json!(items)));
    }

    /// Property: applying a record's changed fields leaves nothing to change
    #[test]
    fn prop_changed_fields_converge(
        stored in prop::collection::btree_map("[a-e]", scalar(), 0..5),
        desired in prop::collection::btree_map("[a-e]", scalar(), 0..5),
    ) {
        let fields: Map<String, Value> = stored.into_iter().collect();
        let mut record = Record::new(BackendId::generate(), fields);
        let desired: PropertySet = desired.into_iter().collect();

        let changed = record.changed_fields(&desired);
        record.apply(&changed);
        prop_assert!(record.changed_fields(&desired).is_empty());
    }
}
