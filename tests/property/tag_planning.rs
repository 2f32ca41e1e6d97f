// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Tag Planning

use cim_sot::domain::invariants::{clean_serial_number, plan_tags};
use cim_sot::domain::{BackendId, TagMode};
use proptest::prelude::*;
use std::collections::HashSet;
use uuid::Uuid;

/// Small ID pool so generated lists overlap often
fn id_pool() -> Vec<BackendId> {
    (1..=8u128).map(|n| BackendId::new(Uuid::from_u128(n))).collect()
}

fn id_list() -> impl Strategy<Value = Vec<BackendId>> {
    prop::collection::vec(0usize..8, 0..6).prop_map(|picks| {
        let pool = id_pool();
        let mut ids = Vec::new();
        for pick in picks {
            if !ids.contains(&pool[pick]) {
                ids.push(pool[pick]);
            }
        }
        ids
    })
}

fn as_set(ids: &[BackendId]) -> HashSet<BackendId> {
    ids.iter().copied().collect()
}

proptest! {
    /// Property: merge yields the union of current and requested tags
    #[test]
    fn prop_merge_is_union(current in id_list(), requested in id_list()) {
        let union: HashSet<_> = as_set(&current).union(&as_set(&requested)).copied().collect();
        match plan_tags(&current, &requested, TagMode::Merge, false) {
            Some(result) => prop_assert_eq!(as_set(&result), union),
            None => prop_assert!(requested.is_empty() || union == as_set(&current)),
        }
    }

    /// Property: remove never adds a tag and drops every requested one
    #[test]
    fn prop_remove_only_shrinks(current in id_list(), requested in id_list()) {
        if let Some(result) = plan_tags(&current, &requested, TagMode::Remove, false) {
            let result = as_set(&result);
            prop_assert!(result.is_subset(&as_set(&current)));
            prop_assert!(result.is_disjoint(&as_set(&requested)));
        }
    }

    /// Property: a planned update always changes the tag set
    #[test]
    fn prop_plan_is_never_a_noop(
        current in id_list(),
        requested in id_list(),
        mode in prop_oneof![Just(TagMode::Replace), Just(TagMode::Merge), Just(TagMode::Remove)],
        clear in any::<bool>(),
    ) {
        if let Some(result) = plan_tags(&current, &requested, mode, clear) {
            prop_assert_ne!(as_set(&result), as_set(&current));
        }
    }

    /// Property: applying the same merge twice plans nothing the second time
    #[test]
    fn prop_merge_is_idempotent(current in id_list(), requested in id_list()) {
        let once = plan_tags(&current, &requested, TagMode::Merge, false)
            .unwrap_or_else(|| current.clone());
        prop_assert_eq!(plan_tags(&once, &requested, TagMode::Merge, false), None);
    }

    /// Property: planned lists never hold duplicates
    #[test]
    fn prop_no_duplicate_tags(current in id_list(), requested in id_list()) {
        if let Some(result) = plan_tags(&current, &requested, TagMode::Replace, true) {
            prop_assert_eq!(result.len(), as_set(&result).len());
        }
    }

    /// Property: serial number cleaning is idempotent and strips all quoting
    #[test]
    fn prop_clean_serial_number(raw in "[A-Za-z0-9'\"{},]{0,24}") {
        let cleaned = clean_serial_number(&raw);
        prop_assert_eq!(clean_serial_number(&cleaned), cleaned.clone());
        prop_assert!(!cleaned.contains(|c| matches!(c, '\'' | '"' | '{' | '}')), "cleaned serial still contains quoting: {:?}", cleaned);
    }
}
