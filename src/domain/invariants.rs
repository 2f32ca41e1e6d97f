// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Validation Functions - Domain Invariants
//!
//! Business rules that must hold before anything is sent to the backend.
//! All functions are pure (no I/O, no mutation outside their arguments).
//!
//! # Invariant Categories
//!
//! 1. **Mandatory attributes**: a device needs `device_type`, `device_role`,
//!    `platform`, `site` and `status`; an interface needs `description`,
//!    `status` and `type`. Missing ones are taken from a default table or the
//!    operation is rejected.
//! 2. **Textual cleanup**: serial numbers reported as a set-like string
//!    (`{'A1','B2'}`) are stripped of quote and brace characters.
//! 3. **Tag algebra**: the final tag list for merge, replace and remove
//!    requests, and whether an update has to be issued at all.

use std::collections::HashSet;

use crate::domain::{BackendId, PropertySet};

/// Mandatory device attributes, in the order they are checked
pub const DEVICE_MANDATORY: [&str; 5] = ["device_type", "device_role", "platform", "site", "status"];

/// Mandatory interface attributes (the name is always injected)
pub const INTERFACE_MANDATORY: [&str; 3] = ["description", "status", "type"];

/// Validation result with detailed error information
pub type ValidationResult<T = ()> = Result<T, ValidationError>;

/// Validation error with context
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Mandatory property absent and no default policy active
    #[error("mandatory property {field} of {entity} is missing")]
    MissingMandatory { entity: String, field: String },

    /// Default policy active but the default table has no entry
    #[error("no default for mandatory property {field} of {entity}")]
    MissingDefault { entity: String, field: String },

    /// Field present but unusable
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    /// Natural key of the entity is empty
    #[error("{0} needs a non-empty name")]
    EmptyKey(String),
}

/// Check mandatory fields, filling missing ones from `defaults` when given
///
/// Returns the names of the fields that were filled from the default table.
/// Without defaults the first missing field rejects the whole set.
pub fn ensure_mandatory(
    entity: &str,
    properties: &mut PropertySet,
    mandatory: &[&str],
    defaults: Option<&PropertySet>,
) -> ValidationResult<Vec<String>> {
    let mut filled = Vec::new();
    for field in mandatory {
        if properties.contains_key(field) {
            continue;
        }
        let Some(defaults) = defaults else {
            return Err(ValidationError::MissingMandatory {
                entity: entity.to_string(),
                field: (*field).to_string(),
            });
        };
        let value = defaults.get(field).cloned().ok_or_else(|| ValidationError::MissingDefault {
            entity: entity.to_string(),
            field: (*field).to_string(),
        })?;
        properties.insert(*field, value);
        filled.push((*field).to_string());
    }
    Ok(filled)
}

/// Validate the natural key of an entity
pub fn validate_key(entity: &str, key: &str) -> ValidationResult {
    if key.trim().is_empty() {
        return Err(ValidationError::EmptyKey(entity.to_string()));
    }
    Ok(())
}

/// Strip quote and brace characters from a reported serial number
///
/// Some devices report several serials as `{'12345','67890'}`; the result is
/// `12345,67890`.
pub fn clean_serial_number(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '\'' | '"' | '{' | '}'))
        .collect()
}

/// How requested tags combine with the tags an entity already carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagMode {
    /// Use exactly the requested tags
    Replace,
    /// Union of current and requested tags
    Merge,
    /// Current tags minus the requested ones
    Remove,
}

/// Compute the final tag list, or `None` when no update should be issued
///
/// No update is issued when the final set equals the current set, or when a
/// replace/merge request resolved to nothing and clearing was not explicitly
/// asked for. A remove that empties the list is a real update.
pub fn plan_tags(
    current: &[BackendId],
    requested: &[BackendId],
    mode: TagMode,
    explicit_clear: bool,
) -> Option<Vec<BackendId>> {
    if requested.is_empty() && mode != TagMode::Remove && !explicit_clear {
        return None;
    }

    let requested_set: HashSet<_> = requested.iter().collect();
    let mut result: Vec<BackendId> = match mode {
        TagMode::Replace => Vec::new(),
        TagMode::Merge => current.to_vec(),
        TagMode::Remove => current
            .iter()
            .filter(|id| !requested_set.contains(id))
            .copied()
            .collect(),
    };
    if mode != TagMode::Remove {
        for id in requested {
            if !result.contains(id) {
                result.push(*id);
            }
        }
    }

    let current_set: HashSet<_> = current.iter().collect();
    let result_set: HashSet<_> = result.iter().collect();
    if current_set == result_set {
        return None;
    }
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn ids(n: usize) -> Vec<BackendId> {
        (0..n).map(|_| BackendId::generate()).collect()
    }

    #[test_case("{'FOC1234','FOC5678'}", "FOC1234,FOC5678" ; "set like string")]
    #[test_case("\"FDO21\"", "FDO21" ; "double quoted")]
    #[test_case("FDO21", "FDO21" ; "plain")]
    #[test_case("", "" ; "empty")]
    fn test_clean_serial_number(raw: &str, expected: &str) {
        assert_eq!(clean_serial_number(raw), expected);
    }

    #[test]
    fn test_mandatory_without_defaults_fails_on_first_missing() {
        let mut set = PropertySet::new().with("device_type", "x");
        let err = ensure_mandatory("device", &mut set, &DEVICE_MANDATORY, None).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingMandatory {
                entity: "device".into(),
                field: "device_role".into()
            }
        );
    }

    #[test]
    fn test_mandatory_with_defaults_fills_missing() {
        let defaults = PropertySet::new()
            .with("description", "")
            .with("status", "active")
            .with("type", "1000base-t");
        let mut set = PropertySet::new().with("status", "planned");
        let filled =
            ensure_mandatory("interface", &mut set, &INTERFACE_MANDATORY, Some(&defaults)).unwrap();

        assert_eq!(filled, vec!["description".to_string(), "type".to_string()]);
        assert_eq!(set.get_text("status").as_deref(), Some("planned"));
    }

    #[test]
    fn test_mandatory_default_table_gap() {
        let mut set = PropertySet::new();
        let err = ensure_mandatory("interface", &mut set, &["type"], Some(&PropertySet::new()));
        assert!(matches!(err, Err(ValidationError::MissingDefault { .. })));
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("device", "sw1").is_ok());
        assert!(validate_key("device", "  ").is_err());
    }

    #[test]
    fn test_merge_adds_new_tag() {
        let t = ids(3);
        let plan = plan_tags(&t[..2], &t[2..], TagMode::Merge, false).unwrap();
        assert_eq!(plan, t);
    }

    #[test]
    fn test_remove_to_empty_is_an_update() {
        let t = ids(1);
        assert_eq!(plan_tags(&t, &t, TagMode::Remove, false), Some(vec![]));
    }

    #[test]
    fn test_remove_nothing_is_no_update() {
        let t = ids(1);
        assert_eq!(plan_tags(&t, &[], TagMode::Remove, false), None);
    }

    #[test]
    fn test_empty_replace_needs_explicit_clear() {
        let t = ids(2);
        assert_eq!(plan_tags(&t, &[], TagMode::Replace, false), None);
        assert_eq!(plan_tags(&t, &[], TagMode::Replace, true), Some(vec![]));
    }

    #[test]
    fn test_unchanged_set_is_no_update() {
        let t = ids(2);
        let reversed: Vec<_> = t.iter().rev().copied().collect();
        assert_eq!(plan_tags(&t, &reversed, TagMode::Replace, false), None);
        assert_eq!(plan_tags(&t, &t[..1], TagMode::Merge, false), None);
    }
}
