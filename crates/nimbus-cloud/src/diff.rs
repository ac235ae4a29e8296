//! Diff computation between desired and observed collections

use crate::entity::{Entity, index_by_key};
use crate::mask::FieldMask;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Per-key comparison of observed (`old`) and desired (`new`) state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffRecord {
    pub key: String,

    /// Entity as last read from the remote API
    pub old: Option<Entity>,

    /// Entity as declared in configuration
    pub new: Option<Entity>,

    /// Update paths; only filled when both sides are present
    pub changed_paths: Vec<String>,
}

impl DiffRecord {
    pub fn is_addition(&self) -> bool {
        self.old.is_none() && self.new.is_some()
    }

    pub fn is_removal(&self) -> bool {
        self.old.is_some() && self.new.is_none()
    }

    pub fn is_modification(&self) -> bool {
        self.old.is_some() && self.new.is_some() && !self.changed_paths.is_empty()
    }

    /// Both present with nothing to update
    pub fn is_unchanged(&self) -> bool {
        self.old.is_some() && self.new.is_some() && self.changed_paths.is_empty()
    }
}

/// Compute one record per key in either collection, ordered by key.
///
/// Both inputs must already have unique keys. Records for keys present and
/// identical on both sides are still emitted with empty `changed_paths`.
pub fn compute_diffs(
    desired: &[Entity],
    observed: &[Entity],
    mask: &FieldMask,
    version: &str,
) -> Vec<DiffRecord> {
    let new_index = index_by_key(desired);
    let old_index = index_by_key(observed);

    let keys: BTreeSet<&str> = new_index.keys().chain(old_index.keys()).copied().collect();

    keys.into_iter()
        .map(|key| {
            let old = old_index.get(key).copied();
            let new = new_index.get(key).copied();

            let changed_paths = match (old, new) {
                (Some(old), Some(new)) if old.attributes != new.attributes => {
                    mask.changed_paths(old, new, version)
                }
                _ => Vec::new(),
            };

            DiffRecord {
                key: key.to_string(),
                old: old.cloned(),
                new: new.cloned(),
                changed_paths,
            }
        })
        .collect()
}

/// Give observed entities the write-only attributes the API never returns.
///
/// The value comes from the last applied desired entity when known, so a
/// changed password is still detected; otherwise from the current desired
/// entity, which makes the attribute compare equal.
pub fn fill_write_only(
    observed: &mut [Entity],
    desired: &[Entity],
    last_applied: Option<&[Entity]>,
    mask: &FieldMask,
) {
    let desired_index = index_by_key(desired);
    let applied_index: BTreeMap<&str, &Entity> =
        last_applied.map(index_by_key).unwrap_or_default();

    for entity in observed.iter_mut() {
        for attribute in mask.write_only_attributes() {
            if entity.get(attribute).is_some() {
                continue;
            }
            let source = applied_index
                .get(entity.key.as_str())
                .or_else(|| desired_index.get(entity.key.as_str()))
                .and_then(|e| e.get(attribute));
            if let Some(value) = source {
                entity.set(attribute, value.clone());
            }
        }
    }
}

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub additions: usize,
    pub removals: usize,
    pub modifications: usize,
    pub unchanged: usize,
}

impl DiffSummary {
    pub fn from_diffs(diffs: &[DiffRecord]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            if diff.is_addition() {
                summary.additions += 1;
            } else if diff.is_removal() {
                summary.removals += 1;
            } else if diff.is_modification() {
                summary.modifications += 1;
            } else {
                summary.unchanged += 1;
            }
        }
        summary
    }

    pub fn has_changes(&self) -> bool {
        self.additions + self.removals + self.modifications > 0
    }
}
