//! Field-mask computation
//!
//! A [`FieldMask`] declares which attributes of an entity can be updated in
//! place and which API field path each one maps to. Comparing two versions of
//! an entity against the mask yields the update paths for a partial update.

use crate::entity::Entity;
use crate::value::{Value, same_value};
use std::collections::{BTreeMap, BTreeSet};

/// Placeholder replaced by the pass's version tag
pub const VERSION_PLACEHOLDER: &str = "{version}";

/// One independently updatable attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaskRule {
    /// Scalar or list attribute compared as a whole
    Leaf { attribute: String, path: String },
    /// Nested block compared key by key, emitting `prefix.key`
    Nested { attribute: String, prefix: String },
}

impl MaskRule {
    fn attribute(&self) -> &str {
        match self {
            MaskRule::Leaf { attribute, .. } | MaskRule::Nested { attribute, .. } => attribute,
        }
    }
}

/// Update-mask declaration for one entity type
#[derive(Debug, Clone, Default)]
pub struct FieldMask {
    rules: Vec<MaskRule>,
    write_only: BTreeSet<String>,
    computed: BTreeSet<String>,
}

impl FieldMask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Leaf attribute; dotted attribute names reach into nested blocks
    pub fn leaf(mut self, attribute: impl Into<String>, path: impl Into<String>) -> Self {
        self.rules.push(MaskRule::Leaf {
            attribute: attribute.into(),
            path: path.into(),
        });
        self
    }

    pub fn nested(mut self, attribute: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.rules.push(MaskRule::Nested {
            attribute: attribute.into(),
            prefix: prefix.into(),
        });
        self
    }

    /// Mark an attribute the remote API never reports back (passwords)
    pub fn write_only(mut self, attribute: impl Into<String>) -> Self {
        self.write_only.insert(attribute.into());
        self
    }

    /// Mark an optional attribute the API fills in when left undeclared.
    ///
    /// An undeclared value matches whatever the API reports.
    pub fn computed(mut self, attribute: impl Into<String>) -> Self {
        self.computed.insert(attribute.into());
        self
    }

    pub fn is_computed(&self, attribute: &str) -> bool {
        self.computed.contains(attribute)
    }

    /// Build from an attribute-to-path table
    pub fn from_table<'a>(table: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        table
            .into_iter()
            .fold(Self::new(), |mask, (attr, path)| mask.leaf(attr, path))
    }

    pub fn rules(&self) -> &[MaskRule] {
        &self.rules
    }

    pub fn write_only_attributes(&self) -> impl Iterator<Item = &str> {
        self.write_only.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// API paths whose values differ between `old` and `new`.
    ///
    /// Sorted and de-duplicated, with `{version}` substituted.
    pub fn changed_paths(&self, old: &Entity, new: &Entity, version: &str) -> Vec<String> {
        let mut paths = BTreeSet::new();

        for rule in &self.rules {
            match rule {
                MaskRule::Leaf { attribute, path } => {
                    let declared = new.lookup(attribute).filter(|v| !v.is_null());
                    if declared.is_none() && self.is_computed(attribute) {
                        continue;
                    }
                    if !same_value(old.lookup(attribute), declared) {
                        paths.insert(substitute_version(path, version));
                    }
                }
                MaskRule::Nested { attribute, prefix } => {
                    let empty = BTreeMap::new();
                    let old_block = old
                        .lookup(attribute)
                        .and_then(Value::as_block)
                        .unwrap_or(&empty);
                    let new_block = new
                        .lookup(attribute)
                        .and_then(Value::as_block)
                        .unwrap_or(&empty);

                    let keys: BTreeSet<&String> = old_block.keys().chain(new_block.keys()).collect();
                    for key in keys {
                        if !same_value(old_block.get(key), new_block.get(key)) {
                            let prefix = substitute_version(prefix, version);
                            paths.insert(format!("{prefix}.{key}"));
                        }
                    }
                }
            }
        }

        paths.into_iter().collect()
    }

    /// Whether an attribute is covered by some rule
    pub fn covers(&self, attribute: &str) -> bool {
        self.rules.iter().any(|r| r.attribute() == attribute)
    }
}

/// Replace every `{version}` placeholder
pub fn substitute_version(path: &str, version: &str) -> String {
    path.replace(VERSION_PLACEHOLDER, version)
}
