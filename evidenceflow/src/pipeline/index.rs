//! Reverse index over stage property metadata.

use serde_json::Value;
use std::collections::HashMap;

use crate::core::{PropertyMap, PropertyMeta};

/// One indexed property: the declaring stage and the property's metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedProperty {
    /// Key of the stage that declared the property.
    pub stage_key: String,
    /// The property's full metadata.
    pub meta: PropertyMeta,
}

/// Reverse index from (metadata field, metadata value) to the properties
/// carrying them.
///
/// Field names, metadata values and property names are stored lowercase.
/// Only string metadata values are indexed. The index holds exactly one
/// entry per (field, value, property) for the currently-registered version
/// of each stage's properties: re-indexing a stage purges everything
/// attributed to its key before re-inserting.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MetadataIndex {
    entries: HashMap<String, HashMap<String, HashMap<String, IndexedProperty>>>,
}

impl MetadataIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes every entry attributed to the given stage.
    ///
    /// Emptied inner maps are pruned, so a purge-and-rebuild yields a
    /// structure identical to a fresh build.
    pub fn purge_stage(&mut self, stage_key: &str) {
        for by_value in self.entries.values_mut() {
            for by_property in by_value.values_mut() {
                by_property.retain(|_, indexed| indexed.stage_key != stage_key);
            }
            by_value.retain(|_, by_property| !by_property.is_empty());
        }
        self.entries.retain(|_, by_value| !by_value.is_empty());
    }

    /// Inserts entries for every (field, value) pair in a stage's
    /// properties.
    pub fn index_stage(&mut self, stage_key: &str, properties: &PropertyMap) {
        for (name, meta) in properties {
            let name = name.to_lowercase();
            for (field, value) in meta {
                // Non-string metadata values are not indexable
                let Value::String(value) = value else { continue };
                self.entries
                    .entry(field.to_lowercase())
                    .or_default()
                    .entry(value.to_lowercase())
                    .or_default()
                    .insert(
                        name.clone(),
                        IndexedProperty {
                            stage_key: stage_key.to_owned(),
                            meta: meta.clone(),
                        },
                    );
            }
        }
    }

    /// Properties whose metadata field carries the given value, as
    /// (property name, owning stage key) pairs. Inputs are lowercased
    /// before lookup.
    #[must_use]
    pub fn query(&self, field: &str, value: &str) -> Vec<(String, String)> {
        self.entries
            .get(&field.to_lowercase())
            .and_then(|by_value| by_value.get(&value.to_lowercase()))
            .map(|by_property| {
                by_property
                    .iter()
                    .map(|(name, indexed)| (name.clone(), indexed.stage_key.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// True if the index holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
