//! Merging of blueprint documents and values
//!
//! Two flavours of merge live here:
//!
//! - [`merge`] folds imported documents into one under the import rules:
//!   mergeable sections are deep-merged and any leaf written twice with
//!   different values is a conflict.
//! - [`Overlay`] is the permissive, overlay-wins merge used when a derived
//!   type or a node template refines the values it inherits.

use plinth_core::document::sections;
use plinth_core::error::Result;
use plinth_core::{BlueprintError, Document, Mapping};
use serde_json::Value;
use tracing::{debug, trace};

/// Sections deep-merged across documents.
pub const MERGEABLE_AT_ROOT: &[&str] = &[
    sections::TYPES,
    sections::INTERFACES,
    sections::PLUGINS,
    sections::WORKFLOWS,
    sections::INPUTS,
    sections::OUTPUTS,
];

/// Sections whose children are merged, one level down.
pub const MERGEABLE_AT_LEVEL_ONE: &[&str] = &[sections::POLICIES];

/// Sections that do not survive resolution.
pub const DROPPED: &[&str] = &[sections::IMPORTS];

/// How a top-level section is combined when several documents define it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionClass {
    Mergeable,
    NonMergeable,
    Dropped,
}

pub fn classify(section: &str) -> SectionClass {
    if DROPPED.contains(&section) {
        SectionClass::Dropped
    } else if MERGEABLE_AT_ROOT.contains(&section) || MERGEABLE_AT_LEVEL_ONE.contains(&section) {
        SectionClass::Mergeable
    } else {
        SectionClass::NonMergeable
    }
}

/// Fold `imported` (resolution order) and then `base` into one document.
///
/// The result carries `base`'s identifier and no `imports` section.
pub fn merge(base: Document, imported: Vec<Document>) -> Result<Document> {
    let id = base.id.clone();
    let mut merged = Mapping::new();
    for document in imported.iter().chain(std::iter::once(&base)) {
        trace!(document = document.display_id(), "merging document");
        for (section, value) in &document.body {
            merge_section(&mut merged, section, value)?;
        }
    }
    debug!(sections = merged.len(), "documents merged");
    Ok(Document::new(id, merged))
}

fn merge_section(merged: &mut Mapping, section: &str, value: &Value) -> Result<()> {
    match classify(section) {
        SectionClass::Dropped => Ok(()),
        SectionClass::Mergeable => match merged.get_mut(section) {
            Some(existing) => merge_strict(existing, value, section),
            None => {
                merged.insert(section.to_string(), value.clone());
                Ok(())
            }
        },
        SectionClass::NonMergeable => match merged.get(section) {
            Some(existing) if existing != value => Err(BlueprintError::NonMergeableConflict {
                section: section.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                merged.insert(section.to_string(), value.clone());
                Ok(())
            }
        },
    }
}

/// Deep-merge `incoming` into `existing`; differing leaves conflict.
fn merge_strict(existing: &mut Value, incoming: &Value, key: &str) -> Result<()> {
    if existing.is_null() {
        *existing = incoming.clone();
        return Ok(());
    }
    match (existing, incoming) {
        (Value::Object(into), Value::Object(from)) => {
            for (child, value) in from {
                let child_key = format!("{}.{}", key, child);
                match into.get_mut(child) {
                    Some(slot) => merge_strict(slot, value, &child_key)?,
                    None => {
                        into.insert(child.clone(), value.clone());
                    }
                }
            }
            Ok(())
        }
        (_, Value::Null) => Ok(()),
        (current, value) if *current == *value => Ok(()),
        _ => Err(BlueprintError::MergeConflict {
            key: key.to_string(),
        }),
    }
}

/// Overlay-wins deep merge.
///
/// - mappings merge entry by entry, recursively
/// - sequences and scalars are replaced by the overlay
/// - a `null` overlay keeps the base value
pub trait Overlay: Sized {
    fn overlay(self, other: Self) -> Self;

    /// Apply several overlays in order; later ones win.
    fn overlay_all<I>(self, overlays: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        overlays.into_iter().fold(self, |acc, next| acc.overlay(next))
    }
}

impl Overlay for Value {
    fn overlay(self, other: Self) -> Self {
        match (self, other) {
            (Value::Object(base), Value::Object(other)) => Value::Object(base.overlay(other)),
            (base, Value::Null) => base,
            (_, other) => other,
        }
    }
}

impl Overlay for Mapping {
    fn overlay(mut self, other: Self) -> Self {
        for (key, value) in other {
            match self.get_mut(&key) {
                Some(slot) => {
                    let base = slot.take();
                    *slot = base.overlay(value);
                }
                None => {
                    self.insert(key, value);
                }
            }
        }
        self
    }
}
