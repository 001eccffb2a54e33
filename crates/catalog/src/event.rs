//! Immutable event payloads fanned out to listeners on every mutation.

use atlas_core::CatalogItem;
use serde_json::Value;

/// A single changed property, captured as JSON values so listeners can
/// inspect old/new without knowing the entity kind.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyChange {
    pub name: &'static str,
    pub old: Value,
    pub new: Value,
}

impl PropertyChange {
    pub fn new(name: &'static str, old: Value, new: Value) -> Self {
        Self { name, old, new }
    }
}

#[derive(Debug, Clone)]
pub struct CatalogAddEvent {
    pub item: CatalogItem,
}

/// Fired before the in-memory entity is swapped: `item` is the *old* copy,
/// `changes` lists the tracked properties about to change.
#[derive(Debug, Clone)]
pub struct CatalogModifyEvent {
    pub item: CatalogItem,
    pub changes: Vec<PropertyChange>,
}

/// Fired after the in-memory entity is fully updated: `item` is the *new*
/// copy, so mid-transaction readers always observe a consistent object.
#[derive(Debug, Clone)]
pub struct CatalogPostModifyEvent {
    pub item: CatalogItem,
    pub changes: Vec<PropertyChange>,
}

#[derive(Debug, Clone)]
pub struct CatalogRemoveEvent {
    pub item: CatalogItem,
}

/// Look up a change by property name.
pub fn change<'a>(changes: &'a [PropertyChange], name: &str) -> Option<&'a PropertyChange> {
    changes.iter().find(|c| c.name == name)
}
