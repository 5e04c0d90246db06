// SPDX-License-Identifier: MIT

//! Process-wide Event Type Registry (spec.md §4.5).
//!
//! Maps an event variant's runtime type to a stable string name used only in
//! snapshots and wire/debug traces — never consulted by dispatch itself,
//! which matches against the typed variant directly (spec.md §9 "typed
//! event dispatch over dynamic names").

use parking_lot::RwLock;
use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::sync::OnceLock;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EventRegistryError {
    #[error("event type already registered under a different name: {existing}")]
    Conflict { existing: String },
}

fn registry() -> &'static RwLock<HashMap<TypeId, &'static str>> {
    static REGISTRY: OnceLock<RwLock<HashMap<TypeId, &'static str>>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Register a stable wire name for event variant type `E`.
///
/// Re-registering the same type under the same name is a no-op. Registering
/// it under a *different* name fails — each variant maps to exactly one
/// name (spec.md §4.5 invariant).
pub fn register<E: 'static>(name: &'static str) -> Result<(), EventRegistryError> {
    let id = TypeId::of::<E>();
    let mut map = registry().write();
    match map.get(&id) {
        Some(existing) if *existing != name => {
            Err(EventRegistryError::Conflict { existing: existing.to_string() })
        }
        _ => {
            map.insert(id, name);
            Ok(())
        }
    }
}

/// Look up the stable wire name for event variant type `E`.
///
/// Falls back to the variant's unqualified type name (the last path
/// segment of [`std::any::type_name`]) when nothing was registered.
pub fn name_of<E: 'static>() -> String {
    let id = TypeId::of::<E>();
    if let Some(name) = registry().read().get(&id) {
        return (*name).to_string();
    }
    unqualified_type_name::<E>()
}

fn unqualified_type_name<E: 'static>() -> String {
    let full = type_name::<E>();
    full.rsplit("::").next().unwrap_or(full).to_string()
}

#[cfg(test)]
#[path = "event_registry_tests.rs"]
mod tests;