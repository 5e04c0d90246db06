// SPDX-License-Identifier: MIT

//! Recognized configuration surface (spec.md §6, §9 "ambient concerns").
//!
//! Following `oj-core`'s `JobConfig`/`JobConfigBuilder` shape: a plain data
//! struct plus a builder that exposes fluent setters via the `setters!`
//! macro and a `build()` that assembles the final, immutable value.

/// How a transition's entity mutation reaches durable storage (spec.md §6
/// `persistence.mode`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceMode {
    /// Save is called synchronously inside `fire`, before it returns.
    SyncUpsert,
    /// Save is dispatched to a background task; the provider guarantees
    /// at-most-one concurrent write per key and in-order delivery (spec.md
    /// §4.3).
    AsyncUpsert,
    /// Same as `SyncUpsert`, additionally appending a versioned audit row
    /// (spec.md §4.3 "History append").
    HistoryAppend,
    /// No durable backing at all; rehydration is impossible (spec.md §4.3
    /// "No-op / in-memory").
    InMemoryOnly,
}

/// How much of an event's payload a snapshot carries (spec.md §6
/// `snapshot.payloadInclusion`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadInclusion {
    /// Serialize the event as-is.
    Full,
    /// Serialize, then replace the value with a redaction marker. A real
    /// field-level redaction policy is domain-specific and out of scope
    /// for this core (see DESIGN.md).
    Redacted,
    /// Never serialize; `event_payload` is always `None`.
    None,
}

/// What `Registry::register`/`Registry::create` do when a key already has
/// a resident machine (spec.md §6 `registry.duplicatePolicy`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Fail with `DuplicateKey` (spec.md default).
    Reject,
    /// Replace the resident machine with the new one, evicting the old
    /// instance without persisting it again.
    Replace,
}

crate::simple_display! {
    PersistenceMode {
        SyncUpsert => "sync-upsert",
        AsyncUpsert => "async-upsert",
        HistoryAppend => "history-append",
        InMemoryOnly => "in-memory-only",
    }
}

crate::simple_display! {
    PayloadInclusion {
        Full => "full",
        Redacted => "redacted",
        None => "none",
    }
}

crate::simple_display! {
    DuplicatePolicy {
        Reject => "reject",
        Replace => "replace",
    }
}

/// Recognized registry-wide configuration (spec.md §6).
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub persistence_mode: PersistenceMode,
    pub timeouts_enabled: bool,
    pub snapshot_enabled: bool,
    pub snapshot_payload_inclusion: PayloadInclusion,
    pub eviction_on_offline: bool,
    pub eviction_on_final: bool,
    pub duplicate_policy: DuplicatePolicy,
}

impl RegistryConfig {
    pub fn builder() -> RegistryConfigBuilder {
        RegistryConfigBuilder::default()
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            persistence_mode: PersistenceMode::SyncUpsert,
            timeouts_enabled: true,
            snapshot_enabled: false,
            snapshot_payload_inclusion: PayloadInclusion::Full,
            eviction_on_offline: true,
            eviction_on_final: true,
            duplicate_policy: DuplicatePolicy::Reject,
        }
    }
}

pub struct RegistryConfigBuilder {
    persistence_mode: PersistenceMode,
    timeouts_enabled: bool,
    snapshot_enabled: bool,
    snapshot_payload_inclusion: PayloadInclusion,
    eviction_on_offline: bool,
    eviction_on_final: bool,
    duplicate_policy: DuplicatePolicy,
}

impl Default for RegistryConfigBuilder {
    fn default() -> Self {
        let defaults = RegistryConfig::default();
        Self {
            persistence_mode: defaults.persistence_mode,
            timeouts_enabled: defaults.timeouts_enabled,
            snapshot_enabled: defaults.snapshot_enabled,
            snapshot_payload_inclusion: defaults.snapshot_payload_inclusion,
            eviction_on_offline: defaults.eviction_on_offline,
            eviction_on_final: defaults.eviction_on_final,
            duplicate_policy: defaults.duplicate_policy,
        }
    }
}

impl RegistryConfigBuilder {
    fsm_core::setters! {
        set {
            persistence_mode: PersistenceMode,
            timeouts_enabled: bool,
            snapshot_enabled: bool,
            snapshot_payload_inclusion: PayloadInclusion,
            eviction_on_offline: bool,
            eviction_on_final: bool,
            duplicate_policy: DuplicatePolicy,
        }
    }

    pub fn build(self) -> RegistryConfig {
        RegistryConfig {
            persistence_mode: self.persistence_mode,
            timeouts_enabled: self.timeouts_enabled,
            snapshot_enabled: self.snapshot_enabled,
            snapshot_payload_inclusion: self.snapshot_payload_inclusion,
            eviction_on_offline: self.eviction_on_offline,
            eviction_on_final: self.eviction_on_final,
            duplicate_policy: self.duplicate_policy,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;