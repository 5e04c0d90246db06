// SPDX-License-Identifier: MIT

//! The snapshot record emitted once per transition (spec.md §3, §4.6).

use crate::id::MachineId;
use serde::{Deserialize, Serialize};

/// Where a machine sits in the registry's in-memory map at a point in time
/// (spec.md §3 "Registry entry").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryStatus {
    /// No in-memory instance and no eviction has ever happened for this key.
    Absent,
    /// Resident in memory and eligible to receive events.
    RegisteredActive,
    /// Resident in memory but logically offline; transient, en route to eviction.
    RegisteredInactive,
    /// Evicted; only the durable record is authoritative.
    NotRegistered,
}

crate::simple_display! {
    RegistryStatus {
        Absent => "absent",
        RegisteredActive => "registered_active",
        RegisteredInactive => "registered_inactive",
        NotRegistered => "not_registered",
    }
}

/// An immutable record of a single transition (spec.md §3).
///
/// `version` is strictly increasing per machine across its entire lifetime
/// when a [history-append persistence
/// provider](../fsm_storage/trait.PersistenceProvider.html) is configured;
/// see DESIGN.md for the documented limit of this guarantee under the base
/// (non-history) persistence variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRecord<C> {
    pub machine_id: MachineId,
    pub version: u64,
    pub state_before: String,
    pub state_after: String,
    pub event_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_payload: Option<serde_json::Value>,
    pub context_before: C,
    pub context_after: C,
    pub timestamp_epoch_ms: u64,
    pub duration_nanos: u64,
    pub registry_status_before: RegistryStatus,
    pub registry_status_after: RegistryStatus,
    pub hydrated_before: bool,
    pub hydrated_after: bool,
}