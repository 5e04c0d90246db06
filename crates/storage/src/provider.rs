// SPDX-License-Identifier: MIT

//! The [`PersistenceProvider`] abstraction (spec.md §4.3).

use crate::error::PersistenceError;
use fsm_core::{ContextEntity, MachineId};
use serde::{Deserialize, Serialize};

/// Everything the registry needs to rehydrate a machine: its durable
/// context plus the version it was last saved at (spec.md §3, §9 "version
/// monotonicity").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedState<C> {
    pub context: C,
    pub version: u64,
}

/// Keyed save/load/delete of a machine's durable context (spec.md §4.3).
///
/// A provider has no opinion on *when* it is called — the registry decides
/// save-on-every-transition vs. save-on-eviction-only. It only has to make
/// `save` then `load` round-trip and `delete` remove the record entirely.
pub trait PersistenceProvider<C>: Send + Sync
where
    C: ContextEntity,
{
    fn save(&self, id: &MachineId, state: &PersistedState<C>) -> Result<(), PersistenceError>;

    fn load(&self, id: &MachineId) -> Result<Option<PersistedState<C>>, PersistenceError>;

    fn delete(&self, id: &MachineId) -> Result<(), PersistenceError>;

    /// The version of the last record saved for `id`, or `0` if none.
    ///
    /// Base providers only ever hold a single record per key and overwrite
    /// it on every save, so this defaults to reading that record's version.
    /// [`crate::HistoryAppendProvider`] overrides it with the true
    /// last-appended version, which is the only configuration under which
    /// spec.md §3's "strictly increasing across the machine's entire
    /// lifetime" guarantee holds across an eviction/rehydration cycle — see
    /// DESIGN.md.
    fn last_version(&self, id: &MachineId) -> Result<u64, PersistenceError> {
        Ok(self.load(id)?.map(|s| s.version).unwrap_or(0))
    }
}