// SPDX-License-Identifier: MIT

//! An in-memory [`PersistenceProvider`], mainly for tests and for domains
//! that don't need durability across process restarts (spec.md §4.3
//! "no-op/in-memory variant").

use crate::error::PersistenceError;
use crate::provider::{PersistedState, PersistenceProvider};
use fsm_core::{ContextEntity, MachineId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::marker::PhantomData;

pub struct InMemoryProvider<C> {
    records: Mutex<HashMap<MachineId, PersistedState<C>>>,
    _marker: PhantomData<C>,
}

impl<C> InMemoryProvider<C> {
    pub fn new() -> Self {
        Self { records: Mutex::new(HashMap::new()), _marker: PhantomData }
    }
}

impl<C> Default for InMemoryProvider<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> PersistenceProvider<C> for InMemoryProvider<C>
where
    C: ContextEntity,
{
    fn save(&self, id: &MachineId, state: &PersistedState<C>) -> Result<(), PersistenceError> {
        self.records.lock().insert(id.clone(), state.clone());
        Ok(())
    }

    fn load(&self, id: &MachineId) -> Result<Option<PersistedState<C>>, PersistenceError> {
        Ok(self.records.lock().get(id).cloned())
    }

    fn delete(&self, id: &MachineId) -> Result<(), PersistenceError> {
        self.records.lock().remove(id);
        Ok(())
    }
}

#[cfg(test)]
#[path = "in_memory_tests.rs"]
mod tests;