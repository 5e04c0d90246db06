// SPDX-License-Identifier: MIT

//! A decorator that layers an append-only audit trail on top of another
//! [`PersistenceProvider`] (spec.md §4.3 "optional history-append variant").
//!
//! Every `save` both forwards to the inner provider (so `load` keeps
//! returning the latest state cheaply) and appends a line to a per-key
//! `.history.jsonl` file. `last_version` reads that file's last line, which
//! is the only provider in this crate where spec.md §3's "version strictly
//! increasing across the machine's entire lifetime" guarantee survives an
//! eviction/rehydration cycle — see DESIGN.md.

use crate::error::PersistenceError;
use crate::provider::{PersistedState, PersistenceProvider};
use fsm_core::{ContextEntity, MachineId};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

pub struct HistoryAppendProvider<C, P> {
    inner: P,
    history_root: PathBuf,
    _marker: std::marker::PhantomData<C>,
}

impl<C, P> HistoryAppendProvider<C, P>
where
    P: PersistenceProvider<C>,
    C: ContextEntity,
{
    pub fn new(inner: P, history_root: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let history_root = history_root.into();
        fs::create_dir_all(&history_root)?;
        Ok(Self { inner, history_root, _marker: std::marker::PhantomData })
    }

    fn history_path(&self, id: &MachineId) -> PathBuf {
        self.history_root.join(format!("{}.history.jsonl", crate::file::sanitize_component(id.as_str())))
    }

    fn append_line(&self, id: &MachineId, state: &PersistedState<C>) -> Result<(), PersistenceError> {
        let last = self.last_version(id)?;
        if state.version <= last && last != 0 {
            return Err(PersistenceError::VersionOutOfOrder {
                machine_id: id.clone(),
                last,
                attempted: state.version,
            });
        }

        let mut file = OpenOptions::new().create(true).append(true).open(self.history_path(id))?;
        let line = serde_json::to_string(state)?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}

impl<C, P> PersistenceProvider<C> for HistoryAppendProvider<C, P>
where
    P: PersistenceProvider<C>,
    C: ContextEntity,
{
    fn save(&self, id: &MachineId, state: &PersistedState<C>) -> Result<(), PersistenceError> {
        self.append_line(id, state)?;
        self.inner.save(id, state)
    }

    fn load(&self, id: &MachineId) -> Result<Option<PersistedState<C>>, PersistenceError> {
        self.inner.load(id)
    }

    fn delete(&self, id: &MachineId) -> Result<(), PersistenceError> {
        let path = self.history_path(id);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        self.inner.delete(id)
    }

    fn last_version(&self, id: &MachineId) -> Result<u64, PersistenceError> {
        let path = self.history_path(id);
        if !path.exists() {
            return Ok(0);
        }
        let file = fs::File::open(&path)?;
        let mut last = 0u64;
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: PersistedState<C> = serde_json::from_str(&line)?;
            last = record.version;
        }
        Ok(last)
    }
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;