// SPDX-License-Identifier: MIT

//! A JSON-per-key, file-backed [`PersistenceProvider`] (spec.md §4.3).
//!
//! One file per machine key under a configured root directory. Writes go
//! through a temp-file-then-rename to avoid torn writes, and the previous
//! generation is rotated into `.bak` files rather than simply overwritten.

use crate::error::PersistenceError;
use crate::provider::{PersistedState, PersistenceProvider};
use fsm_core::{ContextEntity, MachineId};
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

const MAX_BAK_FILES: u32 = 3;

/// Rotate `.bak` / `.bak.N` files out before a record is overwritten.
///
/// Keeps up to [`MAX_BAK_FILES`] backups: `.bak`, `.bak.2`, `.bak.3`. The
/// oldest is dropped when the limit is reached.
fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }

    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }

    bak(1)
}

/// Escape path separators so a machine key can never climb out of `root`.
///
/// `MachineId` only guarantees non-empty and within-length-bound (spec.md
/// §3); it places no constraint on which bytes a caller supplies, so the
/// file-backed provider has to defend its own directory boundary.
pub(crate) fn sanitize_component(raw: &str) -> String {
    raw.replace('%', "%25").replace('/', "%2F").replace('\\', "%5C")
}

pub struct FileProvider<C> {
    root: PathBuf,
    _marker: PhantomData<C>,
}

impl<C> FileProvider<C> {
    /// Create a provider rooted at `root`, creating the directory if absent.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root, _marker: PhantomData })
    }

    fn record_path(&self, id: &MachineId) -> PathBuf {
        self.root.join(format!("{}.json", sanitize_component(id.as_str())))
    }
}

impl<C> PersistenceProvider<C> for FileProvider<C>
where
    C: ContextEntity,
{
    fn save(&self, id: &MachineId, state: &PersistedState<C>) -> Result<(), PersistenceError> {
        let path = self.record_path(id);
        if path.exists() {
            let bak = rotate_bak_path(&path);
            fs::rename(&path, bak)?;
        }

        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(state)?;
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn load(&self, id: &MachineId) -> Result<Option<PersistedState<C>>, PersistenceError> {
        let path = self.record_path(id);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn delete(&self, id: &MachineId) -> Result<(), PersistenceError> {
        let path = self.record_path(id);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;