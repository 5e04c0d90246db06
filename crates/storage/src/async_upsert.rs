// SPDX-License-Identifier: MIT

//! A decorator implementing spec.md §6's `persistence.mode = async-upsert`:
//! `save` is dispatched to a single background worker instead of running
//! synchronously inside the caller's `fire` (spec.md §4.3 "in the async case
//! the provider guarantees at-most-one concurrent write per key and
//! in-order delivery").
//!
//! The worker is one dedicated OS thread draining an unbounded FIFO channel,
//! not a `tokio::spawn`ed task — `PersistenceProvider::save` is a synchronous
//! trait method that the registry may call from a non-async call stack, so
//! requiring a `tokio::runtime::Handle` at construction would leak an async
//! dependency into every caller. A single worker thread gives the same
//! guarantees the spec asks for: one writer total trivially serializes any
//! one key, and the channel preserves submission order.

use crate::error::PersistenceError;
use crate::provider::{PersistedState, PersistenceProvider};
use fsm_core::{ContextEntity, MachineId};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

struct WriteJob<C> {
    id: MachineId,
    state: PersistedState<C>,
}

/// Wraps any [`PersistenceProvider`] and makes its `save` calls asynchronous.
///
/// `load`/`delete`/`last_version` still read through to the inner provider
/// directly, so a `load` issued immediately after an async `save` may not yet
/// observe it — the spec's async mode trades read-after-write consistency
/// for a non-blocking `fire` path, and documents no stronger guarantee.
pub struct AsyncUpsertProvider<C, P> {
    inner: Arc<P>,
    tx: Option<Sender<WriteJob<C>>>,
    pending: Arc<(Mutex<u64>, Condvar)>,
    worker: Option<JoinHandle<()>>,
}

impl<C, P> AsyncUpsertProvider<C, P>
where
    C: ContextEntity,
    P: PersistenceProvider<C> + Send + Sync + 'static,
{
    pub fn new(inner: P) -> Self {
        let inner = Arc::new(inner);
        let (tx, rx) = mpsc::channel::<WriteJob<C>>();
        let pending = Arc::new((Mutex::new(0u64), Condvar::new()));

        let worker_inner = Arc::clone(&inner);
        let worker_pending = Arc::clone(&pending);
        let spawned = std::thread::Builder::new().name("fsm-async-upsert".to_string()).spawn(move || {
            while let Ok(job) = rx.recv() {
                if let Err(err) = worker_inner.save(&job.id, &job.state) {
                    tracing::warn!(machine_id = %job.id, error = %err, "async-upsert background save failed");
                }
                let (lock, cvar) = &*worker_pending;
                let mut count = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                *count = count.saturating_sub(1);
                if *count == 0 {
                    cvar.notify_all();
                }
            }
        });

        // If the OS refuses to spawn the worker, degrade to a synchronous
        // fallback (`tx: None`, see `save`) rather than panicking — an
        // async-upsert provider that can't get a thread still has to honor
        // the `PersistenceProvider` contract.
        match spawned {
            Ok(worker) => Self { inner, tx: Some(tx), pending, worker: Some(worker) },
            Err(err) => {
                tracing::error!(error = %err, "failed to spawn fsm-async-upsert worker; falling back to synchronous saves");
                Self { inner, tx: None, pending, worker: None }
            }
        }
    }

    /// Block until every write accepted so far has reached the inner
    /// provider. Used by callers (e.g. `Registry::shutdown`) that need the
    /// spec.md §5 shutdown guarantee ("persists every resident machine
    /// once") to actually be durable before returning, not merely enqueued.
    pub fn flush(&self) {
        let (lock, cvar) = &*self.pending;
        let mut count = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        while *count > 0 {
            count = cvar.wait(count).unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }
}

impl<C, P> Drop for AsyncUpsertProvider<C, P> {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl<C, P> PersistenceProvider<C> for AsyncUpsertProvider<C, P>
where
    C: ContextEntity,
    P: PersistenceProvider<C> + Send + Sync + 'static,
{
    fn save(&self, id: &MachineId, state: &PersistedState<C>) -> Result<(), PersistenceError> {
        let Some(tx) = &self.tx else {
            // No worker thread (see `new`'s spawn-failure fallback): save
            // synchronously rather than silently dropping the write.
            return self.inner.save(id, state);
        };

        let (lock, _) = &*self.pending;
        *lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) += 1;
        let job = WriteJob { id: id.clone(), state: state.clone() };
        if tx.send(job).is_err() {
            tracing::warn!(machine_id = %id, "async-upsert worker gone, save dropped");
            let (lock, cvar) = &*self.pending;
            let mut count = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            *count = count.saturating_sub(1);
            cvar.notify_all();
        }
        Ok(())
    }

    fn load(&self, id: &MachineId) -> Result<Option<PersistedState<C>>, PersistenceError> {
        self.inner.load(id)
    }

    fn delete(&self, id: &MachineId) -> Result<(), PersistenceError> {
        self.inner.delete(id)
    }

    fn last_version(&self, id: &MachineId) -> Result<u64, PersistenceError> {
        self.inner.last_version(id)
    }
}

#[cfg(test)]
#[path = "async_upsert_tests.rs"]
mod tests;
