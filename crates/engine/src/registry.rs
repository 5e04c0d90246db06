// SPDX-License-Identifier: MIT

//! The Machine Registry (spec.md §4.2): owns `MachineId -> Machine` and
//! mediates every event delivery — creation, rehydration, routing, and the
//! automatic eviction triggers of spec.md §4.2.
//!
//! Concurrency discipline: per-machine lock (spec.md §5, first of the two
//! permitted disciplines; the per-machine-inbox alternative is documented
//! in DESIGN.md but not implemented). The resident map itself sits behind
//! a single `parking_lot::Mutex`, matching the teacher's
//! `Mutex<MaterializedState>` precedent — structural mutations (create,
//! evict) take that lock for the duration of the mutation; routing releases
//! it before calling into a individual machine's own lock.

use crate::config::{PayloadInclusion, RegistryConfig};
use crate::error::FsmError;
use crate::fsm::{Machine, MachineDeps};
use crate::scheduler::Scheduler;
use crate::snapshot::SnapshotRecorder;
use crate::template::FsmTemplate;
use fsm_core::{Clock, ContextEntity, MachineId, VolatileContext};
use fsm_storage::{PersistedState, PersistenceProvider};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Handle to a resident machine, shared with the caller so it can hold the
/// per-machine lock across a `fire` call without the registry's own lock.
pub type MachineHandle<E, C, V, Clk> = Arc<Mutex<Machine<E, C, V, Clk>>>;

pub struct Registry<E, C, V, Clk> {
    template: Arc<FsmTemplate<E, C, V>>,
    persistence: Arc<dyn PersistenceProvider<C>>,
    scheduler: Arc<Scheduler>,
    recorder: Option<Arc<dyn SnapshotRecorder>>,
    clock: Clk,
    config: RegistryConfig,
    machines: Mutex<HashMap<MachineId, MachineHandle<E, C, V, Clk>>>,
    eviction_listeners: Mutex<Vec<Box<dyn Fn(&MachineId) + Send + Sync>>>,
}

impl<E, C, V, Clk> Registry<E, C, V, Clk>
where
    E: 'static,
    C: ContextEntity,
    V: VolatileContext,
    Clk: Clock,
{
    pub fn new(template: Arc<FsmTemplate<E, C, V>>, persistence: Arc<dyn PersistenceProvider<C>>, clock: Clk, config: RegistryConfig) -> Self {
        Self {
            template,
            persistence,
            scheduler: Arc::new(Scheduler::new()),
            recorder: None,
            clock,
            config,
            machines: Mutex::new(HashMap::new()),
            eviction_listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn with_recorder(mut self, recorder: Arc<dyn SnapshotRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Register a listener invoked (with the evicted key) every time
    /// [`Registry::evict`] or [`Registry::remove`] removes a resident
    /// machine (spec.md §3 "Registry entry ... an eviction-observer for
    /// offline transitions").
    pub fn on_eviction(&self, listener: impl Fn(&MachineId) + Send + Sync + 'static) {
        self.eviction_listeners.lock().push(Box::new(listener));
    }

    pub fn is_in_memory(&self, id: &MachineId) -> bool {
        self.machines.lock().contains_key(id)
    }

    pub fn size(&self) -> usize {
        self.machines.lock().len()
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    fn deps(&self) -> MachineDeps<E, C, V, Clk> {
        MachineDeps {
            template: Arc::clone(&self.template),
            persistence: Arc::clone(&self.persistence),
            scheduler: Arc::clone(&self.scheduler),
            recorder: self.recorder.clone(),
            clock: self.clock.clone(),
            payload_inclusion: self.config.snapshot_payload_inclusion,
            snapshot_enabled: self.config.snapshot_enabled,
        }
    }

    /// spec.md §4.2 `create(id, factory)`: always instantiates a fresh
    /// machine. Fails with `DuplicateKey` if `id` is already resident,
    /// regardless of `registry.duplicatePolicy` — `create` is the explicit,
    /// caller-knows-best entry point; `createOrGet`/`route` are the ones
    /// that consult the policy implicitly by never racing a create.
    pub fn create(&self, id: MachineId, factory: impl FnOnce(&MachineId) -> C) -> Result<MachineHandle<E, C, V, Clk>, FsmError> {
        let mut machines = self.machines.lock();
        if machines.contains_key(&id) {
            return Err(FsmError::DuplicateKey(id));
        }
        let entity = factory(&id);
        let machine = Arc::new(Mutex::new(Machine::new(id.clone(), entity, V::default(), false, 0, self.deps())));
        machine.lock().start()?;
        machines.insert(id, Arc::clone(&machine));
        Ok(machine)
    }

    /// spec.md §4.2 `register(id, machine)`: explicit registration of an
    /// already-constructed machine (used by callers that built one outside
    /// the registry, e.g. to inject a pre-seeded volatile context).
    pub fn register(&self, id: MachineId, machine: MachineHandle<E, C, V, Clk>) -> Result<(), FsmError> {
        let mut machines = self.machines.lock();
        if machines.contains_key(&id) {
            return Err(FsmError::DuplicateKey(id));
        }
        machines.insert(id, machine);
        Ok(())
    }

    /// spec.md §4.2 `createOrGet(id, factory, loader?)`. `loader` from the
    /// spec's conceptual signature is this crate's `persistence` provider —
    /// domains that need a different durable source inject it at
    /// `Registry::new` time instead of per-call, since every call in this
    /// crate shares one provider (spec.md §5 "the persistence provider is
    /// shared").
    ///
    /// Returns `Ok(None)` exactly when the durable record says the machine
    /// already completed (spec.md §4.2 "completion short-circuit") — the
    /// single most important efficiency invariant in the spec, since it
    /// bounds memory under high-throughput replay of already-finished keys.
    pub fn create_or_get(&self, id: MachineId, factory: impl FnOnce(&MachineId) -> C) -> Result<Option<MachineHandle<E, C, V, Clk>>, FsmError> {
        let mut machines = self.machines.lock();
        if let Some(existing) = machines.get(&id) {
            return Ok(Some(Arc::clone(existing)));
        }

        // Whether a rehydration timeout actually fired synchronously (and
        // landed the machine in an offline/final state), which needs the
        // same post-fire eviction check `route` runs (spec.md §4.2's
        // triggers are not specific to routed events). A plain rehydration
        // into an already-offline state must NOT be evicted here — the
        // caller's routed event still needs to be dispatched against it.
        let (machine, check_eviction) = match self.persistence.load(&id)? {
            Some(persisted) => {
                if persisted.context.complete() {
                    tracing::debug!(machine_id = %id, "createOrGet short-circuited: durable record already complete");
                    return Ok(None);
                }
                let state_name = persisted.context.current_state().to_string();
                let machine = Arc::new(Mutex::new(Machine::new(id.clone(), persisted.context, V::default(), true, persisted.version, self.deps())));
                let mut timeout_fired = false;
                {
                    let mut guard = machine.lock();
                    guard.restore_state(&state_name)?;
                    if self.config.timeouts_enabled {
                        timeout_fired = self.rehydrate_timeout(&mut guard, &state_name);
                    }
                }
                tracing::info!(machine_id = %id, state = %state_name, "machine rehydrated from durable storage");
                (machine, timeout_fired)
            }
            None => {
                let entity = factory(&id);
                let machine = Arc::new(Mutex::new(Machine::new(id.clone(), entity, V::default(), false, 0, self.deps())));
                machine.lock().start()?;
                tracing::info!(machine_id = %id, "machine created on first route");
                (machine, false)
            }
        };

        machines.insert(id.clone(), Arc::clone(&machine));
        drop(machines);

        if check_eviction {
            let should_evict = {
                let guard = machine.lock();
                (self.config.eviction_on_final && guard.is_complete()) || (self.config.eviction_on_offline && guard.current_state_offline())
            };
            if should_evict {
                self.evict(&id);
            }
        }

        Ok(Some(machine))
    }

    /// spec.md §4.4's rehydration rule: a timeout armed against the
    /// persisted `last_state_change` either fires synchronously right here
    /// (if it's already overdue) or gets rescheduled for the remaining
    /// duration. Returns whether it fired synchronously — the caller uses
    /// this to decide whether the post-rehydration eviction check applies,
    /// since a plain rehydration into an already-offline/final state must
    /// stay resident long enough for the routed event to be dispatched.
    fn rehydrate_timeout(&self, machine: &mut Machine<E, C, V, Clk>, state_name: &str) -> bool {
        let Some(state) = self.template.state(state_name) else { return false };
        let Some((duration, target)) = &state.timeout else { return false };

        let elapsed_ms = self.clock.epoch_ms().saturating_sub(machine.persisting_entity().last_state_change());
        let elapsed = Duration::from_millis(elapsed_ms);

        if elapsed >= *duration {
            tracing::info!(
                machine_id = %machine.id(),
                state = %state_name,
                target = %target,
                elapsed_ms,
                "timeout overdue at rehydration, firing synchronously before createOrGet returns",
            );
            machine.fire_timeout(target, fsm_core::RegistryStatus::NotRegistered);
            true
        } else {
            let remaining = *duration - elapsed;
            self.scheduler.set_timer(machine.id().clone(), target.clone(), remaining, self.clock.now());
            false
        }
    }

    /// Drain every currently-due timeout and apply it against its resident
    /// machine, running the post-fire eviction checks exactly as `route`
    /// does. Intended to be polled periodically (e.g. from a
    /// `tokio::time::interval` loop) for machines that are resident and
    /// waiting on a state timeout rather than rehydrating.
    pub fn drain_expired_timeouts(&self) -> usize {
        if !self.config.timeouts_enabled {
            return 0;
        }
        let fired = self.scheduler.fired_timers(self.clock.now());
        let mut count = 0;
        for timeout in fired {
            let Some(machine) = self.machines.lock().get(&timeout.machine_id).cloned() else { continue };
            let (applied, should_evict) = {
                let mut guard = machine.lock();
                let applied = guard.fire_timeout(&timeout.target_state, fsm_core::RegistryStatus::RegisteredActive);
                let should_evict = applied && (guard.is_complete() || guard.current_state_offline());
                (applied, should_evict)
            };
            if applied {
                count += 1;
                if should_evict {
                    self.evict(&timeout.machine_id);
                }
            }
        }
        count
    }

    /// spec.md §4.2 `evict(id)`: persists once, removes from memory,
    /// invokes eviction listeners. Idempotent — evicting an absent key is a
    /// no-op.
    pub fn evict(&self, id: &MachineId) {
        let machine = self.machines.lock().remove(id);
        let Some(machine) = machine else { return };

        {
            let guard = machine.lock();
            let state = PersistedState { context: guard.persisting_entity().clone(), version: guard.version() };
            if let Err(err) = self.persistence.save(id, &state) {
                tracing::warn!(machine_id = %id, error = %err, "persistence save failed during eviction");
            }
        }
        self.scheduler.cancel_timer(id);
        self.notify_eviction(id);
    }

    /// spec.md §4.2 `remove(id)`: evict without persisting (test cleanup).
    pub fn remove(&self, id: &MachineId) {
        let removed = self.machines.lock().remove(id).is_some();
        if !removed {
            return;
        }
        self.scheduler.cancel_timer(id);
        self.notify_eviction(id);
    }

    fn notify_eviction(&self, id: &MachineId) {
        for listener in self.eviction_listeners.lock().iter() {
            listener(id);
        }
    }

    /// spec.md §5 "shutdown cancels the timeout scheduler, drains in-flight
    /// `fire` calls ..., persists every resident machine once, then
    /// releases resources." No separate drain step is needed here since
    /// this crate's `fire` is synchronous (spec.md §5 permits either
    /// discipline; this crate implements the per-machine-lock one, which
    /// has no in-flight async call to await).
    pub fn shutdown(&self) {
        let ids: Vec<MachineId> = self.machines.lock().keys().cloned().collect();
        for id in ids {
            self.evict(&id);
        }
    }
}

impl<E, C, V, Clk> Registry<E, C, V, Clk>
where
    E: Serialize + 'static,
    C: ContextEntity,
    V: VolatileContext,
    Clk: Clock,
{
    /// spec.md §4.2 `route(id, event, factory)`: resolves the machine via
    /// `createOrGet`, fires the event, and runs the automatic eviction
    /// triggers of spec.md §4.2 before returning. Returns `false` if the
    /// machine is complete (`MachineComplete`) or the durable record was
    /// already complete (short-circuited, no factory call).
    pub fn route(&self, id: MachineId, event: E, factory: impl FnOnce(&MachineId) -> C) -> Result<bool, FsmError> {
        let Some(machine) = self.create_or_get(id.clone(), factory)? else {
            return Ok(false);
        };

        let (applied, should_evict) = {
            let mut guard = machine.lock();
            let applied = guard.fire(event);
            let should_evict = applied
                && ((self.config.eviction_on_final && guard.is_complete())
                    || (self.config.eviction_on_offline && guard.current_state_offline()));
            (applied, should_evict)
        };

        if should_evict {
            self.evict(&id);
        }

        Ok(applied)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;