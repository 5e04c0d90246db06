// SPDX-License-Identifier: MIT

//! One FSM instance bound to a specific [`MachineId`] (spec.md §4.1).
//!
//! A `Machine` owns its [`ContextEntity`] and [`VolatileContext`] while
//! resident (spec.md §9 "ownership of mutable state") but not their
//! persistence — it holds a shared handle to a [`PersistenceProvider`] and
//! calls `save` as part of every successful transition, per the
//! best-effort-then-warn policy of spec.md §4.1's failure semantics.

use crate::config::PayloadInclusion;
use crate::error::FsmError;
use crate::scheduler::Scheduler;
use crate::snapshot::SnapshotRecorder;
use crate::state_config::StateConfig;
use crate::template::FsmTemplate;
use crate::transition::Transition;
use fsm_core::{event_name_of, ContextEntity, MachineId, RegistryStatus, SnapshotRecord, VolatileContext};
use fsm_core::Clock;
use fsm_storage::{PersistedState, PersistenceProvider};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// Everything a [`Machine`] needs beyond the template and the entity
/// itself: its shared collaborators. Grouped into one struct so
/// `Registry::instantiate` doesn't grow an ever-longer positional argument
/// list (spec.md §9 doesn't mandate this shape; it mirrors the teacher's
/// `RuntimeDeps` bundle in `oj-engine`).
pub(crate) struct MachineDeps<E, C, V, Clk> {
    pub template: Arc<FsmTemplate<E, C, V>>,
    pub persistence: Arc<dyn PersistenceProvider<C>>,
    pub scheduler: Arc<Scheduler>,
    pub recorder: Option<Arc<dyn SnapshotRecorder>>,
    pub clock: Clk,
    pub payload_inclusion: PayloadInclusion,
    pub snapshot_enabled: bool,
}

/// One FSM instance (spec.md §3 "FSM instance").
pub struct Machine<E, C, V, Clk> {
    id: MachineId,
    template: Arc<FsmTemplate<E, C, V>>,
    entity: C,
    volatile: V,
    started: bool,
    version: u64,
    hydrated: bool,
    clock: Clk,
    scheduler: Arc<Scheduler>,
    persistence: Arc<dyn PersistenceProvider<C>>,
    recorder: Option<Arc<dyn SnapshotRecorder>>,
    payload_inclusion: PayloadInclusion,
    snapshot_enabled: bool,
}

impl<E, C, V, Clk> Machine<E, C, V, Clk>
where
    E: 'static,
    C: ContextEntity,
    V: VolatileContext,
    Clk: Clock,
{
    pub(crate) fn new(id: MachineId, entity: C, volatile: V, hydrated: bool, version: u64, deps: MachineDeps<E, C, V, Clk>) -> Self {
        Self {
            id,
            template: deps.template,
            entity,
            volatile,
            started: false,
            version,
            hydrated,
            clock: deps.clock,
            scheduler: deps.scheduler,
            persistence: deps.persistence,
            recorder: deps.recorder,
            payload_inclusion: deps.payload_inclusion,
            snapshot_enabled: deps.snapshot_enabled,
        }
    }

    pub fn id(&self) -> &MachineId {
        &self.id
    }

    pub fn current_state(&self) -> &str {
        self.entity.current_state()
    }

    pub fn is_complete(&self) -> bool {
        self.entity.complete()
    }

    pub fn persisting_entity(&self) -> &C {
        &self.entity
    }

    pub fn volatile_context(&self) -> &V {
        &self.volatile
    }

    pub fn volatile_context_mut(&mut self) -> &mut V {
        &mut self.volatile
    }

    pub(crate) fn version(&self) -> u64 {
        self.version
    }

    /// Whether the current state is marked `offline` (spec.md GLOSSARY).
    /// Consulted by the registry after a successful `fire` to decide
    /// automatic eviction (spec.md §4.2).
    pub fn current_state_offline(&self) -> bool {
        self.template.state(self.current_state()).map(|s| s.offline).unwrap_or(false)
    }

    pub fn current_state_final(&self) -> bool {
        self.template.state(self.current_state()).map(|s| s.final_state).unwrap_or(false)
    }

    /// spec.md §4.1 `start()`: runs the initial state's entry action, arms
    /// its timeout, and persists the initial snapshot. Idempotent only
    /// before the first event — a second call fails with `InvalidLifecycle`.
    pub fn start(&mut self) -> Result<(), FsmError> {
        if self.started {
            return Err(FsmError::InvalidLifecycle("start called on an already-started machine"));
        }
        self.started = true;

        let template = Arc::clone(&self.template);
        let state_name = template.initial_state().to_string();
        let started_at = self.clock.now();
        let context_before = self.entity.clone();

        self.entity.set_current_state(&state_name);
        self.entity.set_last_state_change(self.clock.epoch_ms());

        let cfg = template.state(&state_name).expect("builder validated the initial state exists");
        if let Some(entry) = &cfg.entry {
            if let Err(err) = entry(&mut self.entity, &mut self.volatile) {
                tracing::error!(machine_id = %self.id, state = %state_name, error = %err, "initial state entry action failed");
                return Err(FsmError::TransitionFailure(err));
            }
        }

        self.version += 1;
        self.persist();
        self.arm_timeout(cfg);

        let status_after = if cfg.offline { RegistryStatus::RegisteredInactive } else { RegistryStatus::RegisteredActive };
        self.emit_snapshot(
            "Start",
            None,
            &state_name,
            &state_name,
            context_before,
            started_at,
            RegistryStatus::NotRegistered,
            status_after,
        );

        if cfg.final_state {
            self.entity.set_complete(true);
        }

        tracing::info!(machine_id = %self.id, state = %state_name, "machine started");
        Ok(())
    }

    /// spec.md §4.1 `restoreState(name)`: sets the current state without
    /// running entry actions. Callers (the registry) must follow this with
    /// the timeout re-evaluation of spec.md §4.4.
    pub fn restore_state(&mut self, name: &str) -> Result<(), FsmError> {
        if !self.template.contains_state(name) {
            return Err(FsmError::UnknownState(name.to_string()));
        }
        self.started = true;
        self.entity.set_current_state(name);
        Ok(())
    }

    /// Unconditionally transitions to `target`, bypassing transition
    /// matching. Driven by the timeout scheduler — both the rehydration
    /// elapsed-time check (spec.md §4.4) and the steady-state timer pump
    /// call this rather than `fire`, since a timeout is not a typed event
    /// `E`.
    pub(crate) fn fire_timeout(&mut self, target: &str, status_before: RegistryStatus) -> bool {
        if self.is_complete() {
            return false;
        }
        let state_name = self.current_state().to_string();
        self.transition_to(&state_name, target, "Timeout", None, status_before)
    }

    fn arm_timeout(&self, cfg: &StateConfig<E, C, V>) {
        if let Some((duration, target)) = &cfg.timeout {
            self.scheduler.set_timer(self.id.clone(), target.clone(), *duration, self.clock.now());
        }
    }

    fn persist(&self) {
        let state = PersistedState { context: self.entity.clone(), version: self.version };
        if let Err(err) = self.persistence.save(&self.id, &state) {
            tracing::warn!(machine_id = %self.id, error = %err, "persistence save failed; continuing best-effort (spec.md §4.1)");
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn emit_snapshot(
        &self,
        event_name: &str,
        payload: Option<Value>,
        state_before: &str,
        state_after: &str,
        context_before: C,
        started_at: Instant,
        status_before: RegistryStatus,
        status_after: RegistryStatus,
    ) {
        let Some(recorder) = &self.recorder else { return };
        if !self.snapshot_enabled {
            return;
        }
        let record = SnapshotRecord {
            machine_id: self.id.clone(),
            version: self.version,
            state_before: state_before.to_string(),
            state_after: state_after.to_string(),
            event_name: event_name.to_string(),
            event_payload: payload,
            context_before,
            context_after: self.entity.clone(),
            timestamp_epoch_ms: self.clock.epoch_ms(),
            duration_nanos: started_at.elapsed().as_nanos() as u64,
            registry_status_before: status_before,
            registry_status_after: status_after,
            hydrated_before: self.hydrated,
            hydrated_after: self.hydrated,
        };
        recorder.record(record);
    }

    /// Shared core of both a `Target` transition (spec.md §4.1 step 2) and
    /// a timeout firing (spec.md §4.4): run exit, mutate state, run entry,
    /// persist, snapshot, re-arm the timeout. On an entry/exit failure the
    /// entity is rolled back to its pre-transition snapshot and the call
    /// returns `false` without persisting or emitting — spec.md §4.1
    /// "entity is not mutated, the snapshot is not emitted" (the volatile
    /// context is not rolled back; see DESIGN.md Open Question (a)).
    fn transition_to(&mut self, current_state: &str, target: &str, event_name: &str, payload: Option<Value>, status_before: RegistryStatus) -> bool {
        let template = Arc::clone(&self.template);
        let Some(from_cfg) = template.state(current_state) else {
            tracing::error!(machine_id = %self.id, state = %current_state, "current state missing from template");
            return false;
        };
        let Some(target_cfg) = template.state(target) else {
            tracing::error!(machine_id = %self.id, state = %target, "transition target missing from template");
            return false;
        };

        let started_at = self.clock.now();
        let backup = self.entity.clone();

        if let Some(exit) = &from_cfg.exit {
            if let Err(err) = exit(&mut self.entity, &mut self.volatile) {
                tracing::error!(machine_id = %self.id, state = %current_state, error = %err, "exit action failed, transition dropped");
                self.entity = backup;
                return false;
            }
        }

        self.entity.set_current_state(target);
        self.entity.set_last_state_change(self.clock.epoch_ms());

        if let Some(entry) = &target_cfg.entry {
            if let Err(err) = entry(&mut self.entity, &mut self.volatile) {
                tracing::error!(machine_id = %self.id, state = %target, error = %err, "entry action failed, transition dropped");
                self.entity = backup;
                return false;
            }
        }

        self.version += 1;
        self.persist();

        self.scheduler.cancel_timer(&self.id);
        self.arm_timeout(target_cfg);

        let status_after = if target_cfg.offline { RegistryStatus::RegisteredInactive } else { RegistryStatus::RegisteredActive };
        self.emit_snapshot(event_name, payload, current_state, target, backup, started_at, status_before, status_after);

        if target_cfg.final_state {
            self.entity.set_complete(true);
        }

        tracing::info!(machine_id = %self.id, from = %current_state, to = %target, event = %event_name, "transition applied");
        true
    }
}

impl<E, C, V, Clk> Machine<E, C, V, Clk>
where
    E: Serialize + 'static,
    C: ContextEntity,
    V: VolatileContext,
    Clk: Clock,
{
    /// spec.md §4.1 `fire(event)`: dispatch one event against the current
    /// state's declared transitions, in declaration order. Never raises —
    /// errors from a caller-supplied action are logged and folded into a
    /// `false` return (spec.md §7 "the FSM runtime never raises across
    /// `fire`").
    pub fn fire(&mut self, event: E) -> bool {
        if self.is_complete() {
            tracing::debug!(machine_id = %self.id, "fire on a completed machine dropped (MachineComplete)");
            return false;
        }

        let template = Arc::clone(&self.template);
        let state_name = self.current_state().to_string();
        let Some(state_cfg) = template.state(&state_name) else {
            tracing::error!(machine_id = %self.id, state = %state_name, "current state missing from template");
            return false;
        };
        let Some(transition) = state_cfg.matching_transition(&event) else {
            // spec.md §4.1 step 3: invalid transition, silently discarded.
            return false;
        };

        let event_name = event_name_of::<E>();
        let payload = self.encode_payload(&event);

        match transition {
            Transition::Stay { handler, .. } => {
                let started_at = self.clock.now();
                let context_before = self.entity.clone();
                if let Err(err) = handler(&mut self.entity, &mut self.volatile, &event) {
                    tracing::error!(machine_id = %self.id, state = %state_name, error = %err, "stay handler failed, transition dropped");
                    self.entity = context_before;
                    return false;
                }
                self.entity.set_last_state_change(self.clock.epoch_ms());
                self.version += 1;
                self.persist();
                self.emit_snapshot(
                    &event_name,
                    payload,
                    &state_name,
                    &state_name,
                    context_before,
                    started_at,
                    RegistryStatus::RegisteredActive,
                    RegistryStatus::RegisteredActive,
                );
                tracing::info!(machine_id = %self.id, state = %state_name, event = %event_name, "stay transition applied");
                true
            }
            Transition::Target { target, .. } => {
                let target = target.clone();
                self.transition_to(&state_name, &target, &event_name, payload, RegistryStatus::RegisteredActive)
            }
        }
    }

    fn encode_payload(&self, event: &E) -> Option<Value> {
        match self.payload_inclusion {
            PayloadInclusion::None => None,
            PayloadInclusion::Full => serde_json::to_value(event).ok(),
            PayloadInclusion::Redacted => serde_json::to_value(event).ok().map(|_| Value::String("<redacted>".to_string())),
        }
    }
}

#[cfg(test)]
#[path = "fsm_tests.rs"]
mod tests;