// SPDX-License-Identifier: MIT

use super::*;
use crate::builder::FsmBuilder;
use fsm_core::{ContextEntity, FakeClock, MachineId};
use fsm_storage::InMemoryProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CallCtx {
    state: String,
    changed_ms: u64,
    complete: bool,
}

impl ContextEntity for CallCtx {
    fn current_state(&self) -> &str {
        &self.state
    }
    fn set_current_state(&mut self, state: &str) {
        self.state = state.to_string();
    }
    fn last_state_change(&self) -> u64 {
        self.changed_ms
    }
    fn set_last_state_change(&mut self, epoch_ms: u64) {
        self.changed_ms = epoch_ms;
    }
    fn complete(&self) -> bool {
        self.complete
    }
    fn set_complete(&mut self, complete: bool) {
        self.complete = complete;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum CallEvent {
    Incoming,
    Answer,
    Hangup,
}

fn template() -> Arc<FsmTemplate<CallEvent, CallCtx, ()>> {
    Arc::new(
        FsmBuilder::new()
            .initial_state("Idle")
            .state("Idle", |s| s.on(|e| matches!(e, CallEvent::Incoming), "Ringing"))
            .state("Ringing", |s| {
                s.on(|e| matches!(e, CallEvent::Answer), "Connected").timeout(Duration::from_secs(5), "Idle").offline()
            })
            .state("Connected", |s| s.on(|e| matches!(e, CallEvent::Hangup), "Final"))
            .state("Final", |s| s.final_state())
            .build()
            .unwrap(),
    )
}

fn registry(persistence: Arc<InMemoryProvider<CallCtx>>, clock: FakeClock) -> Registry<CallEvent, CallCtx, (), FakeClock> {
    Registry::new(template(), persistence, clock, RegistryConfig::default())
}

fn no_factory(_id: &MachineId) -> CallCtx {
    CallCtx::default()
}

#[test]
fn route_creates_then_evicts_on_offline_transition() {
    let persistence = Arc::new(InMemoryProvider::new());
    let reg = registry(persistence.clone(), FakeClock::new());
    let id = MachineId::parse("k1").unwrap();

    assert!(reg.route(id.clone(), CallEvent::Incoming, no_factory).unwrap());
    assert_eq!(reg.size(), 0); // Ringing is offline; evicted after fire returns
    assert!(!reg.is_in_memory(&id));

    let persisted = persistence.load(&id).unwrap().unwrap();
    assert_eq!(persisted.context.current_state(), "Ringing");
    assert!(!persisted.context.complete());
}

#[test]
fn route_rehydrates_an_evicted_machine() {
    let persistence = Arc::new(InMemoryProvider::new());
    let reg = registry(persistence.clone(), FakeClock::new());
    let id = MachineId::parse("k1").unwrap();

    reg.route(id.clone(), CallEvent::Incoming, no_factory).unwrap();
    assert!(!reg.is_in_memory(&id));

    assert!(reg.route(id.clone(), CallEvent::Answer, no_factory).unwrap());
    assert!(reg.is_in_memory(&id));
    assert_eq!(reg.size(), 1);

    let handle = reg.create_or_get(id, no_factory).unwrap().unwrap();
    assert_eq!(handle.lock().current_state(), "Connected");
}

#[test]
fn route_evicts_on_final_and_marks_complete() {
    let persistence = Arc::new(InMemoryProvider::new());
    let reg = registry(persistence.clone(), FakeClock::new());
    let id = MachineId::parse("k1").unwrap();

    reg.route(id.clone(), CallEvent::Incoming, no_factory).unwrap();
    reg.route(id.clone(), CallEvent::Answer, no_factory).unwrap();
    assert!(reg.route(id.clone(), CallEvent::Hangup, no_factory).unwrap());

    assert!(!reg.is_in_memory(&id));
    let persisted = persistence.load(&id).unwrap().unwrap();
    assert_eq!(persisted.context.current_state(), "Final");
    assert!(persisted.context.complete());
}

#[test]
fn create_or_get_short_circuits_completed_machines() {
    let persistence = Arc::new(InMemoryProvider::new());
    persistence
        .save(
            &MachineId::parse("k1").unwrap(),
            &fsm_storage::PersistedState { context: CallCtx { state: "Final".to_string(), changed_ms: 0, complete: true }, version: 4 },
        )
        .unwrap();
    let reg = registry(persistence, FakeClock::new());
    let id = MachineId::parse("k1").unwrap();

    let machine = reg.create_or_get(id, no_factory).unwrap();
    assert!(machine.is_none());
    assert_eq!(reg.size(), 0);
}

#[test]
fn route_to_completed_machine_returns_false() {
    let persistence = Arc::new(InMemoryProvider::new());
    persistence
        .save(
            &MachineId::parse("k1").unwrap(),
            &fsm_storage::PersistedState { context: CallCtx { state: "Final".to_string(), changed_ms: 0, complete: true }, version: 4 },
        )
        .unwrap();
    let reg = registry(persistence, FakeClock::new());
    let id = MachineId::parse("k1").unwrap();

    assert!(!reg.route(id, CallEvent::Hangup, no_factory).unwrap());
}

#[test]
fn create_fails_on_duplicate_key() {
    let persistence = Arc::new(InMemoryProvider::new());
    let reg = registry(persistence, FakeClock::new());
    let id = MachineId::parse("k1").unwrap();

    reg.create(id.clone(), no_factory).unwrap();
    let err = reg.create(id, no_factory).unwrap_err();
    assert!(matches!(err, FsmError::DuplicateKey(_)));
}

#[test]
fn invalid_event_does_not_change_registry_state() {
    let persistence = Arc::new(InMemoryProvider::new());
    let reg = registry(persistence, FakeClock::new());
    let id = MachineId::parse("k1").unwrap();

    reg.create(id.clone(), no_factory).unwrap();
    assert!(!reg.route(id.clone(), CallEvent::Answer, no_factory).unwrap());
    assert!(reg.is_in_memory(&id));
}

#[test]
fn timeout_fires_synchronously_during_rehydration_when_overdue() {
    let persistence = Arc::new(InMemoryProvider::new());
    let clock = FakeClock::new();
    persistence
        .save(
            &MachineId::parse("k1").unwrap(),
            &fsm_storage::PersistedState {
                context: CallCtx { state: "Ringing".to_string(), changed_ms: clock.epoch_ms(), complete: false },
                version: 1,
            },
        )
        .unwrap();

    clock.advance(Duration::from_secs(10)); // timeout is 5s
    let reg = registry(persistence.clone(), clock);
    let id = MachineId::parse("k1").unwrap();

    let machine = reg.create_or_get(id.clone(), no_factory).unwrap().unwrap();
    assert_eq!(machine.lock().current_state(), "Idle");

    let persisted = persistence.load(&id).unwrap().unwrap();
    assert_eq!(persisted.context.current_state(), "Idle");
}

#[test]
fn timeout_is_rescheduled_with_remaining_duration_when_not_yet_overdue() {
    let persistence = Arc::new(InMemoryProvider::new());
    let clock = FakeClock::new();
    persistence
        .save(
            &MachineId::parse("k1").unwrap(),
            &fsm_storage::PersistedState {
                context: CallCtx { state: "Ringing".to_string(), changed_ms: clock.epoch_ms(), complete: false },
                version: 1,
            },
        )
        .unwrap();

    clock.advance(Duration::from_secs(2)); // timeout is 5s, 3s remaining
    let reg = registry(persistence, clock.clone());
    let id = MachineId::parse("k1").unwrap();

    let machine = reg.create_or_get(id, no_factory).unwrap().unwrap();
    assert_eq!(machine.lock().current_state(), "Ringing");
    assert!(reg.scheduler().has_timers());

    clock.advance(Duration::from_secs(3));
    assert_eq!(reg.drain_expired_timeouts(), 1);
}

#[test]
fn evict_is_idempotent() {
    let persistence = Arc::new(InMemoryProvider::new());
    let reg = registry(persistence, FakeClock::new());
    let id = MachineId::parse("k1").unwrap();

    reg.create(id.clone(), no_factory).unwrap();
    reg.evict(&id);
    reg.evict(&id); // no-op, must not panic
    assert!(!reg.is_in_memory(&id));
}

#[test]
fn cross_machine_isolation() {
    let persistence = Arc::new(InMemoryProvider::new());
    let reg = registry(persistence.clone(), FakeClock::new());
    let a = MachineId::parse("a").unwrap();
    let b = MachineId::parse("b").unwrap();

    reg.route(a.clone(), CallEvent::Incoming, no_factory).unwrap();
    reg.route(b.clone(), CallEvent::Incoming, no_factory).unwrap();
    reg.route(a.clone(), CallEvent::Answer, no_factory).unwrap();

    let a_state = persistence.load(&a).unwrap().unwrap();
    let b_state = persistence.load(&b).unwrap().unwrap();
    assert_eq!(a_state.context.current_state(), "Connected");
    assert_eq!(b_state.context.current_state(), "Ringing");
}

#[test]
fn eviction_listener_is_notified() {
    let persistence = Arc::new(InMemoryProvider::new());
    let reg = registry(persistence, FakeClock::new());
    let notified = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let notified_clone = notified.clone();
    reg.on_eviction(move |id| notified_clone.lock().push(id.clone()));

    let id = MachineId::parse("k1").unwrap();
    reg.create(id.clone(), no_factory).unwrap();
    reg.evict(&id);

    assert_eq!(notified.lock().as_slice(), &[id]);
}