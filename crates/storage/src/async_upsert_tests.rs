// SPDX-License-Identifier: MIT

use super::*;
use crate::in_memory::InMemoryProvider;
use fsm_core::ContextEntity;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DemoContext {
    current_state: String,
    last_state_change: u64,
    complete: bool,
}

impl ContextEntity for DemoContext {
    fn current_state(&self) -> &str {
        &self.current_state
    }
    fn set_current_state(&mut self, state: &str) {
        self.current_state = state.to_string();
    }
    fn last_state_change(&self) -> u64 {
        self.last_state_change
    }
    fn set_last_state_change(&mut self, epoch_ms: u64) {
        self.last_state_change = epoch_ms;
    }
    fn complete(&self) -> bool {
        self.complete
    }
    fn set_complete(&mut self, complete: bool) {
        self.complete = complete;
    }
}

fn demo_state(state: &str, version: u64) -> PersistedState<DemoContext> {
    PersistedState {
        context: DemoContext { current_state: state.to_string(), last_state_change: 0, complete: false },
        version,
    }
}

#[test]
fn save_returns_before_write_lands_then_flush_makes_it_visible() {
    let provider = AsyncUpsertProvider::new(InMemoryProvider::<DemoContext>::new());
    let id = MachineId::parse("call-1").unwrap();

    provider.save(&id, &demo_state("Ringing", 1)).unwrap();
    provider.flush();

    let loaded = provider.load(&id).unwrap().unwrap();
    assert_eq!(loaded.context.current_state, "Ringing");
    assert_eq!(loaded.version, 1);
}

#[test]
fn writes_to_the_same_key_apply_in_submission_order() {
    let provider = AsyncUpsertProvider::new(InMemoryProvider::<DemoContext>::new());
    let id = MachineId::parse("call-1").unwrap();

    for version in 1..=20u64 {
        provider.save(&id, &demo_state(&format!("State{version}"), version)).unwrap();
    }
    provider.flush();

    let loaded = provider.load(&id).unwrap().unwrap();
    assert_eq!(loaded.version, 20);
    assert_eq!(loaded.context.current_state, "State20");
}

#[test]
fn writes_to_different_keys_all_land() {
    let provider = AsyncUpsertProvider::new(InMemoryProvider::<DemoContext>::new());
    let a = MachineId::parse("call-a").unwrap();
    let b = MachineId::parse("call-b").unwrap();

    provider.save(&a, &demo_state("Ringing", 1)).unwrap();
    provider.save(&b, &demo_state("Connected", 1)).unwrap();
    provider.flush();

    assert_eq!(provider.load(&a).unwrap().unwrap().context.current_state, "Ringing");
    assert_eq!(provider.load(&b).unwrap().unwrap().context.current_state, "Connected");
}

#[test]
fn flush_on_an_empty_queue_returns_immediately() {
    let provider = AsyncUpsertProvider::new(InMemoryProvider::<DemoContext>::new());
    provider.flush();
    std::thread::sleep(Duration::from_millis(1));
    provider.flush();
}

#[test]
fn delete_and_last_version_read_through_to_inner() {
    let provider = AsyncUpsertProvider::new(InMemoryProvider::<DemoContext>::new());
    let id = MachineId::parse("call-1").unwrap();

    provider.save(&id, &demo_state("Ringing", 5)).unwrap();
    provider.flush();
    assert_eq!(provider.last_version(&id).unwrap(), 5);

    provider.delete(&id).unwrap();
    assert!(provider.load(&id).unwrap().is_none());
}
