// SPDX-License-Identifier: MIT

use super::*;
use fsm_core::ContextEntity;
use serde::{Deserialize, Serialize};

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
fn load_absent_key_returns_none() {
    let provider: InMemoryProvider<DemoContext> = InMemoryProvider::new();
    let id = MachineId::parse("call-1").unwrap();
    assert!(provider.load(&id).unwrap().is_none());
}

#[test]
fn save_then_load_round_trips() {
    let provider: InMemoryProvider<DemoContext> = InMemoryProvider::new();
    let id = MachineId::parse("call-1").unwrap();
    provider.save(&id, &demo_state("Ringing", 3)).unwrap();

    let loaded = provider.load(&id).unwrap().unwrap();
    assert_eq!(loaded.context.current_state, "Ringing");
    assert_eq!(loaded.version, 3);
}

#[test]
fn save_overwrites_prior_record() {
    let provider: InMemoryProvider<DemoContext> = InMemoryProvider::new();
    let id = MachineId::parse("call-1").unwrap();
    provider.save(&id, &demo_state("Ringing", 1)).unwrap();
    provider.save(&id, &demo_state("Connected", 2)).unwrap();

    let loaded = provider.load(&id).unwrap().unwrap();
    assert_eq!(loaded.context.current_state, "Connected");
    assert_eq!(loaded.version, 2);
}

#[test]
fn delete_removes_record() {
    let provider: InMemoryProvider<DemoContext> = InMemoryProvider::new();
    let id = MachineId::parse("call-1").unwrap();
    provider.save(&id, &demo_state("Ringing", 1)).unwrap();
    provider.delete(&id).unwrap();
    assert!(provider.load(&id).unwrap().is_none());
}

#[test]
fn last_version_defaults_to_zero_when_absent() {
    let provider: InMemoryProvider<DemoContext> = InMemoryProvider::new();
    let id = MachineId::parse("call-1").unwrap();
    assert_eq!(provider.last_version(&id).unwrap(), 0);
}