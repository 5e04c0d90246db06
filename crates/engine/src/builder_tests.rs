// SPDX-License-Identifier: MIT

use super::*;
use fsm_core::ContextEntity;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DemoCtx {
    state: String,
    changed_ms: u64,
    complete: bool,
}

impl Default for DemoCtx {
    fn default() -> Self {
        Self { state: String::new(), changed_ms: 0, complete: false }
    }
}

impl ContextEntity for DemoCtx {
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

enum DemoEvent {
    Answer,
    Hangup,
}

fn builder() -> FsmBuilder<DemoEvent, DemoCtx, ()> {
    FsmBuilder::new()
}

#[test]
fn builds_a_valid_template() {
    let template = builder()
        .initial_state("Idle")
        .state("Idle", |s| s.on(|e| matches!(e, DemoEvent::Answer), "Connected"))
        .state("Connected", |s| s.on(|e| matches!(e, DemoEvent::Hangup), "Final"))
        .state("Final", |s| s.final_state())
        .build()
        .unwrap();

    assert_eq!(template.initial_state(), "Idle");
    assert!(template.contains_state("Connected"));
}

#[test]
fn missing_initial_state_is_rejected() {
    let err = builder().state("Idle", |s| s).build().unwrap_err();
    assert_eq!(err, BuildError::MissingInitialState);
}

#[test]
fn unknown_initial_state_is_rejected() {
    let err = builder().initial_state("Idle").build().unwrap_err();
    assert_eq!(err, BuildError::UnknownInitialState("Idle".to_string()));
}

#[test]
fn unknown_transition_target_is_rejected() {
    let err = builder()
        .initial_state("Idle")
        .state("Idle", |s| s.on(|e| matches!(e, DemoEvent::Answer), "Nowhere"))
        .build()
        .unwrap_err();
    assert_eq!(err, BuildError::UnknownTransitionTarget("Idle".to_string(), "Nowhere".to_string()));
}

#[test]
fn unknown_timeout_target_is_rejected() {
    let err = builder()
        .initial_state("Idle")
        .state("Idle", |s| s.timeout(std::time::Duration::from_secs(5), "Nowhere"))
        .build()
        .unwrap_err();
    assert_eq!(err, BuildError::UnknownTimeoutTarget("Idle".to_string(), "Nowhere".to_string()));
}

#[test]
fn declaring_a_second_timeout_on_the_same_state_is_rejected() {
    let err = builder()
        .initial_state("Idle")
        .state("Connected", |s| s)
        .state("Idle", |s| {
            s.timeout(std::time::Duration::from_secs(5), "Connected")
                .timeout(std::time::Duration::from_secs(10), "Connected")
        })
        .build()
        .unwrap_err();
    assert_eq!(err, BuildError::MultipleTimeouts("Idle".to_string()));
}

#[test]
fn final_state_with_outbound_transitions_is_rejected() {
    let err = builder()
        .initial_state("Idle")
        .state("Idle", |s| s.on(|e| matches!(e, DemoEvent::Answer), "Final"))
        .state("Final", |s| s.on(|e| matches!(e, DemoEvent::Hangup), "Idle").final_state())
        .build()
        .unwrap_err();
    assert_eq!(err, BuildError::FinalStateHasTransitions("Final".to_string()));
}

#[test]
fn offline_and_final_together_is_rejected() {
    let err = builder().initial_state("Idle").state("Idle", |s| s.offline().final_state()).build().unwrap_err();
    assert_eq!(err, BuildError::OfflineAndFinal("Idle".to_string()));
}

#[test]
fn duplicate_state_declaration_is_rejected() {
    let err = builder()
        .initial_state("Idle")
        .state("Idle", |s| s)
        .state("Idle", |s| s)
        .build()
        .unwrap_err();
    assert_eq!(err, BuildError::DuplicateState("Idle".to_string()));
}

#[test]
fn first_declared_transition_wins_on_overlap() {
    let template = builder()
        .initial_state("Idle")
        .state("Idle", |s| {
            s.on(|e| matches!(e, DemoEvent::Answer), "Connected").on(|e| matches!(e, DemoEvent::Answer), "Final")
        })
        .state("Connected", |s| s)
        .state("Final", |s| s.final_state())
        .build()
        .unwrap();

    let idle = template.state("Idle").unwrap();
    let matched = idle.matching_transition(&DemoEvent::Answer).unwrap();
    match matched {
        Transition::Target { target, .. } => assert_eq!(target, "Connected"),
        Transition::Stay { .. } => panic!("expected a target transition"),
    }
}