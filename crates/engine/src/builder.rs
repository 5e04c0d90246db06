// SPDX-License-Identifier: MIT

//! The fluent builder (spec.md §4.7).
//!
//! `FsmBuilder::new().initial_state(..).state(.., |s| s.on(..).timeout(..)).state(..).build()`
//! produces an immutable [`FsmTemplate`], validating every invariant from
//! spec.md §3 at build time so a bad template never reaches a running
//! machine.

use crate::error::BuildError;
use crate::state_config::StateConfig;
use crate::template::FsmTemplate;
use crate::transition::{EntryExitAction, Matcher, StayHandler, Transition};
use fsm_core::ActionError;
use std::collections::HashMap;
use std::time::Duration;

/// Per-state chain handed to the closure passed to [`FsmBuilder::state`].
pub struct StateBuilder<E, C, V> {
    config: StateConfig<E, C, V>,
}

impl<E, C, V> StateBuilder<E, C, V>
where
    E: 'static,
    C: 'static,
    V: 'static,
{
    fn new(name: impl Into<String>) -> Self {
        Self { config: StateConfig::new(name) }
    }

    /// Declare a transition to `target` for events matching `matches`.
    pub fn on(mut self, matches: impl Fn(&E) -> bool + Send + Sync + 'static, target: impl Into<String>) -> Self {
        self.config.transitions.push(Transition::Target {
            matches: Box::new(matches) as Matcher<E>,
            target: target.into(),
        });
        self
    }

    /// Declare a stay transition: `handler` runs in place, entry/exit are
    /// skipped entirely (spec.md GLOSSARY "Stay transition").
    pub fn stay(
        mut self,
        matches: impl Fn(&E) -> bool + Send + Sync + 'static,
        handler: impl Fn(&mut C, &mut V, &E) -> Result<(), ActionError> + Send + Sync + 'static,
    ) -> Self {
        self.config.transitions.push(Transition::Stay {
            matches: Box::new(matches) as Matcher<E>,
            handler: Box::new(handler) as StayHandler<E, C, V>,
        });
        self
    }

    /// Arm a timeout: after `duration` measured from `last_state_change`
    /// with no intervening exit, transition unconditionally to `target`
    /// (spec.md §4.4).
    pub fn timeout(mut self, duration: Duration, target: impl Into<String>) -> Self {
        self.config.timeout = Some((duration, target.into()));
        self.config.timeout_declarations += 1;
        self
    }

    /// Mark this state offline: on entry the registry persists and evicts
    /// the machine (spec.md GLOSSARY "Offline state").
    pub fn offline(mut self) -> Self {
        self.config.offline = true;
        self
    }

    /// Mark this state final: on entry the entity's `complete` flag is set
    /// and the registry evicts the machine (spec.md GLOSSARY "Final state").
    pub fn final_state(mut self) -> Self {
        self.config.final_state = true;
        self
    }

    pub fn on_entry(mut self, action: impl Fn(&mut C, &mut V) -> Result<(), ActionError> + Send + Sync + 'static) -> Self {
        self.config.entry = Some(Box::new(action) as EntryExitAction<C, V>);
        self
    }

    pub fn on_exit(mut self, action: impl Fn(&mut C, &mut V) -> Result<(), ActionError> + Send + Sync + 'static) -> Self {
        self.config.exit = Some(Box::new(action) as EntryExitAction<C, V>);
        self
    }
}

pub struct FsmBuilder<E, C, V> {
    initial_state: Option<String>,
    states: HashMap<String, StateConfig<E, C, V>>,
    order: Vec<String>,
}

impl<E, C, V> FsmBuilder<E, C, V>
where
    E: 'static,
    C: 'static,
    V: 'static,
{
    pub fn new() -> Self {
        Self { initial_state: None, states: HashMap::new(), order: Vec::new() }
    }

    pub fn initial_state(mut self, name: impl Into<String>) -> Self {
        self.initial_state = Some(name.into());
        self
    }

    /// Declare a state and configure it via the closure-supplied
    /// [`StateBuilder`] chain.
    pub fn state(
        mut self,
        name: impl Into<String>,
        configure: impl FnOnce(StateBuilder<E, C, V>) -> StateBuilder<E, C, V>,
    ) -> Self {
        let name = name.into();
        self.order.push(name.clone());
        let built = configure(StateBuilder::new(name.clone())).config;
        self.states.insert(name, built);
        self
    }

    pub fn build(self) -> Result<FsmTemplate<E, C, V>, BuildError> {
        let initial_state = self.initial_state.ok_or(BuildError::MissingInitialState)?;

        let mut seen = std::collections::HashSet::new();
        for name in &self.order {
            if !seen.insert(name.clone()) {
                return Err(BuildError::DuplicateState(name.clone()));
            }
        }

        if !self.states.contains_key(&initial_state) {
            return Err(BuildError::UnknownInitialState(initial_state));
        }

        for (name, state) in &self.states {
            if state.offline && state.final_state {
                return Err(BuildError::OfflineAndFinal(name.clone()));
            }
            if state.final_state && !state.transitions.is_empty() {
                return Err(BuildError::FinalStateHasTransitions(name.clone()));
            }
            if state.timeout_declarations > 1 {
                return Err(BuildError::MultipleTimeouts(name.clone()));
            }
            for transition in &state.transitions {
                if let Transition::Target { target, .. } = transition {
                    if !self.states.contains_key(target) {
                        return Err(BuildError::UnknownTransitionTarget(name.clone(), target.clone()));
                    }
                }
            }
            if let Some((_, target)) = &state.timeout {
                if !self.states.contains_key(target) {
                    return Err(BuildError::UnknownTimeoutTarget(name.clone(), target.clone()));
                }
            }
        }

        Ok(FsmTemplate { initial_state, states: self.states })
    }
}

impl<E, C, V> Default for FsmBuilder<E, C, V>
where
    E: 'static,
    C: 'static,
    V: 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "builder_tests.rs"]
mod tests;