// SPDX-License-Identifier: MIT

//! The immutable product of [`crate::builder::FsmBuilder::build`] (spec.md
//! §4.7, §9 "builder as a pure constructor").
//!
//! A template holds no machine-specific state — it is the state-config map
//! plus the declared initial state, shareable via `Arc` across every
//! machine instantiated from it.

use crate::state_config::StateConfig;
use std::collections::HashMap;

pub struct FsmTemplate<E, C, V> {
    pub(crate) initial_state: String,
    pub(crate) states: HashMap<String, StateConfig<E, C, V>>,
}

impl<E, C, V> FsmTemplate<E, C, V> {
    pub fn initial_state(&self) -> &str {
        &self.initial_state
    }

    pub fn state(&self, name: &str) -> Option<&StateConfig<E, C, V>> {
        self.states.get(name)
    }

    pub fn contains_state(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }
}