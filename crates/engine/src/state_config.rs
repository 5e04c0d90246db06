// SPDX-License-Identifier: MIT

//! Per-state configuration (spec.md §3 "StateConfig").

use crate::transition::{EntryExitAction, Transition};
use std::time::Duration;

/// Everything declared for one state by the builder.
///
/// Invariants (enforced by [`crate::builder::FsmBuilder::build`], not
/// here): at most one timeout; a final state has no outbound transitions;
/// `offline` and `final_state` are never both set.
pub struct StateConfig<E, C, V> {
    pub name: String,
    pub entry: Option<EntryExitAction<C, V>>,
    pub exit: Option<EntryExitAction<C, V>>,
    pub transitions: Vec<Transition<E, C, V>>,
    pub timeout: Option<(Duration, String)>,
    pub offline: bool,
    pub final_state: bool,
    /// Number of times `.timeout(...)` was called while building this state.
    /// `FsmBuilder::build` rejects any value greater than 1 with
    /// `BuildError::MultipleTimeouts` (spec.md §3 "at most one timeout per
    /// state") — `timeout` itself only ever holds the *last* declared value,
    /// so this counter is what actually catches the duplicate.
    pub(crate) timeout_declarations: u32,
}

impl<E, C, V> StateConfig<E, C, V> {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entry: None,
            exit: None,
            transitions: Vec::new(),
            timeout: None,
            offline: false,
            final_state: false,
            timeout_declarations: 0,
        }
    }

    /// First declared transition matching `event`'s variant, in declaration
    /// order (spec.md §4.1 "first declared wins").
    pub(crate) fn matching_transition(&self, event: &E) -> Option<&Transition<E, C, V>> {
        self.transitions.iter().find(|t| t.matches(event))
    }
}