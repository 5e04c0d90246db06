// SPDX-License-Identifier: MIT

//! Typed transitions against a declared event variant (spec.md §9 "typed
//! event dispatch over dynamic names").
//!
//! There is no closed `Event` enum owned by this crate — a domain supplies
//! its own event type `E` and the builder records, per transition, a
//! matcher closure (usually `|e| matches!(e, MyEvent::Answer)`) instead of
//! a variant discriminant. This keeps dispatch fully typed at the call site
//! while letting the runtime stay generic over `E`.

use fsm_core::ActionError;

pub type Matcher<E> = Box<dyn Fn(&E) -> bool + Send + Sync>;
pub type EntryExitAction<C, V> = Box<dyn Fn(&mut C, &mut V) -> Result<(), ActionError> + Send + Sync>;
pub type StayHandler<E, C, V> = Box<dyn Fn(&mut C, &mut V, &E) -> Result<(), ActionError> + Send + Sync>;

/// One declared transition out of a state (spec.md §3 "typed transitions").
pub enum Transition<E, C, V> {
    /// Moves to `target`, running the source state's exit action and the
    /// target state's entry action.
    Target { matches: Matcher<E>, target: String },
    /// Stays in the current state; runs only `handler`, skipping exit/entry
    /// actions entirely (spec.md GLOSSARY "Stay transition").
    Stay { matches: Matcher<E>, handler: StayHandler<E, C, V> },
}

impl<E, C, V> Transition<E, C, V> {
    pub fn matches(&self, event: &E) -> bool {
        match self {
            Transition::Target { matches, .. } => matches(event),
            Transition::Stay { matches, .. } => matches(event),
        }
    }
}