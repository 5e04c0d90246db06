// SPDX-License-Identifier: MIT

//! Error taxonomy for the FSM runtime and its builder (spec.md §7).

use fsm_core::{ActionError, MachineId};
use thiserror::Error;

/// Raised by [`crate::builder::FsmBuilder::build`] (spec.md §4.7).
///
/// Surfaced directly to the caller; a template that fails to build never
/// produces a machine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("no initial state declared")]
    MissingInitialState,

    #[error("initial state {0:?} was never declared with .state(...)")]
    UnknownInitialState(String),

    #[error("state {0:?} declared more than once")]
    DuplicateState(String),

    #[error("transition in state {0:?} targets undeclared state {1:?}")]
    UnknownTransitionTarget(String, String),

    #[error("timeout in state {0:?} targets undeclared state {1:?}")]
    UnknownTimeoutTarget(String, String),

    #[error("final state {0:?} declares outbound transitions")]
    FinalStateHasTransitions(String),

    #[error("state {0:?} is marked both offline and final")]
    OfflineAndFinal(String),

    #[error("state {0:?} declares more than one timeout")]
    MultipleTimeouts(String),
}

/// Errors surfaced from lifecycle entry points that the spec requires to
/// raise rather than log-and-continue (spec.md §7: *BuildError*,
/// *DuplicateKey*, *UnknownState* are "surfaced to caller"; everything
/// else is logged and folded into a `bool`/`Option` return).
#[derive(Debug, Error)]
pub enum FsmError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("duplicate key: {0}")]
    DuplicateKey(MachineId),

    #[error("unknown state: {0:?}")]
    UnknownState(String),

    #[error("invalid lifecycle transition: {0}")]
    InvalidLifecycle(&'static str),

    #[error(transparent)]
    TransitionFailure(#[from] ActionError),

    #[error(transparent)]
    Persistence(#[from] fsm_storage::PersistenceError),
}