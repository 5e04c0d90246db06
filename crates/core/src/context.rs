// SPDX-License-Identifier: MIT

//! The [`ContextEntity`] capability contract (spec.md §3, §9 "generic context
//! with required capabilities").
//!
//! Rather than require implementers to inherit from a base class the way the
//! source system does, the runtime depends only on four accessors. Domain
//! crates (call-flow sessions, SMS workflows) supply a concrete record that
//! satisfies this trait and carries whatever additional fields it needs —
//! the runtime never inspects them.

use serde::{de::DeserializeOwned, Serialize};

/// The per-machine persistent record (spec.md §3).
///
/// Invariants the runtime upholds on the implementer's behalf:
/// - `current_state` is updated on every successful transition to equal the
///   FSM's new active state name.
/// - `last_state_change` is updated on every successful transition,
///   including self-transitions and stay transitions.
/// - Once `complete()` is `true`, the runtime applies no further transitions.
pub trait ContextEntity: Serialize + DeserializeOwned + Clone + Send + 'static {
    fn current_state(&self) -> &str;
    fn set_current_state(&mut self, state: &str);

    /// Epoch milliseconds of the last successful transition.
    fn last_state_change(&self) -> u64;
    fn set_last_state_change(&mut self, epoch_ms: u64);

    fn complete(&self) -> bool;
    fn set_complete(&mut self, complete: bool);
}

/// Per-machine in-memory scratch data, never persisted (spec.md §3).
///
/// Reconstructed fresh on every rehydration. Implementers that have no use
/// for volatile scratch space can use `()`, which implements this trait via
/// the blanket impl below.
pub trait VolatileContext: Default + Send + 'static {}

impl<T: Default + Send + 'static> VolatileContext for T {}