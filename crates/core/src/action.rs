// SPDX-License-Identifier: MIT

//! Error type surfaced by entry/exit/stay action closures.

/// An error raised by a caller-supplied entry, exit, or stay action.
///
/// Spec.md §4.1: "Entry/exit actions that raise are treated as fatal for
/// that transition: the entity is not mutated, the snapshot is not emitted,
/// and a `TransitionFailure` is surfaced; the machine remains in its prior
/// state." The runtime never propagates this type out of `fire` — it is
/// logged and folded into a `false` return, per §7's propagation rule.
#[derive(Debug, thiserror::Error)]
#[error("action failed: {0}")]
pub struct ActionError(#[from] pub Box<dyn std::error::Error + Send + Sync>);

impl ActionError {
    pub fn new(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self(Box::new(err))
    }

    pub fn msg(msg: impl Into<String>) -> Self {
        Self(Box::<dyn std::error::Error + Send + Sync>::from(msg.into()))
    }
}