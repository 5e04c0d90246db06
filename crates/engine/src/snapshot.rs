// SPDX-License-Identifier: MIT

//! The Snapshot Recorder observer (spec.md §4.6).
//!
//! A recorder receives every transition after it has already committed to
//! the entity and to persistence; nothing it does can roll the transition
//! back. Its `record` call is therefore infallible from the runtime's point
//! of view — implementations that can fail (a channel, a socket) must
//! swallow their own errors and log them, never propagate.

use fsm_core::SnapshotRecord;
use serde_json::Value;
use tracing::warn;

/// Receives a fully-formed snapshot after every transition.
///
/// Takes the context serialized to [`serde_json::Value`] rather than the
/// domain's concrete `ContextEntity` type: recorder output feeds external
/// collaborators (reports, a live-debug channel) that have no reason to
/// depend on the domain crate (spec.md §4.6 "not consumed by the core").
pub trait SnapshotRecorder: Send + Sync {
    fn record(&self, record: SnapshotRecord<Value>);
}

/// Discards every snapshot. The default when `snapshot.enabled` is false.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRecorder;

impl SnapshotRecorder for NoopRecorder {
    fn record(&self, _record: SnapshotRecord<Value>) {}
}

/// Forwards snapshots to a bounded channel without ever blocking the
/// transition that produced them.
///
/// A full or closed channel is not the runtime's problem: the send is
/// attempted with `try_send` and a failure is logged and dropped, matching
/// the "must not raise to the runtime" rule.
pub struct ChannelRecorder {
    sender: tokio::sync::mpsc::Sender<SnapshotRecord<Value>>,
}

impl ChannelRecorder {
    pub fn new(capacity: usize) -> (Self, tokio::sync::mpsc::Receiver<SnapshotRecord<Value>>) {
        let (sender, receiver) = tokio::sync::mpsc::channel(capacity);
        (Self { sender }, receiver)
    }
}

impl SnapshotRecorder for ChannelRecorder {
    fn record(&self, record: SnapshotRecord<Value>) {
        if let Err(err) = self.sender.try_send(record) {
            warn!(error = %err, "snapshot recorder dropped a record");
        }
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;