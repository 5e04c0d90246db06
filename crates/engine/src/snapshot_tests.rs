// SPDX-License-Identifier: MIT

use super::*;
use fsm_core::{MachineId, RegistryStatus};
use serde_json::json;

fn demo_record() -> SnapshotRecord<Value> {
    SnapshotRecord {
        machine_id: MachineId::parse("call-1").unwrap(),
        version: 1,
        state_before: "Idle".to_string(),
        state_after: "Ringing".to_string(),
        event_name: "Incoming".to_string(),
        event_payload: Some(json!({"number": "555-1"})),
        context_before: json!({"current_state": "Idle"}),
        context_after: json!({"current_state": "Ringing"}),
        timestamp_epoch_ms: 1_000,
        duration_nanos: 500,
        registry_status_before: RegistryStatus::Absent,
        registry_status_after: RegistryStatus::RegisteredActive,
        hydrated_before: false,
        hydrated_after: true,
    }
}

#[test]
fn noop_recorder_drops_everything() {
    let recorder = NoopRecorder;
    recorder.record(demo_record());
}

#[tokio::test]
async fn channel_recorder_forwards_records() {
    let (recorder, mut rx) = ChannelRecorder::new(4);
    recorder.record(demo_record());

    let received = rx.recv().await.unwrap();
    assert_eq!(received.machine_id, MachineId::parse("call-1").unwrap());
    assert_eq!(received.state_after, "Ringing");
}

#[test]
fn channel_recorder_drops_when_full_instead_of_blocking() {
    let (recorder, _rx) = ChannelRecorder::new(1);
    recorder.record(demo_record());
    // Second record has nowhere to go; must not panic or block.
    recorder.record(demo_record());
}