// SPDX-License-Identifier: MIT

//! A shared, time-ordered timeout wheel (spec.md §4.4).
//!
//! One pending timeout per machine at a time, keyed by `(MachineId,
//! generation)` rather than by `MachineId` alone: every `set_timer` call
//! bumps the machine's generation, and a fired entry whose generation no
//! longer matches the registered one is silently dropped. This is how
//! cancellation is made to win races against firing without having to walk
//! the heap to remove a specific entry (spec.md §4.4 "cancellation
//! precedes firing").

use fsm_core::MachineId;
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::time::{Duration, Instant};

struct ScheduledTimeout {
    deadline: Instant,
    seq: u64,
    machine_id: MachineId,
    generation: u64,
    target_state: String,
}

impl PartialEq for ScheduledTimeout {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}
impl Eq for ScheduledTimeout {}

impl PartialOrd for ScheduledTimeout {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledTimeout {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so a `BinaryHeap` (a max-heap) pops the earliest deadline
        // first; ties broken by scheduling order (spec.md §4.4 ordering rule).
        other.deadline.cmp(&self.deadline).then_with(|| other.seq.cmp(&self.seq))
    }
}

/// A timeout that has come due, ready to be turned into a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredTimeout {
    pub machine_id: MachineId,
    pub target_state: String,
}

#[derive(Default)]
struct SchedulerState {
    heap: BinaryHeap<ScheduledTimeout>,
    generations: HashMap<MachineId, u64>,
    next_seq: u64,
}

pub struct Scheduler {
    state: Mutex<SchedulerState>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self { state: Mutex::new(SchedulerState::default()) }
    }

    /// Arm a timeout for `machine_id` at `now + duration`, cancelling
    /// whatever was previously armed for that key.
    pub fn set_timer(&self, machine_id: MachineId, target_state: impl Into<String>, duration: Duration, now: Instant) {
        let mut state = self.state.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        let generation = state.generations.get(&machine_id).copied().unwrap_or(0) + 1;
        state.generations.insert(machine_id.clone(), generation);
        state.heap.push(ScheduledTimeout {
            deadline: now + duration,
            seq,
            machine_id,
            generation,
            target_state: target_state.into(),
        });
    }

    /// Cancel any pending timeout for `machine_id`. Idempotent.
    pub fn cancel_timer(&self, machine_id: &MachineId) {
        let mut state = self.state.lock();
        let generation = state.generations.get(machine_id).copied().unwrap_or(0) + 1;
        state.generations.insert(machine_id.clone(), generation);
    }

    pub fn has_timers(&self) -> bool {
        let state = self.state.lock();
        state.heap.iter().any(|t| state.generations.get(&t.machine_id) == Some(&t.generation))
    }

    /// The deadline of the next live (non-stale) timeout, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        let mut state = self.state.lock();
        loop {
            let is_live = match state.heap.peek() {
                Some(top) => state.generations.get(&top.machine_id) == Some(&top.generation),
                None => return None,
            };
            if is_live {
                return state.heap.peek().map(|t| t.deadline);
            }
            state.heap.pop();
        }
    }

    /// Pop every live timeout whose deadline is `<= now`, in non-decreasing
    /// deadline order (ties broken by scheduling order).
    pub fn fired_timers(&self, now: Instant) -> Vec<FiredTimeout> {
        let mut state = self.state.lock();
        let mut fired = Vec::new();
        loop {
            match state.heap.peek() {
                Some(top) if top.deadline <= now => {}
                _ => break,
            }
            let Some(entry) = state.heap.pop() else { break };
            let is_live = state.generations.get(&entry.machine_id) == Some(&entry.generation);
            if is_live {
                fired.push(FiredTimeout { machine_id: entry.machine_id, target_state: entry.target_state });
            }
        }
        fired
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;