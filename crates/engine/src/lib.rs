// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fsm-engine: the FSM Runtime, Machine Registry, Timeout Scheduler,
//! Snapshot Recorder, and fluent Builder (spec.md §4.1, §4.2, §4.4, §4.6,
//! §4.7).
//!
//! The registry role folds in what the teacher's separate `oj-daemon`
//! binary owned (the live in-memory map keyed by id) since this crate
//! carries no socket/CLI surface of its own — see DESIGN.md.

pub mod builder;
pub mod config;
pub mod error;
pub mod fsm;
pub mod registry;
pub mod scheduler;
pub mod snapshot;
pub mod state_config;
pub mod template;
pub mod transition;

pub use builder::{FsmBuilder, StateBuilder};
pub use config::{DuplicatePolicy, PayloadInclusion, PersistenceMode, RegistryConfig, RegistryConfigBuilder};
pub use error::{BuildError, FsmError};
pub use fsm::Machine;
pub use registry::{MachineHandle, Registry};
pub use scheduler::{FiredTimeout, Scheduler};
pub use snapshot::{ChannelRecorder, NoopRecorder, SnapshotRecorder};
pub use template::FsmTemplate;