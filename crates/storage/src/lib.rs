// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fsm-storage: durable persistence for machine contexts (spec.md §4.3).

pub mod async_upsert;
pub mod error;
pub mod file;
pub mod history;
pub mod in_memory;
pub mod provider;

pub use async_upsert::AsyncUpsertProvider;
pub use error::PersistenceError;
pub use file::FileProvider;
pub use history::HistoryAppendProvider;
pub use in_memory::InMemoryProvider;
pub use provider::{PersistedState, PersistenceProvider};