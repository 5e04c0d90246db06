// SPDX-License-Identifier: MIT

//! Errors surfaced by [`crate::PersistenceProvider`] implementations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("no persisted record for machine {0}")]
    NotFound(fsm_core::MachineId),

    #[error("history append out of order for machine {machine_id}: expected version > {last}, got {attempted}")]
    VersionOutOfOrder {
        machine_id: fsm_core::MachineId,
        last: u64,
        attempted: u64,
    },
}