//! Error types for the reference machine.

use emu_core::{ClockError, SchedulerError};
use thiserror::Error;

/// Errors from configuring, running or restoring the machine.
#[derive(Error, Debug)]
pub enum MachineError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("clock error: {0}")]
    Clock(#[from] ClockError),

    #[error("scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("cartridge slot is already occupied")]
    SlotOccupied,

    #[error("save-state does not match configuration: {0}")]
    StateMismatch(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for machine operations.
pub type MachineResult<T> = Result<T, MachineError>;
