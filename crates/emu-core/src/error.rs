//! Error types for clock configuration and scheduler save-state.
//!
//! Contract violations (scheduling into the past, dispatching to a dropped
//! device) are not errors; they panic.

use thiserror::Error;

use crate::MAIN_FREQ;

/// Invalid clock configuration.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockError {
    #[error("clock frequency must be non-zero")]
    ZeroFrequency,

    #[error("clock period must be non-zero")]
    ZeroPeriod,

    #[error("{num}/{denom} Hz does not divide the {MAIN_FREQ} Hz time base exactly")]
    InexactFrequency { num: u64, denom: u64 },

    #[error("{num}/{denom} Hz is too slow for the time base")]
    TooSlow { num: u64, denom: u64 },
}

/// Scheduler state could not be restored.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("cannot restore while {0} sync points are pending")]
    PointsPending(usize),

    #[error("cannot restore while the scheduler is draining")]
    Draining,
}
