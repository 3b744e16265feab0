//! Error types for Custom Splasher core.

use thiserror::Error;

use crate::timer::TimerId;

/// Timer-specific errors.
///
/// Cancellation never produces these; they only describe lookups that
/// need a live timer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    /// The timer ID is invalid or the timer has already been retired.
    #[error("invalid or retired timer id {0:?}")]
    InvalidTimerId(TimerId),
}

/// A specialized Result type for core operations.
pub type Result<T> = std::result::Result<T, TimerError>;
