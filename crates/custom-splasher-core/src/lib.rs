//! Core systems for Custom Splasher.
//!
//! This crate provides the timing foundation the splash lifecycle is built on:
//!
//! - **Clocks**: a [`Clock`] abstraction with a wall-clock and a manually driven implementation
//! - **Timers**: a [`TimerRegistry`] of one-shot and repeating timers carrying plain action values
//! - **Logging**: tracing target names shared by every Custom Splasher crate
//!
//! # Timer Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use custom_splasher_core::{ManualClock, TimerRegistry};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! enum Action {
//!     Launch,
//!     Tick,
//! }
//!
//! let clock = Arc::new(ManualClock::new());
//! let mut timers = TimerRegistry::new(clock.clone());
//!
//! timers.schedule_once(Duration::from_millis(1500), Action::Launch);
//! timers.schedule_repeating(Duration::from_millis(1000), Action::Tick);
//!
//! clock.advance(Duration::from_millis(1000));
//! assert_eq!(timers.pop_due().map(|(_, a)| a), Some(Action::Tick));
//! assert_eq!(timers.pop_due(), None);
//!
//! clock.advance(Duration::from_millis(500));
//! assert_eq!(timers.pop_due().map(|(_, a)| a), Some(Action::Launch));
//!
//! // Nothing fires again once everything is cancelled.
//! timers.cancel_all();
//! clock.advance(Duration::from_secs(10));
//! assert_eq!(timers.pop_due(), None);
//! ```

mod clock;
mod error;
pub mod logging;
mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Result, TimerError};
pub use timer::{MIN_INTERVAL, TimerId, TimerKind, TimerRegistry};
