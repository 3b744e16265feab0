//! Timer system for Custom Splasher.
//!
//! Provides one-shot and repeating timers that carry a plain action value
//! instead of a callback. The owner of the registry pulls due actions with
//! [`TimerRegistry::pop_due`] and dispatches them itself, one at a time, on
//! a single thread. Because the registry never runs user code, cancelling
//! from inside a dispatch (including [`TimerRegistry::cancel_all`]) cannot
//! deadlock or re-enter, and nothing cancelled is ever delivered afterwards.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use slotmap::{SlotMap, new_key_type};

use crate::clock::Clock;
use crate::error::{Result, TimerError};
use crate::logging::targets;

/// The shortest delay or interval a timer can be scheduled with.
///
/// Shorter requests (including zero) are clamped up to this value.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

new_key_type! {
    /// A unique identifier for a timer.
    pub struct TimerId;
}

/// The type of timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Fires once after the specified delay, then retires.
    OneShot,
    /// Fires repeatedly at the specified interval until cancelled.
    Repeating,
}

/// Internal timer data.
#[derive(Debug)]
struct TimerData<A> {
    /// When this timer should next fire.
    next_fire: Instant,
    /// The delay (one-shot) or interval (repeating).
    interval: Duration,
    /// The kind of timer.
    kind: TimerKind,
    /// The action handed back when the timer fires.
    action: A,
}

/// An entry in the timer queue (min-heap by fire time, FIFO on ties).
#[derive(Debug, Clone, Copy)]
struct TimerQueueEntry {
    id: TimerId,
    fire_time: Instant,
    sequence: u64,
}

impl PartialEq for TimerQueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.fire_time == other.fire_time && self.sequence == other.sequence
    }
}

impl Eq for TimerQueueEntry {}

impl PartialOrd for TimerQueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerQueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap (BinaryHeap is max-heap by default).
        other
            .fire_time
            .cmp(&self.fire_time)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Owns every timer of one splash run.
///
/// The registry is purely about timing: it knows nothing about what its
/// actions mean. Time is read from the [`Clock`] it was created with.
pub struct TimerRegistry<A> {
    /// Source of the current time.
    clock: Arc<dyn Clock>,
    /// All live timers.
    timers: SlotMap<TimerId, TimerData<A>>,
    /// Priority queue of pending fires. May hold stale entries for
    /// cancelled timers; those are skipped when popped.
    queue: BinaryHeap<TimerQueueEntry>,
    /// Sequence counter for stable ordering of timers due at the same instant.
    sequence: u64,
}

impl<A> TimerRegistry<A> {
    /// Create an empty registry reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            timers: SlotMap::with_key(),
            queue: BinaryHeap::new(),
            sequence: 0,
        }
    }

    /// The clock this registry reads.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Schedule `action` to fire exactly once after `delay`.
    ///
    /// The timer retires automatically when it fires.
    pub fn schedule_once(&mut self, delay: Duration, action: A) -> TimerId {
        self.insert(TimerKind::OneShot, delay, action)
    }

    /// Schedule `action` to fire every `interval` until cancelled.
    ///
    /// The first fire occurs after one `interval`.
    pub fn schedule_repeating(&mut self, interval: Duration, action: A) -> TimerId {
        self.insert(TimerKind::Repeating, interval, action)
    }

    fn insert(&mut self, kind: TimerKind, interval: Duration, action: A) -> TimerId {
        let interval = interval.max(MIN_INTERVAL);
        let next_fire = self.clock.now() + interval;

        let id = self.timers.insert(TimerData {
            next_fire,
            interval,
            kind,
            action,
        });
        self.enqueue(id, next_fire);

        tracing::trace!(target: targets::TIMER, ?id, ?kind, ?interval, "timer scheduled");
        id
    }

    fn enqueue(&mut self, id: TimerId, fire_time: Instant) {
        self.sequence += 1;
        self.queue.push(TimerQueueEntry {
            id,
            fire_time,
            sequence: self.sequence,
        });
    }

    /// Cancel a timer.
    ///
    /// Returns `true` if a live timer was cancelled. Cancelling a timer that
    /// already fired or was cancelled is a no-op that returns `false`.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let cancelled = self.timers.remove(id).is_some();
        if cancelled {
            tracing::trace!(target: targets::TIMER, ?id, "timer cancelled");
        }
        cancelled
    }

    /// Cancel every timer this registry has issued.
    ///
    /// Safe to call repeatedly and from within the dispatch of an action this
    /// registry just delivered. Returns the number of live timers cancelled.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.timers.len();
        self.timers.clear();
        self.queue.clear();
        tracing::debug!(target: targets::TIMER, count, "all timers cancelled");
        count
    }

    /// Check if a timer is still live.
    pub fn is_active(&self, id: TimerId) -> bool {
        self.timers.contains_key(id)
    }

    /// The kind of a live timer.
    pub fn kind(&self, id: TimerId) -> Result<TimerKind> {
        self.timers
            .get(id)
            .map(|t| t.kind)
            .ok_or(TimerError::InvalidTimerId(id))
    }

    /// The delay or interval a live timer was scheduled with, after clamping.
    pub fn interval(&self, id: TimerId) -> Result<Duration> {
        self.timers
            .get(id)
            .map(|t| t.interval)
            .ok_or(TimerError::InvalidTimerId(id))
    }

    /// Get the number of live timers.
    pub fn active_count(&self) -> usize {
        self.timers.len()
    }

    /// The instant the next live timer is due, if any.
    pub fn next_deadline(&mut self) -> Option<Instant> {
        self.discard_stale();
        self.queue.peek().map(|entry| entry.fire_time)
    }

    /// Get the duration until the next timer fires, if any.
    ///
    /// Returns `Duration::ZERO` when a timer is already overdue.
    pub fn time_until_next(&mut self) -> Option<Duration> {
        let now = self.clock.now();
        self.next_deadline()
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Clean up entries for timers that no longer exist from the front of the queue.
    fn discard_stale(&mut self) {
        while let Some(entry) = self.queue.peek() {
            if self.is_current(entry) {
                break;
            }
            self.queue.pop();
        }
    }

    fn is_current(&self, entry: &TimerQueueEntry) -> bool {
        self.timers
            .get(entry.id)
            .is_some_and(|t| t.next_fire == entry.fire_time)
    }
}

impl<A: Clone> TimerRegistry<A> {
    /// Take the next due action, if any.
    ///
    /// Actions come out in due order, one per call. A one-shot timer is
    /// retired before its action is returned. A repeating timer is re-armed
    /// one interval after *now*, so a late dispatch pushes the following tick
    /// back instead of producing a burst of catch-up ticks.
    pub fn pop_due(&mut self) -> Option<(TimerId, A)> {
        let now = self.clock.now();

        while let Some(entry) = self.queue.peek().copied() {
            if entry.fire_time > now {
                return None;
            }
            self.queue.pop();

            if !self.is_current(&entry) {
                continue;
            }

            let id = entry.id;
            tracing::trace!(target: targets::TIMER, ?id, "timer fired");

            let kind = self.timers.get(id)?.kind;
            return match kind {
                TimerKind::OneShot => self.timers.remove(id).map(|t| (id, t.action)),
                TimerKind::Repeating => {
                    let timer = self.timers.get_mut(id)?;
                    let next_fire = now + timer.interval;
                    timer.next_fire = next_fire;
                    let action = timer.action.clone();
                    self.enqueue(id, next_fire);
                    Some((id, action))
                }
            };
        }

        None
    }
}

impl<A> fmt::Debug for TimerRegistry<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerRegistry")
            .field("active", &self.timers.len())
            .field("queued", &self.queue.len())
            .finish()
    }
}
