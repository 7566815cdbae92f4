//! Event queue with deterministic ordering.

use crate::error::EngineError;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::trace;

/// Key for ordering events in the queue.
///
/// Events are ordered by:
/// 1. Time (earlier first)
/// 2. Sequence number (FIFO for events scheduled at the same time)
///
/// The key doubles as the cancel handle returned by [`Engine::schedule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventKey {
    /// When this event should be processed.
    pub time: Duration,
    /// Sequence number assigned at schedule time.
    pub sequence: u64,
}

/// Single global time-ordered scheduler with a virtual clock.
///
/// The engine is generic over the event payload; the runner decides what an
/// event means when it is popped.
#[derive(Debug)]
pub struct Engine<E> {
    queue: BTreeMap<EventKey, E>,
    sequence: u64,
    now: Duration,
    processed: u64,
}

impl<E> Default for Engine<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Engine<E> {
    pub fn new() -> Self {
        Self {
            queue: BTreeMap::new(),
            sequence: 0,
            now: Duration::ZERO,
            processed: 0,
        }
    }

    /// Current simulated time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Number of events still pending.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of events popped so far.
    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Fire time of the earliest pending event.
    pub fn peek_time(&self) -> Option<Duration> {
        self.queue.first_key_value().map(|(key, _)| key.time)
    }

    /// Schedule `event` to fire `delay` after the current time.
    pub fn schedule(&mut self, delay: Duration, event: E) -> EventKey {
        self.schedule_at(self.now + delay, event)
    }

    /// Schedule `event` at an absolute time.
    ///
    /// Times in the past are clamped to now.
    pub fn schedule_at(&mut self, time: Duration, event: E) -> EventKey {
        self.sequence += 1;
        let key = EventKey {
            time: time.max(self.now),
            sequence: self.sequence,
        };
        self.queue.insert(key, event);
        key
    }

    /// Remove a pending event.
    ///
    /// Returns `None` if the event already fired or was cancelled.
    pub fn cancel(&mut self, key: EventKey) -> Option<E> {
        self.queue.remove(&key)
    }

    /// Pop the next event due strictly before `until`.
    ///
    /// Returns `Ok(None)` once the horizon is reached; the clock is then set
    /// to `until` and later events stay pending. An empty queue before the
    /// horizon is a scheduling error.
    pub fn next_before(&mut self, until: Duration) -> Result<Option<(EventKey, E)>, EngineError> {
        let Some((&key, _)) = self.queue.first_key_value() else {
            if self.now < until {
                return Err(EngineError::NoMoreEvents { now: self.now });
            }
            return Ok(None);
        };

        if key.time >= until {
            trace!(
                pending = self.queue.len(),
                horizon = ?until,
                "Time limit reached"
            );
            self.now = self.now.max(until);
            return Ok(None);
        }

        let Some((key, event)) = self.queue.pop_first() else {
            return Ok(None);
        };
        self.now = key.time;
        self.processed += 1;
        Ok(Some((key, event)))
    }

    /// Run until `until`, handing each event to `dispatch`.
    ///
    /// Events returned by `dispatch` are scheduled relative to the time of
    /// the event that produced them.
    pub fn run<F>(&mut self, until: Duration, mut dispatch: F) -> Result<(), EngineError>
    where
        F: FnMut(&mut Self, EventKey, E) -> Vec<(Duration, E)>,
    {
        while let Some((key, event)) = self.next_before(until)? {
            for (delay, next) in dispatch(self, key, event) {
                self.schedule(delay, next);
            }
        }
        Ok(())
    }
}
