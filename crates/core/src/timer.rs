//! Named station timers.
//!
//! A station owns at most one pending timer per [`TimerId`]. Arming a name
//! again supersedes the previous timer: the new [`TimerHandle`] carries a
//! fresh generation and the old handle no longer matches when it fires.

use std::fmt;

/// Timer identification for scheduled station events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerId {
    /// Waiting for the acknowledgment of a transmitted frame.
    Ack,
    /// Backoff slot countdown.
    Backoff,
    /// End of a frame currently on the medium.
    Frame,
    /// End of a polling window (or the coordinator's reclaim deadline).
    Poll,
}

impl TimerId {
    /// Every timer name, in slot order.
    pub const ALL: [TimerId; 4] = [TimerId::Ack, TimerId::Backoff, TimerId::Frame, TimerId::Poll];

    fn slot(self) -> usize {
        match self {
            TimerId::Ack => 0,
            TimerId::Backoff => 1,
            TimerId::Frame => 2,
            TimerId::Poll => 3,
        }
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Handle of one armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    pub id: TimerId,
    pub generation: u64,
}

/// The set of timers currently armed by one station.
#[derive(Debug, Clone, Default)]
pub struct TimerSet {
    armed: [Option<u64>; 4],
    next_generation: u64,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `id`, superseding any pending timer of the same name.
    pub fn arm(&mut self, id: TimerId) -> TimerHandle {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.armed[id.slot()] = Some(generation);
        TimerHandle { id, generation }
    }

    /// Disarm `id`. Returns whether it was armed.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.armed[id.slot()].take().is_some()
    }

    /// Consume a fired handle.
    ///
    /// Returns `true` only if the handle is the current one for its name; the
    /// timer is then disarmed.
    pub fn fire(&mut self, handle: TimerHandle) -> bool {
        let slot = &mut self.armed[handle.id.slot()];
        if *slot == Some(handle.generation) {
            *slot = None;
            true
        } else {
            false
        }
    }

    pub fn is_armed(&self, id: TimerId) -> bool {
        self.armed[id.slot()].is_some()
    }

    /// Names of all armed timers.
    pub fn active(&self) -> impl Iterator<Item = TimerId> + '_ {
        TimerId::ALL.into_iter().filter(|id| self.is_armed(*id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rearm_supersedes_previous_handle() {
        let mut timers = TimerSet::new();
        let first = timers.arm(TimerId::Ack);
        let second = timers.arm(TimerId::Ack);

        assert_ne!(first, second);
        assert!(!timers.fire(first), "superseded handle must not fire");
        assert!(timers.fire(second));
        assert!(!timers.is_armed(TimerId::Ack));
    }

    #[test]
    fn test_cancel_then_fire_is_ignored() {
        let mut timers = TimerSet::new();
        let handle = timers.arm(TimerId::Backoff);
        assert!(timers.cancel(TimerId::Backoff));
        assert!(!timers.cancel(TimerId::Backoff));
        assert!(!timers.fire(handle));
    }

    #[test]
    fn test_names_are_independent() {
        let mut timers = TimerSet::new();
        let ack = timers.arm(TimerId::Ack);
        timers.arm(TimerId::Frame);
        timers.arm(TimerId::Poll);

        assert_eq!(
            timers.active().collect::<Vec<_>>(),
            vec![TimerId::Ack, TimerId::Frame, TimerId::Poll]
        );
        timers.cancel(TimerId::Frame);
        assert!(timers.fire(ack));
        assert_eq!(timers.active().collect::<Vec<_>>(), vec![TimerId::Poll]);
    }
}
