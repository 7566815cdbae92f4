//! Action types for the station state machines.

use crate::{Event, TimerHandle, TimerId};
use ptmp_types::{Frame, StationId};
use std::time::Duration;

/// All possible outputs from a station.
///
/// Actions are **commands**: they describe something to do. The runner
/// executes them against the event queue.
#[derive(Debug, Clone)]
pub enum Action {
    /// Put a frame on the medium towards `to`.
    ///
    /// The frame starts arriving at `to` after `delay` plus the frame's
    /// propagation delay.
    Transmit {
        to: StationId,
        frame: Frame,
        delay: Duration,
    },

    /// Schedule a timer to fire after a duration.
    ///
    /// Any pending timer with the same id is replaced.
    SetTimer {
        handle: TimerHandle,
        duration: Duration,
    },

    /// Cancel a previously set timer.
    CancelTimer { id: TimerId },

    /// Feed an event back to the same station after `delay`.
    EnqueueInternal { event: Event, delay: Duration },
}

impl Action {
    /// Get the action type name for logging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::Transmit { .. } => "Transmit",
            Action::SetTimer { .. } => "SetTimer",
            Action::CancelTimer { .. } => "CancelTimer",
            Action::EnqueueInternal { .. } => "EnqueueInternal",
        }
    }
}
