//! Event types for the station state machines.

use crate::TimerHandle;
use ptmp_types::{Frame, NetworkMode};

/// All possible inputs a station can receive.
///
/// Events are **passive data**: they describe something that happened.
/// The station processes them and returns actions.
#[derive(Debug, Clone)]
pub enum Event {
    // ═══════════════════════════════════════════════════════════════════════
    // Medium
    // ═══════════════════════════════════════════════════════════════════════
    /// The first bit of a frame reached this station.
    ///
    /// Reception completes `frame.airtime` later; the station tracks that
    /// with its Frame timer.
    FrameReceived { frame: Frame },

    // ═══════════════════════════════════════════════════════════════════════
    // Timers
    // ═══════════════════════════════════════════════════════════════════════
    /// A previously armed timer expired.
    ///
    /// Stale handles (superseded or cancelled) are ignored by the station.
    TimerFired { handle: TimerHandle },

    // ═══════════════════════════════════════════════════════════════════════
    // Local
    // ═══════════════════════════════════════════════════════════════════════
    /// The station's application produced an outbound frame.
    FrameQueued { frame: Frame },

    /// Administrative request to switch the network mode.
    ///
    /// Only honoured by the base coordinator.
    SetMode { mode: NetworkMode },
}

impl Event {
    /// Get the event type name for logging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::FrameReceived { .. } => "FrameReceived",
            Event::TimerFired { .. } => "TimerFired",
            Event::FrameQueued { .. } => "FrameQueued",
            Event::SetMode { .. } => "SetMode",
        }
    }
}
