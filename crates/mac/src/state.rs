//! Station protocol states and step-table inputs.

use std::fmt;

/// Protocol state of one station.
///
/// A station is in exactly one state at any simulated instant. The last
/// three variants are only reachable in TDMA mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StationState {
    /// Nothing in progress.
    #[default]
    Idle,
    /// Own frame on the medium, waiting for its acknowledgment.
    Wait,
    /// Counting down a backoff after a failed exchange.
    PostErrorBackoff,
    /// Receiving a data frame addressed to this station.
    Receiving,
    /// Counting down a backoff after a successful exchange.
    PostSuccessBackoff,
    /// A collision corrupted the exchange this station was waiting on.
    ReceiveError,
    /// A collision corrupted a reception.
    Collision,
    /// Receiving the BlockAck for the frame just sent.
    BlockAckWait,
    /// Sending the BlockAck for a received frame.
    ReceiveEnd,
    /// Deferring to foreign traffic after a failed exchange.
    NavDefer,
    /// Deferring to foreign traffic.
    NavDeferOk,
    /// Receiving a data frame while polled access is active.
    DataReceiving,
    /// Receiving a POLL grant (or a handed-back grant at the base).
    PollReceiving,
    /// The polling window expired while an exchange was in progress.
    PollWindowEnd,
}

impl fmt::Display for StationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Input symbol fed to a step table.
///
/// Frames are classified by kind and by whether they are addressed to the
/// receiving station; fired timers become `Timeout` or `PollTimeout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    /// Ack, Frame or exhausted Backoff timer.
    Timeout,
    /// Poll timer.
    PollTimeout,
    /// Start of a DATA frame.
    Data { addressed: bool },
    /// Start of a BlockAck frame.
    BlockAck { addressed: bool },
    /// Start of a POLL addressed to this station.
    Poll,
}
