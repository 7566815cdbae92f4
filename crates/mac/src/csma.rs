//! Contention (CSMA/CA) step table.
//!
//! [`step`] maps every `(state, input)` pair to the [`Step`] the station
//! must apply. The table is pure; all side effects live in the station.

use crate::state::{Input, StationState};
use ptmp_core::TimerId;

/// Transition selected by the contention table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Input has no effect in this state.
    Ignore,
    /// Medium became busy: freeze the backoff and track the frame. Addressed
    /// data moves to `Receiving`, anything else to `nav`.
    StartRx { nav: StationState },
    /// Another frame while deferring: restart the Frame timer.
    ExtendNav,
    /// Medium is idle again: resume or start a backoff, or go idle.
    FinishRx,
    /// Addressed data fully received: acknowledge it and deliver it.
    RxComplete,
    /// Overlapping reception: cancel `cancel`, track the new frame, move to
    /// `next` and count a collision.
    Collide {
        cancel: TimerId,
        next: StationState,
    },
    /// Our BlockAck started arriving.
    BlockAckReceived,
    /// No (intact) acknowledgment: retry or drop the frame in flight.
    AckFailed,
    /// BlockAck fully received: the exchange succeeded.
    ExchangeComplete,
    /// Backoff elapsed: transmit the frame in flight or the next queued one.
    Transmit,
}

/// Contention step table.
pub fn step(state: StationState, input: Input) -> Step {
    use Input::*;
    use StationState::*;

    let collide = |cancel, next| Step::Collide { cancel, next };

    match (state, input) {
        (Idle, Data { .. } | BlockAck { .. }) => Step::StartRx { nav: NavDeferOk },

        (NavDefer | NavDeferOk, Timeout) => Step::FinishRx,
        (NavDefer | NavDeferOk, Data { .. } | BlockAck { .. }) => Step::ExtendNav,

        (Receiving, Timeout) => Step::RxComplete,
        (Receiving | ReceiveEnd | Collision, Data { .. } | BlockAck { .. }) => {
            collide(TimerId::Frame, Collision)
        }
        (ReceiveEnd | Collision, Timeout) => Step::FinishRx,

        (ReceiveError, Timeout) => Step::AckFailed,
        (ReceiveError, Data { .. } | BlockAck { .. }) => collide(TimerId::Frame, ReceiveError),

        (Wait, Timeout) => Step::AckFailed,
        (Wait, BlockAck { addressed: true }) => Step::BlockAckReceived,
        (Wait, BlockAck { addressed: false } | Data { .. }) => {
            collide(TimerId::Ack, ReceiveError)
        }

        (BlockAckWait, Timeout) => Step::ExchangeComplete,
        (BlockAckWait, Data { .. } | BlockAck { .. }) => collide(TimerId::Frame, ReceiveError),

        (PostSuccessBackoff | PostErrorBackoff, Timeout) => Step::Transmit,
        (PostSuccessBackoff, Data { .. } | BlockAck { .. }) => Step::StartRx { nav: NavDeferOk },
        (PostErrorBackoff, Data { .. } | BlockAck { .. }) => Step::StartRx { nav: NavDefer },

        _ => Step::Ignore,
    }
}
