//! Polled access (TDMA) step tables.
//!
//! Clients only transmit inside a window granted by a POLL and hand the
//! grant back to the base when their queue empties or the window expires.
//! The base cycles the grant over itself and its roster.

use crate::state::{Input, StationState};

/// Transition selected by a polling table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Input has no effect in this state.
    Ignore,
    /// Track an incoming data frame; addressed data moves to `DataReceiving`.
    StartRx,
    /// Addressed data fully received: acknowledge it and return to idle.
    RxComplete,
    /// A POLL grant started arriving (client).
    PollGranted,
    /// A station handed the grant back (base).
    PollReturned,
    /// Transmit while the window lasts; end the window when nothing is left.
    UseWindow,
    /// Our BlockAck arrived: the exchange succeeded.
    Acknowledged,
    /// No acknowledgment inside the window: retry or drop.
    AckFailed,
    /// The window expired mid-exchange; finish it first.
    WindowClosing,
    /// End an expired window once the pending exchange is resolved.
    CloseWindow { acknowledged: bool },
    /// The reclaim deadline fired while receiving; retry once reception ends.
    PostponeReclaim,
    /// Grant the next slot of the polling cycle (base).
    Schedule,
}

/// Rows shared by client and base: transmitting inside a window.
fn window_step(state: StationState, input: Input) -> Option<Step> {
    use Input::*;
    use StationState::*;

    let step = match (state, input) {
        (DataReceiving, Timeout) => Step::RxComplete,

        (Wait, BlockAck { addressed: true }) => Step::Acknowledged,
        (Wait, Timeout) => Step::AckFailed,
        (Wait | BlockAckWait, PollTimeout) => Step::WindowClosing,

        (BlockAckWait, Timeout) => Step::UseWindow,

        (PollWindowEnd, BlockAck { addressed: true }) => Step::CloseWindow { acknowledged: true },
        (PollWindowEnd, Timeout) => Step::CloseWindow {
            acknowledged: false,
        },

        _ => return None,
    };
    Some(step)
}

/// Polling table for a client station.
pub fn client_step(state: StationState, input: Input) -> Step {
    use Input::*;
    use StationState::*;

    if let Some(step) = window_step(state, input) {
        return step;
    }
    match (state, input) {
        (Idle, Data { .. }) => Step::StartRx,
        (Idle, Poll) => Step::PollGranted,
        (PollReceiving, Timeout) => Step::UseWindow,
        _ => Step::Ignore,
    }
}

/// Polling table for the base coordinator.
pub fn base_step(state: StationState, input: Input) -> Step {
    use Input::*;
    use StationState::*;

    if let Some(step) = window_step(state, input) {
        return step;
    }
    match (state, input) {
        (Idle, Data { addressed: true }) => Step::StartRx,
        (Idle, Poll) => Step::PollReturned,
        (Idle, PollTimeout) => Step::Schedule,
        (PollReceiving, Timeout) => Step::Schedule,
        (DataReceiving, PollTimeout) => Step::PostponeReclaim,
        _ => Step::Ignore,
    }
}
