//! Core traits for state machines and traffic sources.

use crate::{Action, Event};
use ptmp_types::{Frame, PhyProfile, StationId};
use rand::RngCore;
use std::time::Duration;

/// A state machine that processes events.
///
/// Every station in the cell is implemented as a state machine that is:
///
/// - **Synchronous**: No async, no `.await`
/// - **Deterministic**: Same state + event = same actions
/// - **Pure-ish**: Mutates self, but performs no I/O
///
/// # Example
///
/// ```ignore
/// impl StateMachine for Station {
///     fn handle(&mut self, event: Event) -> Vec<Action> {
///         match event {
///             Event::FrameReceived { frame } => self.on_frame(frame),
///             Event::TimerFired { handle } => self.on_timer(handle),
///             // ... etc
///         }
///     }
///
///     fn set_time(&mut self, now: Duration) {
///         self.now = now;
///     }
/// }
/// ```
pub trait StateMachine {
    /// Process an event, returning actions to perform.
    ///
    /// # Guarantees
    ///
    /// - **Synchronous**: This method never blocks or awaits
    /// - **Deterministic**: Given the same state and event, always returns the same actions
    /// - **No I/O**: Frames and timers are handled by the runner via the returned actions
    fn handle(&mut self, event: Event) -> Vec<Action>;

    /// Set the current time.
    ///
    /// Called by the runner before each `handle()` call.
    fn set_time(&mut self, now: Duration);

    /// Get the current time.
    fn now(&self) -> Duration;
}

/// What a traffic generator sees when producing a frame.
#[derive(Debug, Clone, Copy)]
pub struct ArrivalContext<'a> {
    /// Station the generator feeds.
    pub station: StationId,
    /// Current simulated time.
    pub now: Duration,
    /// PHY profile used to compute airtime.
    pub phy: &'a PhyProfile,
}

/// One generated frame and the delay until the next one.
#[derive(Debug, Clone)]
pub struct Arrival {
    pub frame: Frame,
    /// `None` stops the generator.
    pub next: Option<Duration>,
}

/// Source of application frames for one station.
///
/// The runner owns the schedule: it asks for the first arrival offset once,
/// then calls [`next_arrival`](TrafficGenerator::next_arrival) at every
/// arrival and hands the frame to the station. Generated frames must
/// originate from `ctx.station`.
pub trait TrafficGenerator {
    /// Short name used in reports.
    fn name(&self) -> &'static str;

    /// Delay from the start of the run until the first arrival.
    fn first_arrival(&mut self, rng: &mut dyn RngCore) -> Duration;

    /// Produce the frame due now and the delay until the next arrival.
    fn next_arrival(&mut self, ctx: &ArrivalContext<'_>, rng: &mut dyn RngCore) -> Arrival;
}
