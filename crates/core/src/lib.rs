//! Core types for the PtMP MAC state machines.
//!
//! Stations are synchronous, deterministic state machines: the runner feeds
//! them [`Event`]s and performs the [`Action`]s they return. Nothing in this
//! crate touches the clock or the event queue directly.

mod action;
mod event;
mod timer;
mod traits;

pub use action::Action;
pub use event::Event;
pub use timer::{TimerHandle, TimerId, TimerSet};
pub use traits::{Arrival, ArrivalContext, StateMachine, TrafficGenerator};
