//! Hybrid CSMA/TDMA MAC state machines.
//!
//! This crate provides the synchronous station logic of a point-to-multipoint
//! cell: one base coordinator and its associated clients.
//!
//! # Architecture
//!
//! Every station is a [`Station`] driven by `ptmp_core::Event`s:
//!
//! - `Event::FrameReceived` → classify the frame and run the active step table
//! - `Event::TimerFired` → backoff countdown, end of frame, ack or poll deadline
//! - `Event::FrameQueued` → queue application traffic, transmit if idle
//! - `Event::SetMode` → (base only) announce and apply a network mode change
//!
//! The step tables in [`csma`] and [`tdma`] are plain functions from
//! `(StationState, Input)` to a step value; the station applies the step.
//! All I/O is performed by the runner via returned `Action`s.

mod backoff;
mod config;
mod coordinator;
pub mod csma;
mod state;
mod station;
mod stats;
pub mod tdma;

pub use backoff::ContentionWindow;
pub use config::MacConfig;
pub use coordinator::{Coordinator, PollSchedule, Slot};
pub use state::{Input, StationState};
pub use station::Station;
pub use stats::{LatencyStats, StationStats};
