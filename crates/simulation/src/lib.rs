//! Deterministic simulation runner.
//!
//! This crate drives the MAC station state machines through a single global
//! event queue. Given the same seed and layout, it produces identical results
//! every run.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  SimulationRunner                       │
//! │                                                         │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     Engine (BTreeMap<EventKey, SimEvent>)          │ │
//! │  │     Ordered by: time, sequence                     │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     stations: Vec<Station>  (base at index 0)      │ │
//! │  │     generators: traffic source per station         │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     Actions → schedule new events                  │ │
//! │  └────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! A run is assembled with [`NetworkBuilder`], which validates the layout
//! and allocates station ids.

mod controller;
mod error;
mod event_queue;
mod network;
mod runner;
mod trace;

pub use controller::{ModeController, NetworkCounters};
pub use error::{ConfigError, EngineError, SimulationError};
pub use event_queue::{Engine, EventKey};
pub use network::{NetworkBuilder, NetworkConfig};
pub use runner::{SimEvent, SimulationRunner, SimulationStats};
pub use trace::{TraceEntry, TraceKind};
