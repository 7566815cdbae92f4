//! Core types for the hybrid CSMA/TDMA point-to-multipoint MAC simulator.
//!
//! Everything here is plain data: identifiers, the [`Frame`] message model,
//! the network-wide [`NetworkMode`] and the [`PhyProfile`] used to turn
//! payload sizes into airtime.

mod frame;
mod identifiers;
mod mode;
mod phy;

pub use frame::{AppTag, Frame, FrameKind, SequenceNumber};
pub use identifiers::StationId;
pub use mode::NetworkMode;
pub use phy::{propagation_delay, PhyProfile};
