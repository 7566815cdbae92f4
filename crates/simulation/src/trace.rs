//! Optional event trace used for replay comparisons.

use ptmp_core::TimerId;
use ptmp_mac::StationState;
use ptmp_types::{FrameKind, NetworkMode, SequenceNumber, StationId};
use std::time::Duration;

/// What a traced event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceKind {
    /// A frame reached the station.
    Deliver {
        kind: FrameKind,
        origin: StationId,
        seq: SequenceNumber,
    },
    /// A live timer fired.
    Timer(TimerId),
    /// The station's traffic source produced a frame.
    Traffic,
    /// An event the station scheduled for itself.
    Local(&'static str),
    /// The base was asked to switch modes.
    ModeSwitch(NetworkMode),
}

/// One processed event, with the station's state afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    pub time: Duration,
    pub station: StationId,
    pub kind: TraceKind,
    pub state: StationState,
}
