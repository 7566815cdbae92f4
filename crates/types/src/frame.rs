//! Protocol message model.

use crate::{NetworkMode, StationId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Per-origin monotonic sequence number, used for duplicate detection.
pub type SequenceNumber = u64;

/// Kind of a MAC frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Payload-carrying data frame.
    Data,
    /// Request to send.
    Rts,
    /// Clear to send.
    Cts,
    /// Single-frame acknowledgment.
    Ack,
    /// Transmission grant from the coordinator (or a grant handed back to it).
    Poll,
    /// End of a granted polling window.
    PollTimeout,
    /// Acknowledgment covering the preceding data frame(s).
    BlockAck,
    /// Network-wide mode change announced by the base.
    Management(NetworkMode),
    /// Marker for a fired timeout.
    Timeout,
}

impl FrameKind {
    /// Get a human-readable name for this frame kind.
    pub fn type_name(&self) -> &'static str {
        match self {
            FrameKind::Data => "DATA",
            FrameKind::Rts => "RTS",
            FrameKind::Cts => "CTS",
            FrameKind::Ack => "ACK",
            FrameKind::Poll => "POLL",
            FrameKind::PollTimeout => "PollTimeout",
            FrameKind::BlockAck => "BA",
            FrameKind::Management(_) => "MGT",
            FrameKind::Timeout => "Timeout",
        }
    }
}

/// Application-level tag carried by data frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppTag {
    /// Echo request; the receiver answers with a [`AppTag::PingResponse`].
    PingRequest,
    /// Echo reply carrying the request's original send timestamp.
    PingResponse,
}

/// A MAC frame in flight or waiting in a station queue.
///
/// Frames are plain values: a broadcast is modelled as several independent
/// copies, never as one frame shared between receivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame kind.
    pub kind: FrameKind,
    /// Simulated transmission duration.
    pub airtime: Duration,
    /// Station the frame is addressed to.
    pub dest: StationId,
    /// Station that sent (or generated) the frame.
    pub origin: StationId,
    /// Origin-assigned sequence number.
    pub seq: SequenceNumber,
    /// Optional application tag.
    pub app: Option<AppTag>,
    /// Simulated time the frame was created by its application.
    pub sent_at: Duration,
    /// Payload size in bytes.
    pub size: usize,
    /// Length of the granted transmission window (POLL only).
    pub poll_window: Duration,
    /// One-way propagation delay between sender and receiver.
    pub propagation: Duration,
}

impl Frame {
    /// Create a frame with every optional field cleared.
    pub fn new(
        kind: FrameKind,
        airtime: Duration,
        dest: StationId,
        origin: StationId,
    ) -> Self {
        Self {
            kind,
            airtime,
            dest,
            origin,
            seq: 0,
            app: None,
            sent_at: Duration::ZERO,
            size: 0,
            poll_window: Duration::ZERO,
            propagation: Duration::ZERO,
        }
    }

    /// Create an application data frame generated at `origin`.
    ///
    /// The frame is addressed to its own origin; the station rewrites the
    /// destination when the frame enters its queue.
    pub fn data(origin: StationId, size: usize, airtime: Duration, sent_at: Duration) -> Self {
        Self {
            size,
            sent_at,
            ..Self::new(FrameKind::Data, airtime, origin, origin)
        }
    }

    /// Set the application tag.
    pub fn with_app(mut self, app: AppTag) -> Self {
        self.app = Some(app);
        self
    }

    /// Set the propagation delay.
    pub fn with_propagation(mut self, propagation: Duration) -> Self {
        self.propagation = propagation;
        self
    }

    /// Whether this frame is addressed to `station`.
    pub fn is_for(&self, station: StationId) -> bool {
        self.dest == station
    }

    /// Whether this is a data frame addressed to `station`.
    pub fn is_data_for(&self, station: StationId) -> bool {
        self.kind == FrameKind::Data && self.dest == station
    }

    /// Network mode carried by a Management frame.
    pub fn management_mode(&self) -> Option<NetworkMode> {
        match self.kind {
            FrameKind::Management(mode) => Some(mode),
            _ => None,
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.app {
            Some(app) => write!(
                f,
                "{} ({:?}): {} -> {}, {:?}",
                self.kind.type_name(),
                app,
                self.origin,
                self.dest,
                self.airtime
            ),
            None => write!(
                f,
                "{}: {} -> {}, {:?}",
                self.kind.type_name(),
                self.origin,
                self.dest,
                self.airtime
            ),
        }
    }
}
