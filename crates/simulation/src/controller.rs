//! Adaptive mode-switching hook.
//!
//! A [`ModeController`] is sampled periodically with read-only
//! [`NetworkCounters`] and may ask the base to switch the cell's mode. No
//! policy ships with the workspace; learning agents plug in here.

use ptmp_types::NetworkMode;
use std::time::Duration;

/// Read-only snapshot of the cell handed to a controller.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkCounters {
    /// Simulated time of the sample.
    pub now: Duration,
    /// Mode the base is currently in.
    pub mode: NetworkMode,
    /// Associated clients.
    pub clients: usize,
    /// Frames acknowledged across all stations.
    pub delivered: u64,
    /// Overlapping receptions across all stations.
    pub collisions: u64,
    /// Frames dropped after exhausting retries.
    pub dropped: u64,
    /// Payload airtime of acknowledged frames.
    pub useful_airtime: Duration,
    /// Achieved data rate since the start of the run, in Mbit/s.
    pub throughput_mbps: f64,
    /// Mean one-way delivery latency.
    pub mean_latency: Duration,
    /// Frames waiting in queues, in-flight frames included.
    pub backlog: usize,
}

/// Decides the network mode from periodic samples.
pub trait ModeController {
    /// Time between samples.
    fn interval(&self) -> Duration;

    /// Inspect a sample and optionally request a mode.
    ///
    /// Requesting the mode already in effect is a no-op.
    fn on_sample(&mut self, counters: &NetworkCounters) -> Option<NetworkMode>;
}
