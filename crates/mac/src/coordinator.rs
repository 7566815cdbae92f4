//! Base coordinator state: roster and polling cycle.

use indexmap::IndexMap;
use ptmp_types::StationId;
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;

/// Who holds the next polling slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// The base itself.
    Base,
    /// A client from the roster.
    Client(StationId),
}

/// Round-robin cursor over `[base, roster...]`.
#[derive(Debug, Clone, Default)]
pub struct PollSchedule {
    cursor: usize,
}

impl PollSchedule {
    /// Restart the cycle at the base.
    pub fn restart(&mut self) {
        self.cursor = 0;
    }

    /// Return the current slot and advance the cursor.
    pub fn advance(&mut self, roster: &[StationId]) -> Slot {
        let len = roster.len() + 1;
        let position = self.cursor % len;
        self.cursor = (position + 1) % len;
        match position {
            0 => Slot::Base,
            n => Slot::Client(roster[n - 1]),
        }
    }
}

/// Coordinator-only state carried by the base station.
#[derive(Debug, Clone)]
pub struct Coordinator {
    roster: IndexMap<StationId, Duration>,
    order: Vec<StationId>,
    schedule: PollSchedule,
    period: Duration,
    /// Client currently holding a POLL grant.
    grantee: Option<StationId>,
}

impl Coordinator {
    pub fn new(period: Duration) -> Self {
        Self {
            roster: IndexMap::new(),
            order: Vec::new(),
            schedule: PollSchedule::default(),
            period,
            grantee: None,
        }
    }

    /// Associate a client at the given one-way propagation delay.
    pub fn associate(&mut self, station: StationId, propagation: Duration) {
        if self.roster.insert(station, propagation).is_none() {
            self.order.push(station);
        }
    }

    /// Associated clients in association order.
    pub fn roster(&self) -> &[StationId] {
        &self.order
    }

    pub fn num_clients(&self) -> usize {
        self.order.len()
    }

    /// Propagation delay towards `station`, if associated.
    pub fn propagation(&self, station: StationId) -> Option<Duration> {
        self.roster.get(&station).copied()
    }

    /// Polling window granted to each slot.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Pick a random associated client.
    pub fn random_client<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<StationId> {
        self.order.choose(rng).copied()
    }

    /// Roster in a random order, for fanning out a frame.
    pub fn shuffled<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<(StationId, Duration)> {
        let mut copies: Vec<_> = self.roster.iter().map(|(id, p)| (*id, *p)).collect();
        copies.shuffle(rng);
        copies
    }

    pub fn restart_cycle(&mut self) {
        self.schedule.restart();
        self.grantee = None;
    }

    /// Record that `station` was granted the medium, superseding any
    /// earlier grant.
    pub fn grant(&mut self, station: StationId) {
        self.grantee = Some(station);
    }

    /// Revoke any outstanding grant.
    pub fn revoke(&mut self) {
        self.grantee = None;
    }

    pub fn grantee(&self) -> Option<StationId> {
        self.grantee
    }

    /// Take the grant back from `station`.
    ///
    /// Returns false when `station` no longer holds it.
    pub fn release(&mut self, station: StationId) -> bool {
        if self.grantee == Some(station) {
            self.grantee = None;
            true
        } else {
            false
        }
    }

    /// Next slot of the polling cycle.
    pub fn next_slot(&mut self) -> Slot {
        self.schedule.advance(&self.order)
    }
}
