//! Station state machine.
//!
//! One [`Station`] type covers both ends of the cell. A client talks to a
//! single base; the base additionally carries a [`Coordinator`] and fans its
//! transmissions out to every associated client. The current
//! [`NetworkMode`] selects which step table drives the station.

use crate::backoff::ContentionWindow;
use crate::config::MacConfig;
use crate::coordinator::{Coordinator, Slot};
use crate::state::{Input, StationState};
use crate::stats::StationStats;
use crate::{csma, tdma};
use ptmp_core::{Action, Event, StateMachine, TimerHandle, TimerId, TimerSet};
use ptmp_types::{
    AppTag, Frame, FrameKind, NetworkMode, PhyProfile, SequenceNumber, StationId,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

#[derive(Debug, Clone)]
enum Role {
    Client {
        base: StationId,
        propagation: Duration,
    },
    Coordinator(Coordinator),
}

/// A station of the PtMP cell.
pub struct Station {
    id: StationId,
    role: Role,
    mode: NetworkMode,
    state: StationState,
    config: MacConfig,
    phy: PhyProfile,

    /// Outbound frames waiting for their first transmission.
    queue: VecDeque<Frame>,
    /// Frame being transmitted or retransmitted.
    current: Option<Frame>,
    retries: u32,
    cw: ContentionWindow,
    backoff_slots: u32,
    timers: TimerSet,

    /// Last frame sensed on the medium.
    last_rx: Option<Frame>,
    next_seq: SequenceNumber,
    /// Highest sequence number accepted from each peer.
    peer_seq: HashMap<StationId, SequenceNumber>,

    rng: ChaCha8Rng,
    stats: StationStats,
    actions: Vec<Action>,
    now: Duration,
}

impl Station {
    /// Create a client associated with `base` at the given propagation delay.
    pub fn client(
        id: StationId,
        base: StationId,
        propagation: Duration,
        config: MacConfig,
        phy: PhyProfile,
        seed: u64,
    ) -> Self {
        Self::new(id, Role::Client { base, propagation }, config, phy, seed)
    }

    /// Create a base coordinator with an empty roster.
    pub fn coordinator(id: StationId, config: MacConfig, phy: PhyProfile, seed: u64) -> Self {
        let coordinator = Coordinator::new(config.poll_period());
        Self::new(id, Role::Coordinator(coordinator), config, phy, seed)
    }

    fn new(id: StationId, role: Role, config: MacConfig, phy: PhyProfile, seed: u64) -> Self {
        let station_seed = seed ^ u64::from(id.0).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        Self {
            id,
            role,
            mode: NetworkMode::default(),
            state: StationState::Idle,
            cw: ContentionWindow::new(config.cw_min, config.cw_max),
            config,
            phy,
            queue: VecDeque::new(),
            current: None,
            retries: 0,
            backoff_slots: 0,
            timers: TimerSet::new(),
            last_rx: None,
            next_seq: 0,
            peer_seq: HashMap::new(),
            rng: ChaCha8Rng::seed_from_u64(station_seed),
            stats: StationStats::default(),
            actions: Vec::new(),
            now: Duration::ZERO,
        }
    }

    /// Set the mode the station starts in.
    pub fn with_mode(mut self, mode: NetworkMode) -> Self {
        self.mode = mode;
        self
    }

    /// Associate a client with this base.
    ///
    /// Returns `false` when called on a client.
    pub fn associate(&mut self, station: StationId, propagation: Duration) -> bool {
        match &mut self.role {
            Role::Coordinator(coordinator) => {
                coordinator.associate(station, propagation);
                true
            }
            Role::Client { .. } => false,
        }
    }

    /// Actions needed at the start of a run.
    ///
    /// A base that starts in TDMA opens the first polling cycle.
    pub fn start(&mut self) -> Vec<Action> {
        if self.mode == NetworkMode::Tdma && self.is_coordinator() {
            if let Role::Coordinator(coordinator) = &mut self.role {
                coordinator.restart_cycle();
            }
            self.schedule_next();
        }
        std::mem::take(&mut self.actions)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn id(&self) -> StationId {
        self.id
    }

    pub fn mode(&self) -> NetworkMode {
        self.mode
    }

    pub fn state(&self) -> StationState {
        self.state
    }

    pub fn is_coordinator(&self) -> bool {
        matches!(self.role, Role::Coordinator(_))
    }

    /// Coordinator state, for the base only.
    pub fn coordinator_state(&self) -> Option<&Coordinator> {
        match &self.role {
            Role::Coordinator(coordinator) => Some(coordinator),
            Role::Client { .. } => None,
        }
    }

    /// Frames waiting in the queue, excluding the one in flight.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn in_flight(&self) -> Option<&Frame> {
        self.current.as_ref()
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Current contention window in slots.
    pub fn contention_window(&self) -> u32 {
        self.cw.current()
    }

    pub fn backoff_slots(&self) -> u32 {
        self.backoff_slots
    }

    pub fn timers(&self) -> &TimerSet {
        &self.timers
    }

    pub fn stats(&self) -> &StationStats {
        &self.stats
    }

    pub fn phy(&self) -> &PhyProfile {
        &self.phy
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Event Entry Points
    // ═══════════════════════════════════════════════════════════════════════════

    fn on_frame(&mut self, frame: Frame) {
        trace!(
            station = %self.id,
            state = %self.state,
            frame = %frame,
            "Frame arriving"
        );

        if let Some(mode) = frame.management_mode() {
            if frame.is_for(self.id) && !self.is_coordinator() {
                self.switch_mode(mode);
            }
            return;
        }

        let addressed = frame.is_for(self.id);
        let input = match frame.kind {
            FrameKind::Data => Input::Data { addressed },
            FrameKind::BlockAck => Input::BlockAck { addressed },
            FrameKind::Poll if addressed => Input::Poll,
            _ => {
                trace!(station = %self.id, kind = frame.kind.type_name(), "Ignoring frame");
                return;
            }
        };
        self.dispatch(input, Some(frame));
    }

    fn on_timer(&mut self, handle: TimerHandle) {
        if !self.timers.fire(handle) {
            trace!(station = %self.id, timer = %handle.id, "Ignoring stale timer");
            return;
        }
        match handle.id {
            TimerId::Backoff => self.backoff_tick(),
            TimerId::Poll => self.dispatch(Input::PollTimeout, None),
            TimerId::Ack | TimerId::Frame => self.dispatch(Input::Timeout, None),
        }
    }

    fn on_frame_queued(&mut self, mut frame: Frame) {
        frame.seq = self.next_seq;
        self.next_seq += 1;
        if let Role::Client { base, .. } = self.role {
            frame.dest = base;
        }
        trace!(station = %self.id, seq = frame.seq, queue = self.queue.len(), "Frame queued");
        self.queue.push_back(frame);

        if self.mode == NetworkMode::Csma && self.state == StationState::Idle {
            self.dequeue();
        }
    }

    /// Switch the whole cell to `mode`.
    ///
    /// Only the base coordinator acts on this; it announces the change with
    /// Management frames and switches itself.
    pub fn set_mode(&mut self, mode: NetworkMode) -> Vec<Action> {
        self.request_mode(mode);
        std::mem::take(&mut self.actions)
    }

    fn request_mode(&mut self, mode: NetworkMode) {
        if !self.is_coordinator() {
            warn!(
                station = %self.id,
                mode = %mode,
                "Ignoring mode change request: only the base can switch modes"
            );
            return;
        }
        if mode == self.mode {
            debug!(station = %self.id, mode = %mode, "Network already in requested mode");
            return;
        }

        let announcement = Frame::new(
            FrameKind::Management(mode),
            Duration::ZERO,
            self.id,
            self.id,
        );
        let delay = self.config.ifs();
        for (to, frame) in self.fan_out(&announcement) {
            self.actions.push(Action::Transmit { to, frame, delay });
        }
        self.switch_mode(mode);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Step Dispatch
    // ═══════════════════════════════════════════════════════════════════════════

    fn dispatch(&mut self, input: Input, frame: Option<Frame>) {
        match self.mode {
            NetworkMode::Csma => {
                let step = csma::step(self.state, input);
                trace!(station = %self.id, state = %self.state, ?input, ?step, "CSMA step");
                self.apply_csma(step, frame);
            }
            NetworkMode::Tdma => {
                let step = if self.is_coordinator() {
                    tdma::base_step(self.state, input)
                } else {
                    tdma::client_step(self.state, input)
                };
                trace!(station = %self.id, state = %self.state, ?input, ?step, "TDMA step");
                self.apply_tdma(step, frame);
            }
        }
    }

    fn apply_csma(&mut self, step: csma::Step, frame: Option<Frame>) {
        use StationState::*;

        match step {
            csma::Step::Ignore => {}
            csma::Step::StartRx { nav } => {
                let Some(frame) = frame else { return };
                self.start_rx(frame, Receiving, Some(nav));
            }
            csma::Step::ExtendNav => {
                let Some(frame) = frame else { return };
                self.arm(TimerId::Frame, frame.airtime);
                self.last_rx = Some(frame);
            }
            csma::Step::FinishRx => self.finish_rx(),
            csma::Step::RxComplete => self.rx_complete(ReceiveEnd),
            csma::Step::Collide { cancel, next } => {
                let Some(frame) = frame else { return };
                self.collide(frame, cancel, next);
            }
            csma::Step::BlockAckReceived => {
                let Some(frame) = frame else { return };
                self.cancel(TimerId::Ack);
                self.arm(TimerId::Frame, frame.airtime);
                self.set_state(BlockAckWait);
            }
            csma::Step::AckFailed => {
                self.cw.on_collision();
                if self.register_failure() {
                    self.backoff_before_next();
                } else {
                    let slots = self.cw.draw(&mut self.rng);
                    self.start_backoff(slots);
                    self.set_state(PostErrorBackoff);
                }
            }
            csma::Step::ExchangeComplete => {
                self.complete_exchange();
                self.start_backoff(self.cw.min());
                self.set_state(PostSuccessBackoff);
            }
            csma::Step::Transmit => {
                if !self.transmit_pending() {
                    self.set_state(Idle);
                }
            }
        }
    }

    fn apply_tdma(&mut self, step: tdma::Step, frame: Option<Frame>) {
        use StationState::*;

        match step {
            tdma::Step::Ignore => {}
            tdma::Step::StartRx => {
                let Some(frame) = frame else { return };
                self.start_rx(frame, DataReceiving, None);
            }
            tdma::Step::RxComplete => self.rx_complete(Idle),
            tdma::Step::PollGranted => {
                let Some(frame) = frame else { return };
                self.arm(TimerId::Frame, frame.airtime);
                self.arm(TimerId::Poll, frame.poll_window + frame.airtime);
                debug!(
                    station = %self.id,
                    window = ?frame.poll_window,
                    queue = self.queue.len(),
                    "Polled"
                );
                self.set_state(PollReceiving);
            }
            tdma::Step::PollReturned => {
                let Some(frame) = frame else { return };
                let current = match &mut self.role {
                    Role::Coordinator(coordinator) => coordinator.release(frame.origin),
                    Role::Client { .. } => false,
                };
                if !current {
                    debug!(
                        station = %self.id,
                        from = %frame.origin,
                        "Ignoring POLL from a station without the grant"
                    );
                    return;
                }
                self.cancel(TimerId::Poll);
                self.arm(TimerId::Frame, frame.airtime);
                self.set_state(PollReceiving);
            }
            tdma::Step::UseWindow => {
                if !self.transmit_pending() {
                    self.end_window();
                }
            }
            tdma::Step::Acknowledged => {
                let Some(frame) = frame else { return };
                self.cancel(TimerId::Ack);
                self.complete_exchange();
                self.arm(TimerId::Frame, frame.airtime);
                self.set_state(BlockAckWait);
            }
            tdma::Step::AckFailed => {
                self.register_failure();
                if !self.transmit_pending() {
                    self.end_window();
                }
            }
            tdma::Step::WindowClosing => self.set_state(PollWindowEnd),
            tdma::Step::CloseWindow { acknowledged } => {
                if acknowledged {
                    // Hand the window back once the BlockAck has been received.
                    let Some(frame) = frame else { return };
                    self.cancel(TimerId::Ack);
                    self.complete_exchange();
                    self.arm(TimerId::Frame, frame.airtime);
                    return;
                }
                if self.current.is_some() {
                    // Kept for the next window unless the limit is reached.
                    self.register_failure();
                }
                self.end_window();
            }
            tdma::Step::PostponeReclaim => {
                let remaining = self.last_rx.as_ref().map(|f| f.airtime).unwrap_or_default()
                    + self.config.sifs()
                    + self.phy.airtime(self.config.block_ack_size);
                self.arm(TimerId::Poll, remaining);
            }
            tdma::Step::Schedule => self.schedule_next(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Reception
    // ═══════════════════════════════════════════════════════════════════════════

    /// Medium busy: freeze the backoff and follow the frame until it ends.
    fn start_rx(&mut self, frame: Frame, receiving: StationState, nav: Option<StationState>) {
        self.cancel(TimerId::Backoff);
        self.arm(TimerId::Frame, frame.airtime);
        let addressed = frame.is_data_for(self.id);
        self.last_rx = Some(frame);
        if addressed {
            self.set_state(receiving);
        } else if let Some(nav) = nav {
            self.set_state(nav);
        }
    }

    fn collide(&mut self, frame: Frame, cancel: TimerId, next: StationState) {
        self.cancel(cancel);
        self.arm(TimerId::Frame, frame.airtime);
        self.last_rx = Some(frame);
        self.stats.collisions += 1;
        debug!(
            station = %self.id,
            state = %self.state,
            next = %next,
            collisions = self.stats.collisions,
            "Collision"
        );
        self.set_state(next);
    }

    /// Medium idle again after a reception or a deferral.
    fn finish_rx(&mut self) {
        use StationState::*;

        let after = if self.current.is_some() {
            PostErrorBackoff
        } else {
            PostSuccessBackoff
        };

        if self.backoff_slots > 0 {
            // Resume the frozen countdown.
            self.arm(TimerId::Backoff, self.config.slot());
            self.set_state(after);
        } else if self.current.is_some() || !self.queue.is_empty() {
            let slots = self.cw.draw(&mut self.rng);
            self.start_backoff(slots);
            self.set_state(after);
        } else {
            self.set_state(Idle);
        }
    }

    /// An addressed data frame ended intact: acknowledge and deliver it.
    fn rx_complete(&mut self, next: StationState) {
        let Some(frame) = self.last_rx.take() else {
            self.set_state(StationState::Idle);
            return;
        };
        if !frame.is_data_for(self.id) {
            self.set_state(StationState::Idle);
            return;
        }

        let ba_airtime = self.send_block_ack(&frame);
        self.accept(frame);
        self.arm(
            TimerId::Frame,
            ba_airtime + self.config.sifs() + self.config.ifs(),
        );
        self.set_state(next);
    }

    fn send_block_ack(&mut self, frame: &Frame) -> Duration {
        let airtime = self.phy.airtime(self.config.block_ack_size);
        let mut ack = Frame::new(FrameKind::BlockAck, airtime, frame.origin, self.id)
            .with_propagation(self.propagation_to(frame.origin));
        ack.seq = frame.seq;
        ack.sent_at = self.now;
        self.put_on_air(ack, self.config.sifs());
        airtime
    }

    /// Deliver an acknowledged data frame to the application.
    fn accept(&mut self, frame: Frame) {
        let fresh = self
            .peer_seq
            .get(&frame.origin)
            .map_or(true, |last| *last < frame.seq);
        if !fresh {
            self.stats.duplicates += 1;
            debug!(
                station = %self.id,
                from = %frame.origin,
                seq = frame.seq,
                "Duplicate frame"
            );
            return;
        }
        self.peer_seq.insert(frame.origin, frame.seq);

        self.stats.received += 1;
        let latency = self.now.saturating_sub(frame.sent_at);
        self.stats.latency.record(latency);

        match frame.app {
            Some(AppTag::PingRequest) => {
                let mut response = Frame::data(self.id, frame.size, frame.airtime, frame.sent_at)
                    .with_app(AppTag::PingResponse);
                response.dest = frame.origin;
                self.actions.push(Action::EnqueueInternal {
                    event: Event::FrameQueued { frame: response },
                    delay: Duration::ZERO,
                });
            }
            Some(AppTag::PingResponse) => {
                if latency < self.config.ping_latency_cap() {
                    self.stats.ping.record(latency);
                }
            }
            None => {}
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Transmission
    // ═══════════════════════════════════════════════════════════════════════════

    /// Send the frame in flight again, or the next queued one.
    fn transmit_pending(&mut self) -> bool {
        if self.current.is_some() {
            self.stats.retransmissions += 1;
            self.transmit_current();
            true
        } else {
            self.dequeue()
        }
    }

    /// Take the next frame from the queue and transmit it.
    fn dequeue(&mut self) -> bool {
        while let Some(mut frame) = self.queue.pop_front() {
            if frame.app == Some(AppTag::PingResponse)
                && self.now.saturating_sub(frame.sent_at) > self.config.ping_stale()
            {
                self.stats.ping.lost += 1;
                debug!(station = %self.id, seq = frame.seq, "Discarding stale ping response");
                continue;
            }

            if frame.dest == self.id {
                match self.pick_destination() {
                    Some(dest) => frame.dest = dest,
                    None => {
                        warn!(station = %self.id, "No destination for queued frame");
                        self.stats.dropped += 1;
                        continue;
                    }
                }
            }
            frame.propagation = self.propagation_to(frame.dest);

            self.cw.reset();
            self.retries = 0;
            self.stats.frames_sent += 1;
            self.current = Some(frame);
            self.transmit_current();
            return true;
        }
        false
    }

    fn transmit_current(&mut self) {
        let Some(frame) = self.current.clone() else {
            return;
        };
        self.stats.transmissions += 1;

        let jitter = Duration::from_micros(self.rng.gen_range(self.config.tx_jitter_range()));
        let timeout = frame.airtime + self.ack_timeout(frame.dest) + jitter;
        trace!(
            station = %self.id,
            to = %frame.dest,
            seq = frame.seq,
            retries = self.retries,
            "Transmitting"
        );
        self.put_on_air(frame, Duration::ZERO);
        self.arm(TimerId::Ack, timeout);
        self.set_state(StationState::Wait);
    }

    /// Put a frame on the medium. A base has no broadcast and sends one
    /// copy per client after an IFS.
    fn put_on_air(&mut self, frame: Frame, delay: Duration) {
        let base = match self.role {
            Role::Client { base, .. } => Some(base),
            Role::Coordinator(_) => None,
        };
        match base {
            Some(to) => self.actions.push(Action::Transmit { to, frame, delay }),
            None => {
                let delay = self.config.ifs();
                for (to, copy) in self.fan_out(&frame) {
                    self.actions.push(Action::Transmit {
                        to,
                        frame: copy,
                        delay,
                    });
                }
            }
        }
    }

    /// Independent copies of `frame`, one per associated client, in random
    /// order.
    ///
    /// Data and BlockAck copies keep their real destination so uninvolved
    /// clients only defer; Management copies are addressed to each client.
    pub fn fan_out(&mut self, frame: &Frame) -> Vec<(StationId, Frame)> {
        let Role::Coordinator(coordinator) = &self.role else {
            return Vec::new();
        };
        coordinator
            .shuffled(&mut self.rng)
            .into_iter()
            .map(|(station, propagation)| {
                let mut copy = frame.clone().with_propagation(propagation);
                if let FrameKind::Management(_) = frame.kind {
                    copy.dest = station;
                }
                (station, copy)
            })
            .collect()
    }

    fn pick_destination(&mut self) -> Option<StationId> {
        match &self.role {
            Role::Client { base, .. } => Some(*base),
            Role::Coordinator(coordinator) => coordinator.random_client(&mut self.rng),
        }
    }

    fn propagation_to(&self, station: StationId) -> Duration {
        match &self.role {
            Role::Client { propagation, .. } => *propagation,
            Role::Coordinator(coordinator) => coordinator.propagation(station).unwrap_or_default(),
        }
    }

    /// Acknowledgment allowance on top of the frame's own airtime.
    fn ack_timeout(&self, dest: StationId) -> Duration {
        let one_way =
            self.config.sifs() + self.propagation_to(dest) + self.phy.airtime(self.config.ack_size);
        one_way * 2
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Exchange Outcome
    // ═══════════════════════════════════════════════════════════════════════════

    fn complete_exchange(&mut self) {
        if let Some(frame) = self.current.take() {
            self.stats.delivered += 1;
            self.stats.useful_airtime += frame.airtime.saturating_sub(self.phy.overhead());
            trace!(station = %self.id, seq = frame.seq, "Frame acknowledged");
        }
        self.retries = 0;
        self.cw.reset();
    }

    /// Count a failed attempt. Returns `true` if the frame was dropped.
    fn register_failure(&mut self) -> bool {
        self.retries += 1;
        if !self.config.retries_exhausted(self.retries) {
            return false;
        }
        if let Some(frame) = self.current.take() {
            self.stats.dropped += 1;
            debug!(
                station = %self.id,
                to = %frame.dest,
                seq = frame.seq,
                retries = self.retries - 1,
                "Dropping frame after retry limit"
            );
        }
        self.retries = 0;
        self.cw.reset();
        true
    }

    /// After a drop, contend for the next queued frame or go idle.
    fn backoff_before_next(&mut self) {
        if self.queue.is_empty() {
            self.set_state(StationState::Idle);
        } else {
            let slots = self.cw.draw(&mut self.rng);
            self.start_backoff(slots);
            self.set_state(StationState::PostSuccessBackoff);
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Backoff
    // ═══════════════════════════════════════════════════════════════════════════

    /// Start a countdown of `slots`; the first step waits one IFS.
    fn start_backoff(&mut self, slots: u32) {
        self.backoff_slots = slots;
        self.arm(TimerId::Backoff, self.config.ifs());
    }

    fn backoff_tick(&mut self) {
        if self.backoff_slots == 0 {
            self.dispatch(Input::Timeout, None);
        } else {
            self.backoff_slots -= 1;
            self.arm(TimerId::Backoff, self.config.slot());
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Polling
    // ═══════════════════════════════════════════════════════════════════════════

    fn end_window(&mut self) {
        if self.is_coordinator() {
            self.schedule_next();
        } else {
            self.hand_back_poll();
        }
    }

    /// Return the grant to the base.
    fn hand_back_poll(&mut self) {
        let Role::Client { base, propagation } = self.role else {
            return;
        };
        self.cancel(TimerId::Poll);

        let mut poll = Frame::new(
            FrameKind::Poll,
            self.phy.airtime(self.config.poll_size),
            base,
            self.id,
        )
        .with_propagation(propagation);
        poll.sent_at = self.now;
        let delay = self.poll_delay();
        debug!(station = %self.id, queue = self.queue.len(), "Handing POLL back");
        self.actions.push(Action::Transmit {
            to: base,
            frame: poll,
            delay,
        });
        self.set_state(StationState::Idle);
    }

    fn poll_delay(&mut self) -> Duration {
        let jitter = Duration::from_micros(self.rng.gen_range(self.config.tx_jitter_range()));
        self.config.poll_overhead() + self.config.ifs() + jitter
    }

    /// Advance the polling cycle; any earlier grant is revoked.
    fn next_slot(&mut self) -> Option<(Slot, Duration)> {
        match &mut self.role {
            Role::Coordinator(coordinator) => {
                coordinator.revoke();
                Some((coordinator.next_slot(), coordinator.period()))
            }
            Role::Client { .. } => None,
        }
    }

    /// Grant the next slot of the polling cycle.
    ///
    /// The base transmits in its own slot only if it has something to send;
    /// otherwise the slot is skipped.
    fn schedule_next(&mut self) {
        let Some((mut slot, period)) = self.next_slot() else {
            return;
        };

        if slot == Slot::Base {
            if self.transmit_pending() {
                self.arm(TimerId::Poll, period);
                return;
            }
            match self.next_slot() {
                Some((next, _)) => slot = next,
                None => return,
            }
        }

        match slot {
            Slot::Client(station) => {
                if let Role::Coordinator(coordinator) = &mut self.role {
                    coordinator.grant(station);
                }
                self.arm(TimerId::Poll, period * 2);
                self.send_poll(station, period);
            }
            Slot::Base => {
                // Empty roster: retry after one window.
                self.arm(TimerId::Poll, period);
            }
        }
        self.set_state(StationState::Idle);
    }

    fn send_poll(&mut self, station: StationId, window: Duration) {
        let mut poll = Frame::new(
            FrameKind::Poll,
            self.phy.airtime(self.config.poll_size),
            station,
            self.id,
        )
        .with_propagation(self.propagation_to(station));
        poll.poll_window = window;
        poll.sent_at = self.now;
        let delay = self.poll_delay();
        trace!(station = %self.id, to = %station, "Sending POLL");
        self.actions.push(Action::Transmit {
            to: station,
            frame: poll,
            delay,
        });
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Mode Switching
    // ═══════════════════════════════════════════════════════════════════════════

    /// Drop all timers, requeue the frame in flight and rebind to `mode`.
    fn switch_mode(&mut self, mode: NetworkMode) {
        if mode == self.mode {
            return;
        }
        for id in TimerId::ALL {
            self.cancel(id);
        }
        if let Some(frame) = self.current.take() {
            self.queue.push_front(frame);
        }
        self.retries = 0;
        self.backoff_slots = 0;
        self.last_rx = None;
        self.cw.reset();

        info!(
            station = %self.id,
            from = %self.mode,
            to = %mode,
            queue = self.queue.len(),
            "Switching network mode"
        );
        self.mode = mode;
        self.state = StationState::Idle;

        match mode {
            NetworkMode::Csma => {
                if !self.queue.is_empty() {
                    let slots = self.cw.draw(&mut self.rng);
                    self.start_backoff(slots);
                    self.set_state(StationState::PostSuccessBackoff);
                }
            }
            NetworkMode::Tdma => {
                if let Role::Coordinator(coordinator) = &mut self.role {
                    coordinator.restart_cycle();
                    self.schedule_next();
                }
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Helpers
    // ═══════════════════════════════════════════════════════════════════════════

    fn arm(&mut self, id: TimerId, duration: Duration) {
        let handle = self.timers.arm(id);
        self.actions.push(Action::SetTimer { handle, duration });
    }

    fn cancel(&mut self, id: TimerId) {
        if self.timers.cancel(id) {
            self.actions.push(Action::CancelTimer { id });
        }
    }

    fn set_state(&mut self, next: StationState) {
        if next != self.state {
            trace!(station = %self.id, from = %self.state, to = %next, "State transition");
            self.state = next;
        }
    }
}

impl StateMachine for Station {
    fn handle(&mut self, event: Event) -> Vec<Action> {
        match event {
            Event::FrameReceived { frame } => self.on_frame(frame),
            Event::TimerFired { handle } => self.on_timer(handle),
            Event::FrameQueued { frame } => self.on_frame_queued(frame),
            Event::SetMode { mode } => self.request_mode(mode),
        }
        std::mem::take(&mut self.actions)
    }

    fn set_time(&mut self, now: Duration) {
        self.now = now;
    }

    fn now(&self) -> Duration {
        self.now
    }
}

impl std::fmt::Debug for Station {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Station")
            .field("id", &self.id)
            .field("coordinator", &self.is_coordinator())
            .field("mode", &self.mode)
            .field("state", &self.state)
            .field("queue", &self.queue.len())
            .field("retries", &self.retries)
            .finish()
    }
}
