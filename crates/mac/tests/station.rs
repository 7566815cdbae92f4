//! Station behaviour driven directly through the state machine interface.
//!
//! A tiny harness plays the runner: it records armed timers and emitted
//! frames, fires timers in time order and feeds frames in by hand.

use ptmp_core::{Action, Event, StateMachine, TimerHandle, TimerId};
use ptmp_mac::{MacConfig, Station, StationState};
use ptmp_types::{AppTag, Frame, FrameKind, NetworkMode, PhyProfile, StationId};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing_test::traced_test;

const BASE: StationId = StationId(0);
const CLIENT: StationId = StationId(1);

struct Harness {
    station: Station,
    phy: PhyProfile,
    now: Duration,
    timers: BTreeMap<TimerId, (TimerHandle, Duration)>,
    sent: Vec<(StationId, Frame, Duration)>,
    queued: Vec<Frame>,
}

impl Harness {
    fn new(station: Station) -> Self {
        Self {
            station,
            phy: PhyProfile::default(),
            now: Duration::ZERO,
            timers: BTreeMap::new(),
            sent: Vec::new(),
            queued: Vec::new(),
        }
    }

    fn client(config: MacConfig) -> Self {
        Self::new(Station::client(
            CLIENT,
            BASE,
            Duration::from_micros(10),
            config,
            PhyProfile::default(),
            42,
        ))
    }

    fn base(clients: u32, mode: NetworkMode) -> Self {
        let mut base =
            Station::coordinator(BASE, MacConfig::default(), PhyProfile::default(), 42).with_mode(mode);
        for id in 1..=clients {
            base.associate(StationId(id), Duration::from_micros(10));
        }
        Self::new(base)
    }

    fn apply(&mut self, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::SetTimer { handle, duration } => {
                    self.timers.insert(handle.id, (handle, self.now + duration));
                }
                Action::CancelTimer { id } => {
                    self.timers.remove(&id);
                }
                Action::Transmit { to, frame, delay } => self.sent.push((to, frame, delay)),
                Action::EnqueueInternal {
                    event: Event::FrameQueued { frame },
                    ..
                } => self.queued.push(frame),
                Action::EnqueueInternal { .. } => {}
            }
        }
    }

    fn handle(&mut self, event: Event) {
        self.station.set_time(self.now);
        let actions = self.station.handle(event);
        self.apply(actions);
    }

    fn start(&mut self) {
        let actions = self.station.start();
        self.apply(actions);
    }

    fn queue(&mut self, size: usize) {
        let frame = Frame::data(self.station.id(), size, self.phy.airtime(size), self.now);
        self.handle(Event::FrameQueued { frame });
    }

    fn receive(&mut self, frame: Frame) {
        self.handle(Event::FrameReceived { frame });
    }

    fn fire(&mut self, id: TimerId) {
        let (handle, at) = self.timers.remove(&id).expect("timer should be armed");
        self.now = self.now.max(at);
        self.handle(Event::TimerFired { handle });
    }

    /// Fire the earliest armed timer.
    fn fire_next(&mut self) -> TimerId {
        let id = self
            .timers
            .iter()
            .min_by_key(|(id, (_, at))| (*at, **id))
            .map(|(id, _)| *id)
            .expect("a timer should be armed");
        self.fire(id);
        id
    }

    fn take_sent(&mut self) -> Vec<(StationId, Frame, Duration)> {
        std::mem::take(&mut self.sent)
    }

    fn state(&self) -> StationState {
        self.station.state()
    }
}

fn data(from: StationId, to: StationId, seq: u64, sent_at: Duration) -> Frame {
    let phy = PhyProfile::default();
    let mut frame = Frame::data(from, 1500, phy.airtime(1500), sent_at);
    frame.dest = to;
    frame.seq = seq;
    frame
}

fn block_ack(from: StationId, to: StationId) -> Frame {
    Frame::new(
        FrameKind::BlockAck,
        PhyProfile::default().airtime(64),
        to,
        from,
    )
}

fn poll(from: StationId, to: StationId, window: Duration) -> Frame {
    let mut frame = Frame::new(FrameKind::Poll, PhyProfile::default().airtime(64), to, from);
    frame.poll_window = window;
    frame
}

// ═══════════════════════════════════════════════════════════════════════════
// Contention
// ═══════════════════════════════════════════════════════════════════════════

#[traced_test]
#[test]
fn test_retry_limit_then_drop_then_next_frame() {
    let mut h = Harness::client(MacConfig::default().with_max_retries(Some(3)));
    h.queue(1500);
    h.queue(1500);
    assert_eq!(h.state(), StationState::Wait);
    assert_eq!(h.station.queue_len(), 1);

    let mut failures = 0u32;
    for _ in 0..10_000 {
        if h.station.stats().frames_sent == 2 {
            break;
        }
        if h.fire_next() == TimerId::Ack {
            failures += 1;
            if failures <= 3 {
                assert_eq!(h.state(), StationState::PostErrorBackoff);
                assert_eq!(h.station.retries(), failures);
                assert_eq!(h.station.contention_window(), (15u32 << failures).min(1023));
            }
        }
    }

    let stats = h.station.stats();
    assert_eq!(failures, 4);
    assert_eq!(stats.retransmissions, 3);
    assert_eq!(stats.dropped, 1);
    assert_eq!(stats.transmissions, 5);
    assert_eq!(stats.delivered, 0);
    assert_eq!(h.station.in_flight().map(|f| f.seq), Some(1));
    assert_eq!(h.station.contention_window(), 15);
    assert_eq!(h.state(), StationState::Wait);
}

#[test]
fn test_success_resets_window_and_counts_useful_airtime() {
    let mut h = Harness::client(MacConfig::default());
    h.queue(1500);
    h.fire(TimerId::Ack);
    assert_eq!(h.station.contention_window(), 30);

    // Count down to the retransmission.
    while h.state() != StationState::Wait {
        h.fire_next();
    }
    assert_eq!(h.station.stats().retransmissions, 1);

    h.receive(block_ack(BASE, CLIENT));
    assert_eq!(h.state(), StationState::BlockAckWait);
    assert!(!h.station.timers().is_armed(TimerId::Ack));

    h.fire(TimerId::Frame);
    let stats = h.station.stats();
    assert_eq!(stats.delivered, 1);
    assert_eq!(stats.useful_airtime, Duration::from_micros(80));
    assert_eq!(h.station.contention_window(), 15);
    assert_eq!(h.state(), StationState::PostSuccessBackoff);
    assert_eq!(h.station.backoff_slots(), 15);
}

#[test]
fn test_superseded_ack_timer_is_ignored() {
    let mut h = Harness::client(MacConfig::default());
    h.queue(1500);
    let (ack, _) = h.timers[&TimerId::Ack];

    h.receive(block_ack(BASE, CLIENT));
    assert_eq!(h.state(), StationState::BlockAckWait);

    // The cancelled Ack timer fires anyway: nothing happens.
    h.station.set_time(Duration::from_millis(1));
    let actions = h.station.handle(Event::TimerFired { handle: ack });
    assert!(actions.is_empty());
    assert_eq!(h.state(), StationState::BlockAckWait);
    assert_eq!(h.station.stats().retransmissions, 0);
}

#[test]
fn test_addressed_data_is_acknowledged_once() {
    let mut h = Harness::client(MacConfig::default());
    h.now = Duration::from_micros(100);
    h.receive(data(BASE, CLIENT, 0, Duration::from_micros(50)));
    assert_eq!(h.state(), StationState::Receiving);

    h.fire(TimerId::Frame);
    assert_eq!(h.state(), StationState::ReceiveEnd);
    let sent = h.take_sent();
    assert_eq!(sent.len(), 1);
    let (to, ack, delay) = &sent[0];
    assert_eq!(*to, BASE);
    assert_eq!(ack.kind, FrameKind::BlockAck);
    assert_eq!(ack.dest, BASE);
    assert_eq!(*delay, Duration::from_micros(13));

    let stats = h.station.stats();
    assert_eq!(stats.received, 1);
    // Arrived at 100 us, 112 us of airtime, sent at 50 us.
    assert_eq!(stats.latency.max(), Duration::from_micros(162));

    h.fire(TimerId::Frame);
    assert_eq!(h.state(), StationState::Idle);

    // A retransmitted copy is acknowledged again but not delivered twice.
    h.receive(data(BASE, CLIENT, 0, Duration::from_micros(50)));
    h.fire(TimerId::Frame);
    assert_eq!(h.take_sent().len(), 1);
    let stats = h.station.stats();
    assert_eq!(stats.received, 1);
    assert_eq!(stats.duplicates, 1);
}

#[test]
fn test_ping_request_queues_response() {
    let mut h = Harness::client(MacConfig::default());
    let request = data(BASE, CLIENT, 0, Duration::ZERO).with_app(AppTag::PingRequest);
    h.receive(request);
    h.fire(TimerId::Frame);

    assert_eq!(h.queued.len(), 1);
    let response = h.queued.remove(0);
    assert_eq!(response.app, Some(AppTag::PingResponse));
    assert_eq!(response.dest, BASE);
    assert_eq!(response.origin, CLIENT);
    assert_eq!(response.sent_at, Duration::ZERO);

    // Fed back, the response is sent after the BlockAck and a backoff.
    h.handle(Event::FrameQueued { frame: response });
    h.take_sent();
    while h.state() != StationState::Wait {
        h.fire_next();
    }
    let sent = h.take_sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1.app, Some(AppTag::PingResponse));
    assert_eq!(sent[0].0, BASE);
}

#[test]
fn test_overlapping_reception_is_collision() {
    let mut h = Harness::client(MacConfig::default());
    h.receive(data(BASE, CLIENT, 0, Duration::ZERO));
    h.now = Duration::from_micros(10);
    h.receive(data(BASE, StationId(2), 1, Duration::ZERO));

    assert_eq!(h.state(), StationState::Collision);
    assert_eq!(h.station.stats().collisions, 1);

    h.fire(TimerId::Frame);
    assert_eq!(h.state(), StationState::Idle);
    assert!(h.take_sent().is_empty(), "corrupted frame must not be acknowledged");
    assert_eq!(h.station.stats().received, 0);
}

#[test]
fn test_backoff_freezes_while_deferring() {
    let mut h = Harness::client(MacConfig::default());
    h.queue(1500);
    h.fire(TimerId::Ack);
    assert_eq!(h.state(), StationState::PostErrorBackoff);
    let slots = h.station.backoff_slots();

    h.receive(data(BASE, StationId(2), 0, Duration::ZERO));
    assert_eq!(h.state(), StationState::NavDefer);
    assert!(!h.station.timers().is_armed(TimerId::Backoff));
    assert_eq!(h.station.backoff_slots(), slots);

    h.fire(TimerId::Frame);
    assert_eq!(h.state(), StationState::PostErrorBackoff);
    assert!(h.station.timers().is_armed(TimerId::Backoff));
    if slots > 0 {
        assert_eq!(h.station.backoff_slots(), slots);
    }
}

#[test]
fn test_base_fans_out_data_with_real_destination() {
    let mut h = Harness::base(3, NetworkMode::Csma);
    h.queue(1500);
    assert_eq!(h.state(), StationState::Wait);

    let sent = h.take_sent();
    assert_eq!(sent.len(), 3);
    let dest = sent[0].1.dest;
    assert_ne!(dest, BASE);

    let mut receivers: Vec<_> = sent.iter().map(|(to, _, _)| to.0).collect();
    receivers.sort();
    assert_eq!(receivers, vec![1, 2, 3]);
    for (_, frame, delay) in &sent {
        assert_eq!(frame.dest, dest);
        assert_eq!(frame.kind, FrameKind::Data);
        assert_eq!(frame.propagation, Duration::from_micros(10));
        assert_eq!(*delay, Duration::from_micros(34));
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Polling
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_client_drains_queue_then_hands_back() {
    let mut h = Harness::new(
        Station::client(
            CLIENT,
            BASE,
            Duration::from_micros(10),
            MacConfig::default(),
            PhyProfile::default(),
            7,
        )
        .with_mode(NetworkMode::Tdma),
    );
    h.queue(1500);
    h.queue(1500);
    assert_eq!(h.state(), StationState::Idle);
    assert!(h.take_sent().is_empty(), "no transmission without a grant");

    h.receive(poll(BASE, CLIENT, Duration::from_millis(5)));
    assert_eq!(h.state(), StationState::PollReceiving);
    h.fire(TimerId::Frame);

    for delivered in 1..=2 {
        assert_eq!(h.state(), StationState::Wait);
        h.receive(block_ack(BASE, CLIENT));
        assert_eq!(h.station.stats().delivered, delivered);
        h.fire(TimerId::Frame);
    }

    assert_eq!(h.state(), StationState::Idle);
    assert!(!h.station.timers().is_armed(TimerId::Poll));
    let sent = h.take_sent();
    let (to, frame, delay) = sent.last().expect("hand-back POLL");
    assert_eq!(*to, BASE);
    assert_eq!(frame.kind, FrameKind::Poll);
    assert!(*delay >= Duration::from_micros(58) && *delay <= Duration::from_micros(94));
}

#[test]
fn test_window_expiry_finishes_exchange_first() {
    let mut h = Harness::new(
        Station::client(
            CLIENT,
            BASE,
            Duration::from_micros(10),
            MacConfig::default(),
            PhyProfile::default(),
            7,
        )
        .with_mode(NetworkMode::Tdma),
    );
    h.queue(1500);
    h.queue(1500);
    h.receive(poll(BASE, CLIENT, Duration::from_micros(50)));
    h.fire(TimerId::Frame);
    assert_eq!(h.state(), StationState::Wait);

    assert_eq!(h.fire_next(), TimerId::Poll);
    assert_eq!(h.state(), StationState::PollWindowEnd);

    h.take_sent();
    h.receive(block_ack(BASE, CLIENT));
    assert_eq!(h.station.stats().delivered, 1);
    // The grant goes back only once the BlockAck has been fully received.
    assert_eq!(h.state(), StationState::PollWindowEnd);
    assert!(h.take_sent().is_empty());

    h.fire(TimerId::Frame);
    assert_eq!(h.state(), StationState::Idle);
    assert_eq!(h.station.stats().delivered, 1);
    assert_eq!(h.station.queue_len(), 1, "second frame waits for the next window");
    let sent = h.take_sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1.kind, FrameKind::Poll);
}

#[traced_test]
#[test]
fn test_polling_cycle_grants_each_station_once() {
    let mut h = Harness::base(3, NetworkMode::Tdma);
    h.queue(1500);
    assert!(h.take_sent().is_empty());

    // The cycle opens with the base's own slot.
    h.start();
    assert_eq!(h.state(), StationState::Wait);
    let sent = h.take_sent();
    assert_eq!(sent.len(), 3);
    let dest = sent[0].1.dest;

    h.receive(block_ack(dest, BASE));
    h.fire(TimerId::Frame);

    let mut polled = Vec::new();
    for _ in 0..4 {
        let sent = h.take_sent();
        assert_eq!(sent.len(), 1);
        let (to, frame, _) = &sent[0];
        assert_eq!(frame.kind, FrameKind::Poll);
        assert_eq!(frame.poll_window, Duration::from_millis(5));
        polled.push(to.0);

        // The client returns the grant.
        h.receive(poll(*to, BASE, Duration::ZERO));
        assert_eq!(h.state(), StationState::PollReceiving);
        h.fire(TimerId::Frame);
    }

    // Base slot skipped on the second cycle: nothing left to send.
    assert_eq!(polled, vec![1, 2, 3, 1]);
    assert_eq!(h.station.stats().frames_sent, 1);
    assert_eq!(h.station.stats().delivered, 1);
}

#[test]
fn test_base_reclaims_unanswered_grant() {
    let mut h = Harness::base(2, NetworkMode::Tdma);
    h.start();
    let sent = h.take_sent();
    assert_eq!(sent[0].0, StationId(1));

    assert_eq!(h.fire_next(), TimerId::Poll);
    assert_eq!(h.now, Duration::from_millis(10));
    let sent = h.take_sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, StationId(2));
}

#[test]
fn test_late_hand_back_does_not_end_current_grant() {
    let mut h = Harness::base(2, NetworkMode::Tdma);
    h.start();
    h.take_sent();

    // Client 1 never answered; the grant moved on to client 2.
    assert_eq!(h.fire_next(), TimerId::Poll);
    let sent = h.take_sent();
    assert_eq!(sent[0].0, StationId(2));
    let coordinator = h.station.coordinator_state().unwrap();
    assert_eq!(coordinator.grantee(), Some(StationId(2)));

    h.receive(poll(StationId(1), BASE, Duration::ZERO));
    assert_eq!(h.state(), StationState::Idle);
    assert!(h.station.timers().is_armed(TimerId::Poll));
    assert!(h.take_sent().is_empty());

    // The real grantee still hands back normally.
    h.receive(poll(StationId(2), BASE, Duration::ZERO));
    assert_eq!(h.state(), StationState::PollReceiving);
    assert!(!h.station.timers().is_armed(TimerId::Poll));
    h.fire(TimerId::Frame);
    let sent = h.take_sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, StationId(1));
    assert_eq!(sent[0].1.kind, FrameKind::Poll);
}

// ═══════════════════════════════════════════════════════════════════════════
// Mode switching
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_base_announces_mode_switch() {
    let mut h = Harness::base(3, NetworkMode::Csma);
    let actions = h.station.set_mode(NetworkMode::Tdma);
    h.apply(actions);
    assert_eq!(h.station.mode(), NetworkMode::Tdma);

    let sent = h.take_sent();
    let announcements: Vec<_> = sent
        .iter()
        .filter(|(_, frame, _)| frame.kind == FrameKind::Management(NetworkMode::Tdma))
        .collect();
    assert_eq!(announcements.len(), 3);
    for (to, frame, _) in &announcements {
        assert_eq!(frame.dest, *to);
    }
    // Polling starts right away.
    assert!(sent.iter().any(|(_, frame, _)| frame.kind == FrameKind::Poll));

    // Asking again is a no-op.
    assert!(h.station.set_mode(NetworkMode::Tdma).is_empty());
}

#[test]
fn test_client_switch_requeues_frame_in_flight() {
    let mut h = Harness::client(MacConfig::default());
    h.queue(1500);
    assert_eq!(h.state(), StationState::Wait);

    let mut announcement = Frame::new(
        FrameKind::Management(NetworkMode::Tdma),
        Duration::ZERO,
        CLIENT,
        BASE,
    );
    h.receive(announcement.clone());
    assert_eq!(h.station.mode(), NetworkMode::Tdma);
    assert_eq!(h.state(), StationState::Idle);
    assert!(h.station.in_flight().is_none());
    assert_eq!(h.station.queue_len(), 1);
    assert_eq!(h.station.timers().active().count(), 0);
    assert!(h.timers.is_empty());

    announcement.kind = FrameKind::Management(NetworkMode::Csma);
    h.receive(announcement);
    assert_eq!(h.station.mode(), NetworkMode::Csma);
    assert_eq!(h.state(), StationState::PostSuccessBackoff);
    while h.state() != StationState::Wait {
        h.fire_next();
    }
    assert_eq!(h.station.in_flight().map(|f| f.seq), Some(0));
}
