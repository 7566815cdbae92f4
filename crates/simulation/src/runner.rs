//! Simulation runner.

use crate::controller::{ModeController, NetworkCounters};
use crate::error::SimulationError;
use crate::event_queue::{Engine, EventKey};
use crate::trace::{TraceEntry, TraceKind};
use ptmp_core::{Action, ArrivalContext, Event, StateMachine, TimerHandle, TimerId, TrafficGenerator};
use ptmp_mac::{Station, StationState, StationStats};
use ptmp_types::{Frame, NetworkMode, PhyProfile, StationId};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Everything the engine can hold.
#[derive(Debug, Clone)]
pub enum SimEvent {
    /// A frame starts arriving at `to`.
    Deliver { to: StationId, frame: Frame },
    /// A station timer expires.
    Timer {
        station: StationId,
        handle: TimerHandle,
    },
    /// The station's traffic source is due.
    Traffic { station: StationId },
    /// An event a station queued for itself.
    Local { station: StationId, event: Event },
    /// Ask the base to switch the cell's mode.
    SetMode { mode: NetworkMode },
    /// Sample the mode controller.
    ControllerTick,
}

/// Statistics collected during simulation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SimulationStats {
    /// Total events processed.
    pub events_processed: u64,
    /// Frame copies put on the medium.
    pub frames_transmitted: u64,
    /// Frame copies that reached their receiver.
    pub frames_delivered: u64,
    /// Frames produced by traffic sources.
    pub traffic_arrivals: u64,
    /// Timers set.
    pub timers_set: u64,
    /// Timers cancelled while still pending.
    pub timers_cancelled: u64,
    /// Mode changes applied by the base.
    pub mode_switches: u64,
    /// Controller samples taken.
    pub controller_samples: u64,
}

/// Deterministic simulation runner.
///
/// Owns the engine and every station. Events are popped in time order and
/// handed to the target station; the returned actions are turned back into
/// events. Given the same seed and layout, two runs process the same events
/// in the same order.
pub struct SimulationRunner {
    engine: Engine<SimEvent>,

    /// All stations, indexed by `StationId`. The base is at index 0.
    stations: Vec<Station>,

    /// Traffic source per station, same indexing as `stations`.
    generators: Vec<Option<Box<dyn TrafficGenerator>>>,

    /// Timer registry for cancellation support.
    /// Maps (station, timer_id) -> event_key for removal.
    timers: HashMap<(StationId, TimerId), EventKey>,

    /// RNG for traffic sources (seeded for determinism).
    rng: ChaCha8Rng,

    phy: PhyProfile,
    base: StationId,
    controller: Option<Box<dyn ModeController>>,
    trace: Option<Vec<TraceEntry>>,
    stats: SimulationStats,
}

impl SimulationRunner {
    pub(crate) fn new(
        stations: Vec<Station>,
        generators: Vec<Option<Box<dyn TrafficGenerator>>>,
        phy: PhyProfile,
        seed: u64,
        controller: Option<Box<dyn ModeController>>,
        trace: bool,
    ) -> Self {
        let base = stations
            .iter()
            .find(|station| station.is_coordinator())
            .map(Station::id)
            .unwrap_or(StationId(0));

        let mut runner = Self {
            engine: Engine::new(),
            stations,
            generators,
            timers: HashMap::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            phy,
            base,
            controller,
            trace: trace.then(Vec::new),
            stats: SimulationStats::default(),
        };
        runner.start();
        runner
    }

    /// Open the first polling cycle, schedule first arrivals and the first
    /// controller sample.
    fn start(&mut self) {
        for index in 0..self.stations.len() {
            let id = self.stations[index].id();
            let actions = self.stations[index].start();
            self.process_actions(id, actions);
        }

        for (index, generator) in self.generators.iter_mut().enumerate() {
            let Some(generator) = generator else {
                continue;
            };
            let station = self.stations[index].id();
            let delay = generator.first_arrival(&mut self.rng);
            debug!(station = %station, source = generator.name(), first = ?delay, "Traffic source started");
            self.engine.schedule(delay, SimEvent::Traffic { station });
        }

        if let Some(controller) = &self.controller {
            let interval = controller.interval();
            if interval.is_zero() {
                warn!("Mode controller has a zero sampling interval; it will never be sampled");
            } else {
                self.engine.schedule(interval, SimEvent::ControllerTick);
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn now(&self) -> Duration {
        self.engine.now()
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    pub fn phy(&self) -> &PhyProfile {
        &self.phy
    }

    pub fn station(&self, id: StationId) -> Option<&Station> {
        self.stations.get(id.index())
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn base_id(&self) -> StationId {
        self.base
    }

    pub fn base_station(&self) -> &Station {
        &self.stations[self.base.index()]
    }

    /// Mode the base is in.
    pub fn mode(&self) -> NetworkMode {
        self.base_station().mode()
    }

    /// Name of the traffic source feeding `id`, if any.
    pub fn traffic_source(&self, id: StationId) -> Option<&'static str> {
        self.generators
            .get(id.index())
            .and_then(|generator| generator.as_ref())
            .map(|generator| generator.name())
    }

    /// Recorded events, when tracing was enabled at build time.
    pub fn trace(&self) -> Option<&[TraceEntry]> {
        self.trace.as_deref()
    }

    /// Number of events still pending.
    pub fn pending_events(&self) -> usize {
        self.engine.pending()
    }

    /// Counters summed over every station.
    pub fn totals(&self) -> StationStats {
        let mut total = StationStats::default();
        for station in &self.stations {
            total.merge(station.stats());
        }
        total
    }

    /// Read-only snapshot handed to mode controllers.
    pub fn counters(&self) -> NetworkCounters {
        let now = self.now();
        let total = self.totals();
        let base = self.base_station();
        let backlog = self
            .stations
            .iter()
            .map(|station| station.queue_len() + usize::from(station.in_flight().is_some()))
            .sum();

        NetworkCounters {
            now,
            mode: base.mode(),
            clients: base
                .coordinator_state()
                .map(|coordinator| coordinator.num_clients())
                .unwrap_or_default(),
            delivered: total.delivered,
            collisions: total.collisions,
            dropped: total.dropped,
            useful_airtime: total.useful_airtime,
            throughput_mbps: self.phy.data_rate_mbps(total.useful_airtime, now),
            mean_latency: if total.latency.is_empty() {
                Duration::ZERO
            } else {
                total.latency.mean()
            },
            backlog,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Control
    // ═══════════════════════════════════════════════════════════════════════════

    /// Switch the cell to `mode` now.
    ///
    /// The base announces the change to every client and switches itself.
    pub fn set_mode(&mut self, mode: NetworkMode) {
        let now = self.now();
        let id = self.base;
        let station = &mut self.stations[id.index()];
        if station.mode() != mode {
            info!(time = ?now, from = %station.mode(), to = %mode, "Switching network mode");
            self.stats.mode_switches += 1;
        }
        station.set_time(now);
        let actions = station.set_mode(mode);
        let state = station.state();
        self.record(id, TraceKind::ModeSwitch(mode), state);
        self.process_actions(id, actions);
    }

    /// Switch the cell to `mode` at absolute time `at`.
    pub fn schedule_mode_switch(&mut self, at: Duration, mode: NetworkMode) {
        self.engine.schedule_at(at, SimEvent::SetMode { mode });
    }

    /// Feed `event` to a station after `delay`.
    pub fn schedule_event(&mut self, station: StationId, delay: Duration, event: Event) {
        self.engine.schedule(delay, SimEvent::Local { station, event });
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Event Loop
    // ═══════════════════════════════════════════════════════════════════════════

    /// Run until `end_time`.
    ///
    /// Events at or after `end_time` stay pending, so runs can be chained.
    pub fn run_until(&mut self, end_time: Duration) -> Result<(), SimulationError> {
        trace!(end_time = ?end_time, "Running simulation step");

        while let Some((key, event)) = self.engine.next_before(end_time)? {
            self.stats.events_processed += 1;
            self.process_event(key, event);
        }

        trace!(
            events_processed = self.stats.events_processed,
            final_time = ?self.now(),
            "Simulation step complete"
        );
        Ok(())
    }

    fn process_event(&mut self, key: EventKey, event: SimEvent) {
        match event {
            SimEvent::Deliver { to, frame } => {
                self.stats.frames_delivered += 1;
                let kind = TraceKind::Deliver {
                    kind: frame.kind,
                    origin: frame.origin,
                    seq: frame.seq,
                };
                self.dispatch(to, Event::FrameReceived { frame }, kind);
            }
            SimEvent::Timer { station, handle } => {
                if self.timers.get(&(station, handle.id)) == Some(&key) {
                    self.timers.remove(&(station, handle.id));
                }
                self.dispatch(station, Event::TimerFired { handle }, TraceKind::Timer(handle.id));
            }
            SimEvent::Traffic { station } => self.on_traffic(station),
            SimEvent::Local { station, event } => {
                let kind = TraceKind::Local(event.type_name());
                self.dispatch(station, event, kind);
            }
            SimEvent::SetMode { mode } => self.set_mode(mode),
            SimEvent::ControllerTick => self.on_controller_tick(),
        }
    }

    fn dispatch(&mut self, id: StationId, event: Event, kind: TraceKind) {
        let now = self.now();
        let Some(station) = self.stations.get_mut(id.index()) else {
            warn!(station = %id, event = event.type_name(), "Event for unknown station");
            return;
        };

        trace!(time = ?now, station = %id, event = event.type_name(), "Processing event");
        station.set_time(now);
        let actions = station.handle(event);
        let state = station.state();

        self.record(id, kind, state);
        self.process_actions(id, actions);
    }

    fn on_traffic(&mut self, station: StationId) {
        let now = self.now();
        let Some(generator) = self
            .generators
            .get_mut(station.index())
            .and_then(|generator| generator.as_mut())
        else {
            return;
        };

        let ctx = ArrivalContext {
            station,
            now,
            phy: &self.phy,
        };
        let arrival = generator.next_arrival(&ctx, &mut self.rng);
        self.stats.traffic_arrivals += 1;

        match arrival.next {
            Some(next) => {
                self.engine.schedule(next, SimEvent::Traffic { station });
            }
            None => debug!(station = %station, "Traffic source finished"),
        }

        self.dispatch(
            station,
            Event::FrameQueued {
                frame: arrival.frame,
            },
            TraceKind::Traffic,
        );
    }

    fn on_controller_tick(&mut self) {
        let counters = self.counters();
        let Some(controller) = self.controller.as_mut() else {
            return;
        };
        let decision = controller.on_sample(&counters);
        let interval = controller.interval();
        self.stats.controller_samples += 1;

        if !interval.is_zero() {
            self.engine.schedule(interval, SimEvent::ControllerTick);
        }
        if let Some(mode) = decision {
            debug!(time = ?counters.now, mode = %mode, "Controller requested mode");
            self.set_mode(mode);
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Actions
    // ═══════════════════════════════════════════════════════════════════════════

    fn process_actions(&mut self, from: StationId, actions: Vec<Action>) {
        for action in actions {
            self.process_action(from, action);
        }
    }

    /// Process an action from a station.
    fn process_action(&mut self, from: StationId, action: Action) {
        match action {
            Action::Transmit { to, frame, delay } => {
                let latency = delay + frame.propagation;
                trace!(from = %from, to = %to, frame = %frame, ?latency, "Scheduling delivery");
                self.engine.schedule(latency, SimEvent::Deliver { to, frame });
                self.stats.frames_transmitted += 1;
            }

            Action::SetTimer { handle, duration } => {
                let key = self.engine.schedule(
                    duration,
                    SimEvent::Timer {
                        station: from,
                        handle,
                    },
                );
                if let Some(previous) = self.timers.insert((from, handle.id), key) {
                    self.engine.cancel(previous);
                }
                self.stats.timers_set += 1;
            }

            Action::CancelTimer { id } => {
                if let Some(key) = self.timers.remove(&(from, id)) {
                    if self.engine.cancel(key).is_some() {
                        self.stats.timers_cancelled += 1;
                    }
                }
            }

            Action::EnqueueInternal { event, delay } => {
                self.engine.schedule(
                    delay,
                    SimEvent::Local {
                        station: from,
                        event,
                    },
                );
            }
        }
    }

    fn record(&mut self, station: StationId, kind: TraceKind, state: StationState) {
        if let Some(trace) = &mut self.trace {
            trace.push(TraceEntry {
                time: self.engine.now(),
                station,
                kind,
                state,
            });
        }
    }
}

impl std::fmt::Debug for SimulationRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationRunner")
            .field("now", &self.now())
            .field("stations", &self.stations.len())
            .field("pending", &self.engine.pending())
            .field("stats", &self.stats)
            .finish()
    }
}
