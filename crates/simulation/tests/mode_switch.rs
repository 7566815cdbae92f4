//! Network-wide mode changes and the polling cycle, driven through the runner.

mod common;

use common::cell;
use ptmp_simulation::{
    EngineError, ModeController, NetworkCounters, SimulationError, SimulationRunner, TraceKind,
};
use ptmp_types::{FrameKind, NetworkMode, StationId};
use std::time::Duration;
use tracing_test::traced_test;

fn modes(runner: &SimulationRunner) -> Vec<NetworkMode> {
    runner.stations().iter().map(|station| station.mode()).collect()
}

/// Clients that received a POLL from the base, in delivery order.
fn polled(runner: &SimulationRunner) -> Vec<StationId> {
    let base = runner.base_id();
    runner
        .trace()
        .unwrap()
        .iter()
        .filter(|entry| {
            matches!(
                entry.kind,
                TraceKind::Deliver { kind: FrameKind::Poll, origin, .. } if origin == base
            )
        })
        .map(|entry| entry.station)
        .collect()
}

#[traced_test]
#[test]
fn test_management_switch_reaches_every_station() {
    let mut runner = cell(3, NetworkMode::Csma, 42, Some(Duration::from_millis(1)));
    runner.schedule_mode_switch(Duration::from_millis(5), NetworkMode::Tdma);
    runner.schedule_mode_switch(Duration::from_millis(15), NetworkMode::Csma);

    runner.run_until(Duration::from_millis(5)).unwrap();
    assert!(modes(&runner).iter().all(|mode| *mode == NetworkMode::Csma));

    // Announcements take an IFS plus at most 10 us of propagation.
    runner.run_until(Duration::from_millis(6)).unwrap();
    assert!(modes(&runner).iter().all(|mode| *mode == NetworkMode::Tdma));
    let delivered_in_csma = runner.totals().delivered;

    runner.run_until(Duration::from_millis(14)).unwrap();
    assert!(!polled(&runner).is_empty());
    assert!(runner.totals().delivered > delivered_in_csma);

    runner.run_until(Duration::from_millis(20)).unwrap();
    assert!(modes(&runner).iter().all(|mode| *mode == NetworkMode::Csma));
    assert_eq!(runner.stats().mode_switches, 2);

    // Every client saw both announcements.
    for client in 1..=3 {
        let announcements: Vec<FrameKind> = runner
            .trace()
            .unwrap()
            .iter()
            .filter(|entry| entry.station == StationId(client))
            .filter_map(|entry| match entry.kind {
                TraceKind::Deliver {
                    kind: kind @ FrameKind::Management(_),
                    ..
                } => Some(kind),
                _ => None,
            })
            .collect();
        assert_eq!(
            announcements,
            vec![
                FrameKind::Management(NetworkMode::Tdma),
                FrameKind::Management(NetworkMode::Csma)
            ]
        );
    }
}

#[traced_test]
#[test]
fn test_polling_cycle_grants_each_client_once() {
    let mut runner = cell(3, NetworkMode::Tdma, 42, None);
    runner.run_until(Duration::from_millis(3)).unwrap();

    let polled = polled(&runner);
    assert!(polled.len() >= 6, "only {} polls", polled.len());
    let expected: Vec<StationId> = [1, 2, 3, 1, 2, 3].into_iter().map(StationId).collect();
    assert_eq!(&polled[..6], expected.as_slice());
}

#[traced_test]
#[test]
fn test_requesting_current_mode_is_a_noop() {
    let mut runner = cell(2, NetworkMode::Csma, 42, Some(Duration::from_millis(1)));
    runner.run_until(Duration::from_millis(2)).unwrap();
    let transmitted = runner.stats().frames_transmitted;

    runner.set_mode(NetworkMode::Csma);

    assert_eq!(runner.stats().mode_switches, 0);
    assert_eq!(runner.stats().frames_transmitted, transmitted);
}

#[traced_test]
#[test]
fn test_idle_cell_runs_out_of_events() {
    let mut runner = cell(2, NetworkMode::Csma, 42, None);
    let err = runner.run_until(Duration::from_millis(1)).unwrap_err();
    assert_eq!(
        err,
        SimulationError::Engine(EngineError::NoMoreEvents {
            now: Duration::ZERO
        })
    );
}

/// Switches to TDMA as soon as anything has been delivered.
struct SwitchWhenBusy;

impl ModeController for SwitchWhenBusy {
    fn interval(&self) -> Duration {
        Duration::from_millis(1)
    }

    fn on_sample(&mut self, counters: &NetworkCounters) -> Option<NetworkMode> {
        (counters.delivered > 0).then_some(NetworkMode::Tdma)
    }
}

#[traced_test]
#[test]
fn test_controller_drives_mode_switch() {
    use common::Periodic;
    use ptmp_simulation::{NetworkBuilder, NetworkConfig};

    let mut builder = NetworkBuilder::new(NetworkConfig::default().with_seed(3));
    builder.set_base(None);
    builder.add_client(1_500.0, Periodic::boxed(Duration::from_micros(500), 1500));
    builder.add_client(3_000.0, Periodic::boxed(Duration::from_micros(500), 1500));
    builder.set_controller(Box::new(SwitchWhenBusy));
    let mut runner = builder.build().unwrap();

    runner.run_until(Duration::from_micros(4_500)).unwrap();

    assert_eq!(runner.stats().controller_samples, 4);
    assert_eq!(runner.stats().mode_switches, 1);
    assert_eq!(runner.mode(), NetworkMode::Tdma);
    assert!(modes(&runner).iter().all(|mode| *mode == NetworkMode::Tdma));

    let counters = runner.counters();
    assert_eq!(counters.clients, 2);
    assert!(counters.throughput_mbps > 0.0);
}
