//! Integration tests for the ResourceManager → sequencer → PNet session
//! → simulated children pipeline.

use super::mock_bus::SimBus;
use super::mock_hw::{MockHardware, MockStateStore, RecordingSink};

use ccs_parent::app::commands::AppCommand;
use ccs_parent::app::events::AppEvent;
use ccs_parent::app::ports::StatePort;
use ccs_parent::app::service::{ResourceManager, StepReport};
use ccs_parent::climate::ClimateState;
use ccs_parent::config::SystemConfig;
use ccs_parent::error::SystemFault;
use ccs_parent::nodes::{ChildConfig, ChildId, OutputSelector, ParentRelay, ResourceKind};

fn id(n: u8) -> ChildId {
    ChildId::new(n).unwrap()
}

fn defined(relay1: ResourceKind) -> ChildConfig {
    ChildConfig {
        defined: true,
        relay1,
        ..ChildConfig::default()
    }
}

fn manager(children: &[(u8, ChildConfig)]) -> ResourceManager {
    manager_with(SystemConfig::default(), children)
}

fn manager_with(config: SystemConfig, children: &[(u8, ChildConfig)]) -> ResourceManager {
    let mut m = ResourceManager::new(config);
    let mut sink = RecordingSink::new();
    for &(n, cfg) in children {
        m.handle_command(AppCommand::ConfigureNode { node: id(n), config: cfg }, &mut sink)
            .unwrap();
    }
    m.start(&mut sink);
    m
}

fn run(
    m: &mut ResourceManager,
    bus: &mut SimBus,
    hw: &mut MockHardware,
    sink: &mut RecordingSink,
    ticks: usize,
) -> Vec<StepReport> {
    (0..ticks).filter_map(|_| m.tick(bus, hw, sink)).collect()
}

// ── Actuation ────────────────────────────────────────────────

#[test]
fn hot_interior_turns_child_air_conditioner_on() {
    let mut m = manager(&[(1, defined(ResourceKind::AirConditioner))]);
    let mut bus = SimBus::new();
    let mut hw = MockHardware::new(80.0, 50.0);
    let mut sink = RecordingSink::new();

    let reports = run(&mut m, &mut bus, &mut hw, &mut sink, 3);

    assert_eq!(bus.sent, ["AT1", "K1a+"]);
    assert_eq!(bus.replies[1], "kk1a+");
    assert_eq!(bus.sent_without_driver, 0);
    assert_eq!(reports[2].code(), 1);
    assert_eq!(m.interior_climate(), Some(ClimateState::VeryHot));
    assert!(m.child(id(1)).commanded_on(OutputSelector::Relay1));
    assert!(sink.contains(&AppEvent::Actuated {
        node: id(1),
        output: OutputSelector::Relay1,
        resource: ResourceKind::AirConditioner,
        on: true,
    }));

    // Parent's own relays: AC on, heater off.
    assert!(hw.relay_on(ParentRelay::Relay1));
    assert!(!hw.relay_on(ParentRelay::Relay2));
}

#[test]
fn comfortable_interior_turns_outputs_off() {
    let mut m = manager(&[(1, defined(ResourceKind::AirConditioner))]);
    let mut bus = SimBus::new();
    let mut hw = MockHardware::new(80.0, 45.0);
    let mut sink = RecordingSink::new();
    run(&mut m, &mut bus, &mut hw, &mut sink, 3);
    assert!(m.child(id(1)).commanded_on(OutputSelector::Relay1));

    hw.set_interior(70.0, 45.0);
    run(&mut m, &mut bus, &mut hw, &mut sink, 3);
    assert_eq!(bus.last_sent(), Some("K1a-"));
    assert!(!m.child(id(1)).commanded_on(OutputSelector::Relay1));
    assert!(!hw.relay_on(ParentRelay::Relay1));
}

#[test]
fn wrong_echo_keeps_previous_command() {
    let mut m = manager(&[(5, defined(ResourceKind::AirConditioner))]);
    let mut bus = SimBus::new();
    bus.child(5).wrong_polarity = true;
    let mut hw = MockHardware::new(80.0, 50.0);
    let mut sink = RecordingSink::new();

    let reports = run(&mut m, &mut bus, &mut hw, &mut sink, 3);

    assert_eq!(bus.replies[1], "kk5a-");
    assert_eq!(reports[2].code(), -8);
    assert!(!m.child(id(5)).commanded_on(OutputSelector::Relay1));
    assert_eq!(sink.count(|e| matches!(e, AppEvent::Actuated { .. })), 0);
}

#[test]
fn internal_fan_follows_local_humidity() {
    let fan = ChildConfig {
        defined: true,
        switched_power1: ResourceKind::InternalFan,
        ..ChildConfig::default()
    };
    let mut m = manager(&[(7, fan)]);
    let mut bus = SimBus::new();
    bus.child(7).rel_humidity = 60.0;
    let mut hw = MockHardware::new(70.0, 45.0);
    let mut sink = RecordingSink::new();

    run(&mut m, &mut bus, &mut hw, &mut sink, 4);

    assert_eq!(bus.sent, ["AT7", "H?7", "P7a+"]);
    assert_eq!(bus.replies.last().map(String::as_str), Some("pk7a+"));
    assert_eq!(m.child(id(7)).local_rel_humidity, Some(60.0));

    bus.child(7).rel_humidity = 50.0;
    run(&mut m, &mut bus, &mut hw, &mut sink, 4);
    assert_eq!(bus.last_sent(), Some("P7a-"));
}

#[test]
fn air_exchange_holds_conditioning_off() {
    let exchanger = ChildConfig {
        defined: true,
        relay1: ResourceKind::AirExchangerIn,
        is_exterior_reference: true,
        ..ChildConfig::default()
    };
    let mut m = manager(&[(1, defined(ResourceKind::AirConditioner)), (2, exchanger)]);
    let mut bus = SimBus::new();
    // Cooler outside, same humidity: exchanging air cools the interior.
    bus.child(2).temperature_f = 60.0;
    bus.child(2).rel_humidity = 50.0;
    let mut hw = MockHardware::new(80.0, 50.0);
    let mut sink = RecordingSink::new();

    // First pass: nothing known about the exterior when child 1 is served.
    run(&mut m, &mut bus, &mut hw, &mut sink, 7);
    assert_eq!(bus.sent, ["AT1", "K1a+", "AT2", "H?2", "T?2", "K2a+"]);
    assert!(m.exchange_active());
    assert_eq!(m.nodes().exterior_sample(), Some((60.0, 50.0)));

    // Second pass: the exchange flag holds AC off, parent and child alike.
    run(&mut m, &mut bus, &mut hw, &mut sink, 3);
    assert_eq!(bus.last_sent(), Some("K1a-"));
    assert!(!m.child(id(1)).commanded_on(OutputSelector::Relay1));
    assert!(!hw.relay_on(ParentRelay::Relay1));
}

// ── Faults ───────────────────────────────────────────────────

#[test]
fn silent_child_is_lost_after_four_misses_and_recovers() {
    let mut m = manager(&[(3, defined(ResourceKind::Heater))]);
    let mut bus = SimBus::new();
    bus.child(3).online = false;
    let mut hw = MockHardware::new(70.0, 45.0);
    let mut sink = RecordingSink::new();

    // Each pass is parent + one failed handshake.
    let reports = run(&mut m, &mut bus, &mut hw, &mut sink, 6);
    assert_eq!(reports[1].code(), -1);
    assert_eq!(m.child(id(3)).missed_attention_count, 3);
    assert!(!m.system_faults().contains(SystemFault::LostNode));

    run(&mut m, &mut bus, &mut hw, &mut sink, 2);
    assert!(m.system_faults().contains(SystemFault::LostNode));
    assert!(sink.contains(&AppEvent::NodeLost(id(3))));

    run(&mut m, &mut bus, &mut hw, &mut sink, 4);
    assert_eq!(sink.count(|e| *e == AppEvent::NodeLost(id(3))), 1);
    assert_eq!(m.child(id(3)).missed_attention_count, 4);

    bus.child(3).online = true;
    run(&mut m, &mut bus, &mut hw, &mut sink, 3);
    assert!(sink.contains(&AppEvent::NodeRecovered(id(3))));
    assert!(sink.contains(&AppEvent::FaultCleared(SystemFault::LostNode)));
    assert!(!m.system_faults().contains(SystemFault::LostNode));
    assert_eq!(bus.last_sent(), Some("K3a-"));
}

#[test]
fn acknowledge_resets_miss_counters() {
    let mut m = manager(&[(3, defined(ResourceKind::Heater))]);
    let mut bus = SimBus::new();
    bus.child(3).online = false;
    let mut hw = MockHardware::new(70.0, 45.0);
    let mut sink = RecordingSink::new();

    run(&mut m, &mut bus, &mut hw, &mut sink, 8);
    assert!(m.system_faults().contains(SystemFault::LostNode));

    m.handle_command(AppCommand::AcknowledgeFaults, &mut sink).unwrap();
    assert_eq!(m.child(id(3)).missed_attention_count, 0);
    assert!(m.system_faults().is_empty());
    assert!(sink.contains(&AppEvent::FaultCleared(SystemFault::LostNode)));
}

#[test]
fn flood_is_latched_until_acknowledged() {
    let flood = ChildConfig {
        defined: true,
        has_flood_sensor: true,
        ..ChildConfig::default()
    };
    let mut m = manager(&[(4, flood)]);
    let mut bus = SimBus::new();
    bus.child(4).liquid = true;
    let mut hw = MockHardware::new(70.0, 45.0);
    let mut sink = RecordingSink::new();

    run(&mut m, &mut bus, &mut hw, &mut sink, 2);
    assert!(m.child(id(4)).liquid_detected());
    assert!(m.system_faults().contains(SystemFault::FloodDetected));
    assert!(sink.contains(&AppEvent::FaultRaised(SystemFault::FloodDetected)));

    bus.child(4).liquid = false;
    run(&mut m, &mut bus, &mut hw, &mut sink, 4);
    assert!(!m.child(id(4)).liquid_detected());
    assert!(m.system_faults().contains(SystemFault::FloodDetected));

    m.handle_command(AppCommand::AcknowledgeFaults, &mut sink).unwrap();
    assert!(!m.system_faults().contains(SystemFault::FloodDetected));
}

#[test]
fn cold_secondary_sensor_raises_fault() {
    let secondary = ChildConfig {
        defined: true,
        has_secondary_temperature: true,
        ..ChildConfig::default()
    };
    let mut m = manager(&[(6, secondary)]);
    let mut bus = SimBus::new();
    bus.child(6).secondary_f = 40.0;
    let mut hw = MockHardware::new(70.0, 45.0);
    let mut sink = RecordingSink::new();

    run(&mut m, &mut bus, &mut hw, &mut sink, 3);
    assert_eq!(bus.sent, ["AT6", "S?6"]);
    assert_eq!(m.child(id(6)).secondary_temperature_f, Some(40.0));
    assert!(m.system_faults().contains(SystemFault::SecondaryTempLow));
}

#[test]
fn persistent_discomfort_raises_effectiveness_fault() {
    let config = SystemConfig {
        effectiveness_floor_ticks: 10,
        ..SystemConfig::default()
    };
    let mut m = manager_with(config, &[]);
    let mut bus = SimBus::new();
    let mut hw = MockHardware::new(80.0, 45.0);
    let mut sink = RecordingSink::new();

    run(&mut m, &mut bus, &mut hw, &mut sink, 10);
    assert!(!m.system_faults().contains(SystemFault::CannotControlTemperature));

    run(&mut m, &mut bus, &mut hw, &mut sink, 1);
    assert!(m.system_faults().contains(SystemFault::CannotControlTemperature));
    assert!(!m.system_faults().contains(SystemFault::CannotControlHumidity));

    // Midnight starts a new day below the floor.
    hw.midnight_pending = true;
    run(&mut m, &mut bus, &mut hw, &mut sink, 1);
    assert!(!m.system_faults().contains(SystemFault::CannotControlTemperature));
}

// ── Day boundary and suspension ──────────────────────────────

#[test]
fn midnight_reports_and_resets_counters() {
    let mut m = manager(&[]);
    let mut bus = SimBus::new();
    let mut hw = MockHardware::new(80.0, 45.0);
    let mut sink = RecordingSink::new();

    run(&mut m, &mut bus, &mut hw, &mut sink, 5);
    assert_eq!(m.counters().day_total, 5);
    assert_eq!(m.counters().too_hot, 5);

    hw.midnight_pending = true;
    run(&mut m, &mut bus, &mut hw, &mut sink, 1);

    let report = sink
        .events
        .iter()
        .find_map(|e| match e {
            AppEvent::DailyReport(r) => Some(*r),
            _ => None,
        })
        .unwrap();
    assert_eq!(report.day_total, 5);
    assert_eq!(report.hot_ratio, 1.0);
    assert_eq!(report.cold_ratio, 0.0);
    // The midnight tick itself counts toward the new day.
    assert_eq!(m.counters().day_total, 1);
    assert!(m.is_state_dirty());
}

#[test]
fn suspended_manager_leaves_the_bus_alone() {
    let mut m = manager(&[(1, defined(ResourceKind::AirConditioner))]);
    let mut bus = SimBus::new();
    let mut hw = MockHardware::new(80.0, 50.0);
    let mut sink = RecordingSink::new();

    m.handle_command(AppCommand::SetSuspended(true), &mut sink).unwrap();
    assert!(sink.contains(&AppEvent::Suspended(true)));

    hw.midnight_pending = true;
    let reports = run(&mut m, &mut bus, &mut hw, &mut sink, 5);
    assert!(reports.is_empty());
    assert!(bus.sent.is_empty());
    assert!(hw.relay_calls.is_empty());
    assert_eq!(m.counters().day_total, 0);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::DailyReport(_))), 1);

    m.handle_command(AppCommand::SetSuspended(false), &mut sink).unwrap();
    run(&mut m, &mut bus, &mut hw, &mut sink, 2);
    assert_eq!(bus.sent, ["AT1"]);
}

// ── Persistence ──────────────────────────────────────────────

#[test]
fn configuration_changes_auto_save_after_delay() {
    let mut m = manager(&[]);
    let store = MockStateStore::new();
    let mut bus = SimBus::new();
    let mut hw = MockHardware::new(70.0, 45.0);
    let mut sink = RecordingSink::new();

    m.handle_command(
        AppCommand::ConfigureNode { node: id(2), config: defined(ResourceKind::DeHumidifier) },
        &mut sink,
    )
    .unwrap();
    assert!(m.is_state_dirty());

    // 3 s per step; the delay is 5 s.
    run(&mut m, &mut bus, &mut hw, &mut sink, 1);
    assert!(!m.auto_save_if_needed(&store));
    run(&mut m, &mut bus, &mut hw, &mut sink, 1);
    assert!(m.auto_save_if_needed(&store));
    assert!(!m.is_state_dirty());

    let restored = ResourceManager::restore(store.load_state().unwrap());
    assert_eq!(restored.child(id(2)).config.relay1, ResourceKind::DeHumidifier);
}

#[test]
fn failed_save_raises_storage_fault_until_a_save_succeeds() {
    let mut m = manager(&[]);
    let store = MockStateStore::new();
    store.fail_writes.set(true);
    let mut bus = SimBus::new();
    let mut hw = MockHardware::new(70.0, 45.0);
    let mut sink = RecordingSink::new();

    m.handle_command(AppCommand::SaveState, &mut sink).unwrap();
    assert!(!m.auto_save_if_needed(&store));
    assert!(m.system_faults().contains(SystemFault::Storage));
    assert!(m.is_state_dirty());

    run(&mut m, &mut bus, &mut hw, &mut sink, 1);
    assert!(sink.contains(&AppEvent::FaultRaised(SystemFault::Storage)));

    store.fail_writes.set(false);
    m.handle_command(AppCommand::SaveState, &mut sink).unwrap();
    assert!(m.auto_save_if_needed(&store));
    assert!(!m.system_faults().contains(SystemFault::Storage));
    assert_eq!(store.saves.get(), 1);
}
