//! PNet node session against simulated child firmware.

use super::mock_bus::SimBus;

use ccs_parent::config::ProtocolConfig;
use ccs_parent::error::PnetError;
use ccs_parent::nodes::{Channel, ChildConfig, ChildId, NodeTable, OutputSelector, status};
use ccs_parent::pnet::session::NodeSession;

fn id(n: u8) -> ChildId {
    ChildId::new(n).unwrap()
}

fn protocol() -> ProtocolConfig {
    ProtocolConfig::default()
}

#[test]
fn handshake_records_live_status() {
    let mut bus = SimBus::new();
    bus.child(2).outputs = status::RELAY2_ON;
    let mut nodes = NodeTable::default();

    NodeSession::new(&mut bus, &protocol()).attention(&mut nodes, id(2)).unwrap();

    assert_eq!(bus.sent, ["AT2"]);
    assert_eq!(bus.replies, ["ak2A54"]);
    assert_eq!(bus.sent_without_driver, 0);
    assert!(!bus.transmitting);
    let child = nodes.child(id(2));
    assert!(child.active);
    assert!(child.reports_output_on(OutputSelector::Relay2));
    assert!(!child.liquid_detected());
}

#[test]
fn handshake_version_mismatch_marks_inactive() {
    let mut bus = SimBus::new();
    bus.child(1).version = 'B';
    let mut nodes = NodeTable::default();
    nodes.child_mut(id(1)).active = true;

    let r = NodeSession::new(&mut bus, &protocol()).attention(&mut nodes, id(1));

    assert_eq!(r, Err(PnetError::WrongVersion));
    assert!(!nodes.child(id(1)).active);
}

#[test]
fn reply_from_wrong_node_is_rejected() {
    let mut bus = SimBus::new();
    bus.child(3).next_reply = Some("ak4A50".into());
    let mut nodes = NodeTable::default();

    let r = NodeSession::new(&mut bus, &protocol()).attention(&mut nodes, id(3));
    assert_eq!(r, Err(PnetError::WrongNode));
}

#[test]
fn exterior_reference_readings_feed_exterior_sample() {
    let mut bus = SimBus::new();
    bus.child(5).temperature_f = 58.5;
    bus.child(5).rel_humidity = 71.0;
    let mut nodes = NodeTable::default();
    nodes.configure(
        id(5),
        ChildConfig {
            defined: true,
            is_exterior_reference: true,
            ..ChildConfig::default()
        },
    );

    let mut s = NodeSession::new(&mut bus, &protocol());
    s.attention(&mut nodes, id(5)).unwrap();
    assert_eq!(s.ask_humidity(&mut nodes, id(5)), Ok(71.0));
    assert_eq!(nodes.exterior_sample(), None);
    assert_eq!(s.ask_temperature(&mut nodes, id(5)), Ok(58.5));

    assert_eq!(nodes.exterior_sample(), Some((58.5, 71.0)));
    assert_eq!(nodes.child(id(5)).local_temperature_f, Some(58.5));
}

#[test]
fn ordinary_child_readings_stay_local() {
    let mut bus = SimBus::new();
    let mut nodes = NodeTable::default();

    NodeSession::new(&mut bus, &protocol())
        .ask_humidity(&mut nodes, id(6))
        .unwrap();

    assert_eq!(nodes.child(id(6)).local_rel_humidity, Some(45.0));
    assert_eq!(nodes.exterior.rel_humidity, None);
}

#[test]
fn implausible_reading_keeps_previous_value() {
    let mut bus = SimBus::new();
    let mut nodes = NodeTable::default();
    let mut s = NodeSession::new(&mut bus, &protocol());
    s.ask_temperature(&mut nodes, id(1)).unwrap();
    drop(s);

    bus.child(1).temperature_f = 150.0;
    let r = NodeSession::new(&mut bus, &protocol()).ask_temperature(&mut nodes, id(1));

    assert_eq!(r, Err(PnetError::OutOfRange));
    assert_eq!(nodes.child(id(1)).local_temperature_f, Some(72.0));
}

#[test]
fn secondary_filter_seeds_then_smooths() {
    let mut bus = SimBus::new();
    bus.child(2).secondary_f = 60.0;
    let mut nodes = NodeTable::default();

    let first = NodeSession::new(&mut bus, &protocol())
        .ask_secondary_temperature(&mut nodes, id(2), 0.5)
        .unwrap();
    assert_eq!(first, 60.0);

    bus.child(2).secondary_f = 40.0;
    let second = NodeSession::new(&mut bus, &protocol())
        .ask_secondary_temperature(&mut nodes, id(2), 0.5)
        .unwrap();
    assert_eq!(second, 50.0);
    assert_eq!(nodes.child(id(2)).secondary_temperature_f, Some(50.0));
}

#[test]
fn commands_are_applied_and_echoed() {
    let mut bus = SimBus::new();
    let mut nodes = NodeTable::default();
    let mut s = NodeSession::new(&mut bus, &protocol());

    s.command_relay(&mut nodes, id(8), Channel::B, true).unwrap();
    s.command_switched_power(&mut nodes, id(8), Channel::A, true).unwrap();
    s.command_output(&mut nodes, id(8), OutputSelector::Relay2, false).unwrap();

    assert_eq!(bus.sent, ["K8b+", "P8a+", "K8b-"]);
    assert_eq!(bus.replies, ["kk8b+", "pk8a+", "kk8b-"]);
    assert_eq!(bus.child(8).outputs, status::SWITCHED_POWER1_ON);
    let child = nodes.child(id(8));
    assert!(child.commanded_on(OutputSelector::SwitchedPower1));
    assert!(!child.commanded_on(OutputSelector::Relay2));
}

#[test]
fn echo_mismatch_leaves_command_unrecorded() {
    let mut bus = SimBus::new();
    bus.child(3).wrong_polarity = true;
    let mut nodes = NodeTable::default();

    let r = NodeSession::new(&mut bus, &protocol()).command_switched_power(&mut nodes, id(3), Channel::B, true);

    assert_eq!(r, Err(PnetError::EchoMismatch));
    assert!(!nodes.child(id(3)).commanded_on(OutputSelector::SwitchedPower2));
}

#[test]
fn silent_child_times_out() {
    let mut bus = SimBus::new();
    bus.child(7).online = false;
    let mut nodes = NodeTable::default();

    let r = NodeSession::new(&mut bus, &protocol()).ask_humidity(&mut nodes, id(7));

    assert_eq!(r, Err(PnetError::NoResponse));
    assert_eq!(r.unwrap_err().code(), -1);
    assert_eq!(nodes.child(id(7)).local_rel_humidity, None);
}
