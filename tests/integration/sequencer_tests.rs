//! Sequencer walks over a populated node table, driven through the
//! session layer against simulated children.

use super::mock_bus::SimBus;

use ccs_parent::config::ProtocolConfig;
use ccs_parent::nodes::{ChildConfig, ChildId, NodeTable, OutputSelector, ResourceKind};
use ccs_parent::pnet::session::NodeSession;
use ccs_parent::sequencer::{Action, Sequencer};

fn id(n: u8) -> ChildId {
    ChildId::new(n).unwrap()
}

/// Run the handshake for each `Attention` the sequencer hands out, so
/// live/dead nodes steer the walk the way they do in the firmware.
fn walk(seq: &mut Sequencer, nodes: &mut NodeTable, bus: &mut SimBus, steps: usize) -> Vec<Action> {
    let protocol = ProtocolConfig::default();
    (0..steps)
        .map(|_| {
            let step = seq.step(nodes);
            if let Action::Attention(n) = step.action {
                let _ = NodeSession::new(bus, &protocol).attention(nodes, n);
            }
            step.action
        })
        .collect()
}

fn full_child() -> ChildConfig {
    ChildConfig {
        defined: true,
        relay1: ResourceKind::AirExchangerIn,
        relay2: ResourceKind::Heater,
        switched_power1: ResourceKind::InternalFan,
        switched_power2: ResourceKind::Humidifier,
        has_secondary_temperature: true,
        ..ChildConfig::default()
    }
}

#[test]
fn fully_loaded_child_visits_every_row() {
    let mut nodes = NodeTable::default();
    nodes.configure(id(4), full_child());
    let mut bus = SimBus::new();
    let mut seq = Sequencer::new();

    let actions = walk(&mut seq, &mut nodes, &mut bus, 10);

    assert_eq!(
        actions,
        [
            Action::ServiceParent,
            Action::Attention(id(4)),
            Action::AskHumidity(id(4)),
            Action::AskTemperature(id(4)),
            Action::AskSecondaryTemperature(id(4)),
            Action::Actuate { node: id(4), output: OutputSelector::Relay1, resource: ResourceKind::AirExchangerIn },
            Action::Actuate { node: id(4), output: OutputSelector::Relay2, resource: ResourceKind::Heater },
            Action::Actuate {
                node: id(4),
                output: OutputSelector::SwitchedPower1,
                resource: ResourceKind::InternalFan
            },
            Action::Actuate {
                node: id(4),
                output: OutputSelector::SwitchedPower2,
                resource: ResourceKind::Humidifier
            },
            Action::ServiceParent,
        ]
    );
}

#[test]
fn dead_child_gets_only_its_handshake() {
    let mut nodes = NodeTable::default();
    nodes.configure(id(1), full_child());
    nodes.configure(id(2), ChildConfig { defined: true, relay1: ResourceKind::Heater, ..ChildConfig::default() });
    let mut bus = SimBus::new();
    bus.child(1).online = false;
    let mut seq = Sequencer::new();

    let actions = walk(&mut seq, &mut nodes, &mut bus, 5);

    assert_eq!(
        actions,
        [
            Action::ServiceParent,
            Action::Attention(id(1)),
            Action::Attention(id(2)),
            Action::Actuate { node: id(2), output: OutputSelector::Relay1, resource: ResourceKind::Heater },
            Action::ServiceParent,
        ]
    );
}

#[test]
fn parent_served_once_per_pass() {
    let mut nodes = NodeTable::default();
    for n in [1, 3, 5, 8] {
        nodes.configure(id(n), full_child());
    }
    let mut bus = SimBus::new();
    let mut seq = Sequencer::new();

    // Each live full child is 8 actions; one pass is 1 + 4 * 8.
    let actions = walk(&mut seq, &mut nodes, &mut bus, 3 * 33);
    let parent_at: Vec<usize> = actions
        .iter()
        .enumerate()
        .filter_map(|(i, a)| (*a == Action::ServiceParent).then_some(i))
        .collect();
    assert_eq!(parent_at, [0, 33, 66]);
    assert_eq!(seq.passes(), 3);
}

#[test]
fn configuration_change_mid_visit_waits_for_next_pass() {
    let mut nodes = NodeTable::default();
    nodes.configure(id(1), ChildConfig { defined: true, relay1: ResourceKind::Heater, ..ChildConfig::default() });
    let mut bus = SimBus::new();
    let mut seq = Sequencer::new();

    walk(&mut seq, &mut nodes, &mut bus, 2);
    assert_eq!(seq.visit_plan().map(|(n, _)| n), Some(id(1)));

    // Operator reassigns relay 1 while the visit is in progress.
    nodes.configure(id(1), ChildConfig { defined: true, relay1: ResourceKind::Humidifier, ..ChildConfig::default() });
    let actions = walk(&mut seq, &mut nodes, &mut bus, 1 + 3);
    assert_eq!(
        actions,
        [
            Action::Actuate { node: id(1), output: OutputSelector::Relay1, resource: ResourceKind::Heater },
            Action::ServiceParent,
            Action::Attention(id(1)),
            Action::Actuate { node: id(1), output: OutputSelector::Relay1, resource: ResourceKind::Humidifier },
        ]
    );
}

#[test]
fn undefined_table_cycles_the_whole_row_set() {
    let nodes = NodeTable::default();
    let mut seq = Sequencer::new();
    for _ in 0..3 {
        let step = seq.step(&nodes);
        assert_eq!(step.index, 0);
        assert!(step.starts_pass);
    }
    assert_eq!(seq.cursor(), 1);
    assert_eq!(seq.passes(), 3);
}
