//! Node table: the parent, its eight children and the exterior reading.
//!
//! The table is an owned arena.  Children are addressed by [`ChildId`]
//! (1..=8, the digit used on the wire); the parent has no bus address and
//! is only named through [`NodeId::Parent`] in reports.

use serde::{Deserialize, Serialize};

/// Number of child slots on the bus.
pub const NUM_CHILDREN: usize = 8;

// ── Identifiers ───────────────────────────────────────────────

/// Bus address of a child node, 1..=8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChildId(u8);

impl ChildId {
    pub const fn new(n: u8) -> Option<Self> {
        if n >= 1 && n as usize <= NUM_CHILDREN {
            Some(Self(n))
        } else {
            None
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    /// ASCII digit carried in requests and responses.
    pub const fn wire_char(self) -> u8 {
        b'0' + self.0
    }

    /// Zero-based slot index into the child array.
    pub const fn index(self) -> usize {
        self.0 as usize - 1
    }

    /// All child ids in index order.
    pub fn all() -> impl Iterator<Item = Self> {
        (1..=NUM_CHILDREN as u8).map(Self)
    }
}

impl core::fmt::Display for ChildId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Any node in the table.  Index 0 is the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeId {
    Parent,
    Child(ChildId),
}

impl NodeId {
    pub const fn index(self) -> u8 {
        match self {
            Self::Parent => 0,
            Self::Child(id) => id.get(),
        }
    }
}

// ── Resources and outputs ─────────────────────────────────────

/// What an output is wired to.  Declaration order is the cyclic order
/// used when an operator steps through choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum ResourceKind {
    #[default]
    Free = 0,
    AirConditioner = 1,
    Heater = 2,
    DeHumidifier = 3,
    AirExchangerIn = 4,
    AirExchangerOut = 5,
    Humidifier = 6,
    InternalFan = 7,
}

impl ResourceKind {
    pub const ALL: [Self; 8] = [
        Self::Free,
        Self::AirConditioner,
        Self::Heater,
        Self::DeHumidifier,
        Self::AirExchangerIn,
        Self::AirExchangerOut,
        Self::Humidifier,
        Self::InternalFan,
    ];

    pub const fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Free),
            1 => Some(Self::AirConditioner),
            2 => Some(Self::Heater),
            3 => Some(Self::DeHumidifier),
            4 => Some(Self::AirExchangerIn),
            5 => Some(Self::AirExchangerOut),
            6 => Some(Self::Humidifier),
            7 => Some(Self::InternalFan),
            _ => None,
        }
    }

    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Next choice, wrapping from the last back to `Free`.
    pub const fn next(self) -> Self {
        Self::ALL[(self as usize + 1) % Self::ALL.len()]
    }

    /// Previous choice, wrapping from `Free` to the last.
    pub const fn previous(self) -> Self {
        Self::ALL[(self as usize + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    /// Short label for the configuration screen.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::AirConditioner => "AirCond",
            Self::Heater => "Heater",
            Self::DeHumidifier => "Dehumid",
            Self::AirExchangerIn => "AirExchIn",
            Self::AirExchangerOut => "AirExchOut",
            Self::Humidifier => "Humidif",
            Self::InternalFan => "IntFan",
        }
    }

    pub const fn is_air_exchanger(self) -> bool {
        matches!(self, Self::AirExchangerIn | Self::AirExchangerOut)
    }
}

/// Which side of a relay or switched-power pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Channel {
    A,
    B,
}

impl Channel {
    pub const fn wire_char(self) -> u8 {
        match self {
            Self::A => b'a',
            Self::B => b'b',
        }
    }

    pub const fn from_wire(c: u8) -> Option<Self> {
        match c {
            b'a' => Some(Self::A),
            b'b' => Some(Self::B),
            _ => None,
        }
    }
}

/// One of the four outputs on a child, in visiting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputSelector {
    Relay1,
    Relay2,
    SwitchedPower1,
    SwitchedPower2,
}

impl OutputSelector {
    pub const ALL: [Self; 4] = [
        Self::Relay1,
        Self::Relay2,
        Self::SwitchedPower1,
        Self::SwitchedPower2,
    ];

    pub const fn is_relay(self) -> bool {
        matches!(self, Self::Relay1 | Self::Relay2)
    }

    pub const fn channel(self) -> Channel {
        match self {
            Self::Relay1 | Self::SwitchedPower1 => Channel::A,
            Self::Relay2 | Self::SwitchedPower2 => Channel::B,
        }
    }

    /// Bit in the child's status byte that reports this output as on.
    pub const fn status_mask(self) -> u8 {
        match self {
            Self::Relay1 => status::RELAY1_ON,
            Self::Relay2 => status::RELAY2_ON,
            Self::SwitchedPower1 => status::SWITCHED_POWER1_ON,
            Self::SwitchedPower2 => status::SWITCHED_POWER2_ON,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Relay1 => "relay1",
            Self::Relay2 => "relay2",
            Self::SwitchedPower1 => "swpwr1",
            Self::SwitchedPower2 => "swpwr2",
        }
    }
}

/// Bits of the low status byte a child reports in its handshake.
pub mod status {
    pub const LIQUID_DETECTED: u8 = 0x80;
    pub const TEMP1_OK: u8 = 0x40;
    pub const TEMP2_OK: u8 = 0x20;
    pub const RHUMID_OK: u8 = 0x10;
    pub const RELAY1_ON: u8 = 0x08;
    pub const RELAY2_ON: u8 = 0x04;
    pub const SWITCHED_POWER1_ON: u8 = 0x02;
    pub const SWITCHED_POWER2_ON: u8 = 0x01;
}

// ── Child configuration ───────────────────────────────────────

/// Operator-configured part of a child slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChildConfig {
    pub defined: bool,
    pub relay1: ResourceKind,
    pub relay2: ResourceKind,
    pub switched_power1: ResourceKind,
    pub switched_power2: ResourceKind,
    pub has_flood_sensor: bool,
    pub has_secondary_temperature: bool,
    pub is_exterior_reference: bool,
}

impl ChildConfig {
    pub const fn output(&self, selector: OutputSelector) -> ResourceKind {
        match selector {
            OutputSelector::Relay1 => self.relay1,
            OutputSelector::Relay2 => self.relay2,
            OutputSelector::SwitchedPower1 => self.switched_power1,
            OutputSelector::SwitchedPower2 => self.switched_power2,
        }
    }

    pub fn set_output(&mut self, selector: OutputSelector, kind: ResourceKind) {
        match selector {
            OutputSelector::Relay1 => self.relay1 = kind,
            OutputSelector::Relay2 => self.relay2 = kind,
            OutputSelector::SwitchedPower1 => self.switched_power1 = kind,
            OutputSelector::SwitchedPower2 => self.switched_power2 = kind,
        }
    }

    fn any_output(&self, pred: impl Fn(ResourceKind) -> bool) -> bool {
        OutputSelector::ALL.iter().any(|&s| pred(self.output(s)))
    }

    pub fn has_internal_fan(&self) -> bool {
        self.any_output(|k| k == ResourceKind::InternalFan)
    }

    pub fn has_air_exchanger(&self) -> bool {
        self.any_output(ResourceKind::is_air_exchanger)
    }

    /// Humidity is needed for fan decisions, for exchanger nodes and for
    /// the exterior reading.
    pub fn needs_humidity(&self) -> bool {
        self.has_internal_fan() || self.has_air_exchanger() || self.is_exterior_reference
    }

    pub fn needs_temperature(&self) -> bool {
        self.has_air_exchanger() || self.is_exterior_reference
    }
}

// ── Runtime node state ────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChildNode {
    pub config: ChildConfig,
    /// Last handshake succeeded.
    pub active: bool,
    /// Consecutive failed handshakes, saturating at the MIA limit.
    pub missed_attention_count: u8,
    /// Low status byte from the last successful handshake.
    pub status: u8,
    /// Outputs last confirmed by a command echo, in status-bit layout.
    pub commanded_outputs: u8,
    pub local_temperature_f: Option<f32>,
    pub local_rel_humidity: Option<f32>,
    /// Exponentially filtered; seeded by the first valid reading.
    pub secondary_temperature_f: Option<f32>,
}

impl ChildNode {
    pub fn liquid_detected(&self) -> bool {
        self.status & status::LIQUID_DETECTED != 0
    }

    /// Whether the child last reported this output as on.
    pub fn reports_output_on(&self, selector: OutputSelector) -> bool {
        self.status & selector.status_mask() != 0
    }

    pub fn commanded_on(&self, selector: OutputSelector) -> bool {
        self.commanded_outputs & selector.status_mask() != 0
    }

    pub fn record_commanded(&mut self, selector: OutputSelector, on: bool) {
        if on {
            self.commanded_outputs |= selector.status_mask();
        } else {
            self.commanded_outputs &= !selector.status_mask();
        }
    }

    /// Count a failed handshake; returns the new count.
    pub fn record_miss(&mut self, mia_max: u8) -> u8 {
        self.missed_attention_count = self.missed_attention_count.saturating_add(1).min(mia_max);
        self.missed_attention_count
    }

    pub fn is_lost(&self, mia_max: u8) -> bool {
        self.missed_attention_count >= mia_max
    }
}

/// Which of the parent's own relays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParentRelay {
    Relay1,
    Relay2,
}

impl ParentRelay {
    pub const ALL: [Self; 2] = [Self::Relay1, Self::Relay2];

    /// The equivalent child output, for the decision engine.
    pub const fn as_output(self) -> OutputSelector {
        match self {
            Self::Relay1 => OutputSelector::Relay1,
            Self::Relay2 => OutputSelector::Relay2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentNode {
    pub relay1: ResourceKind,
    pub relay2: ResourceKind,
}

impl Default for ParentNode {
    fn default() -> Self {
        Self {
            relay1: ResourceKind::AirConditioner,
            relay2: ResourceKind::Heater,
        }
    }
}

impl ParentNode {
    pub const fn relay(&self, relay: ParentRelay) -> ResourceKind {
        match relay {
            ParentRelay::Relay1 => self.relay1,
            ParentRelay::Relay2 => self.relay2,
        }
    }

    pub fn assign(&mut self, relay: ParentRelay, kind: ResourceKind) {
        match relay {
            ParentRelay::Relay1 => self.relay1 = kind,
            ParentRelay::Relay2 => self.relay2 = kind,
        }
    }
}

/// Last readings from the exterior-reference node.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExteriorReading {
    pub temperature_f: Option<f32>,
    pub rel_humidity: Option<f32>,
}

impl ExteriorReading {
    /// Both halves, or nothing.
    pub fn sample(&self) -> Option<(f32, f32)> {
        Some((self.temperature_f?, self.rel_humidity?))
    }
}

// ── Table ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct NodeTable {
    pub parent: ParentNode,
    children: [ChildNode; NUM_CHILDREN],
    pub exterior: ExteriorReading,
}

impl NodeTable {
    pub fn with_configs(parent: ParentNode, configs: &[ChildConfig; NUM_CHILDREN]) -> Self {
        let mut table = Self {
            parent,
            ..Self::default()
        };
        for (child, config) in table.children.iter_mut().zip(configs) {
            child.config = *config;
        }
        table
    }

    pub fn child(&self, id: ChildId) -> &ChildNode {
        &self.children[id.index()]
    }

    pub fn child_mut(&mut self, id: ChildId) -> &mut ChildNode {
        &mut self.children[id.index()]
    }

    pub fn children(&self) -> impl Iterator<Item = (ChildId, &ChildNode)> {
        ChildId::all().zip(self.children.iter())
    }

    pub fn configs(&self) -> [ChildConfig; NUM_CHILDREN] {
        self.children.map(|c| c.config)
    }

    /// Replace a slot's configuration.  Undefining a node also forgets its
    /// runtime state so it does not count against liveness.
    pub fn configure(&mut self, id: ChildId, config: ChildConfig) {
        let child = self.child_mut(id);
        let was_reference = child.config.is_exterior_reference;
        if config.defined {
            child.config = config;
        } else {
            *child = ChildNode {
                config,
                ..ChildNode::default()
            };
        }
        if was_reference && !config.is_exterior_reference {
            self.exterior = ExteriorReading::default();
        }
    }

    /// Lowest-numbered active child flagged as the exterior reference.
    pub fn exterior_reference(&self) -> Option<ChildId> {
        self.children()
            .find(|(_, c)| c.active && c.config.defined && c.config.is_exterior_reference)
            .map(|(id, _)| id)
    }

    /// Exterior sample, only while a reference node is alive.
    pub fn exterior_sample(&self) -> Option<(f32, f32)> {
        self.exterior_reference()?;
        self.exterior.sample()
    }

    pub fn any_lost(&self, mia_max: u8) -> bool {
        self.children
            .iter()
            .any(|c| c.config.defined && c.is_lost(mia_max))
    }

    pub fn reset_miss_counters(&mut self) {
        for child in &mut self.children {
            child.missed_attention_count = 0;
        }
    }
}
