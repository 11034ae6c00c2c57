//! Outbound application events.
//!
//! The [`ResourceManager`](super::service::ResourceManager) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on
//! the other side decide what to do with them.

use serde::Serialize;

use crate::error::SystemFault;
use crate::nodes::{ChildId, OutputSelector, ParentRelay, ResourceKind};
use crate::tracker::EffectivenessReport;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppEvent {
    /// The manager has started (carries the number of defined children).
    Started { defined_children: u8 },

    /// A child reached the miss limit.
    NodeLost(ChildId),

    /// A previously lost child answered a handshake.
    NodeRecovered(ChildId),

    /// A child output was commanded and the echo confirmed it.
    Actuated {
        node: ChildId,
        output: OutputSelector,
        resource: ResourceKind,
        on: bool,
    },

    /// One of the parent's own relays was set.
    ParentRelaySet {
        relay: ParentRelay,
        resource: ResourceKind,
        on: bool,
    },

    FaultRaised(SystemFault),
    FaultCleared(SystemFault),

    /// Midnight: the day's discomfort ratios just before the reset.
    DailyReport(EffectivenessReport),

    Suspended(bool),
}

/// Snapshot for the status display, serialisable for logging.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub faults: u16,
    pub active_children: u8,
    pub defined_children: u8,
    pub exchange_active: bool,
    pub interior_temp_f: Option<f32>,
    pub interior_rel_humidity: Option<f32>,
    pub effectiveness: EffectivenessReport,
}
