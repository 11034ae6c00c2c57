//! Inbound commands to the resource manager.
//!
//! These represent operator actions from the configuration screens and
//! the fault display, applied between ticks by
//! [`ResourceManager::handle_command`](super::service::ResourceManager::handle_command).

use crate::config::ComfortZoneConfig;
use crate::nodes::{ChildConfig, ChildId, ParentRelay, ResourceKind};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppCommand {
    /// Reset every miss counter and drop latched faults.
    AcknowledgeFaults,

    /// New setpoints and tolerances.
    UpdateComfortZone(ComfortZoneConfig),

    /// Replace a child slot's configuration.
    ConfigureNode { node: ChildId, config: ChildConfig },

    /// Change what one of the parent's own relays drives.
    AssignParentRelay { relay: ParentRelay, resource: ResourceKind },

    /// Hold the manager idle (e.g. while the security code has lapsed).
    SetSuspended(bool),

    /// Persist now instead of waiting for the auto-save delay.
    SaveState,
}
