//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ResourceManager (domain)
//! ```
//!
//! Driven adapters (bus, storage, clock, sensing, relays, event sinks)
//! implement these traits.  The [`ResourceManager`](super::service::ResourceManager)
//! consumes them via generics, so the domain core never touches hardware
//! directly.
//!
//! - **StatePort** implementations MUST validate before persisting.
//! - All port errors are typed; callers must handle every variant explicitly.

use crate::config::PersistedState;
use crate::nodes::ParentRelay;

pub use crate::pnet::transport::BusTransport;

// ───────────────────────────────────────────────────────────────
// Interior sensing port (driven adapter: ADC → domain)
// ───────────────────────────────────────────────────────────────

/// Parent's own temperature/humidity measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteriorSample {
    pub temperature_f: f32,
    pub rel_humidity: f32,
}

pub trait InteriorSensorPort {
    /// Latest calibrated interior sample.
    fn current_interior_sample(&mut self) -> InteriorSample;
}

// ───────────────────────────────────────────────────────────────
// Parent relay port (driven adapter: domain → GPIO)
// ───────────────────────────────────────────────────────────────

pub trait ParentRelayPort {
    fn set_relay(&mut self, relay: ParentRelay, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

pub trait ClockPort {
    /// True exactly once per local midnight.
    fn is_midnight_tick(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / display)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// State port (driven adapter: domain ↔ persistent state)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the node table, comfort zone and counters.
///
/// Implementations MUST validate before persisting.  Invalid ranges are
/// rejected with [`StateError::ValidationFailed`], not clamped.
pub trait StatePort {
    /// Load persisted state.  Returns [`PersistedState::default()`] if
    /// nothing is stored yet.
    fn load_state(&self) -> Result<PersistedState, StateError>;

    /// Validate and persist.
    fn save_state(&self, state: &PersistedState) -> Result<(), StateError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`StatePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    /// Stored blob failed deserialization.
    Corrupted,
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for StateError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "state corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
