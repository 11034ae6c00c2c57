//! System configuration parameters
//!
//! The comfort zone the building is held in, plus the tunables of the
//! polling protocol and the fault tracker.  Persisted together with the
//! node table as one [`PersistedState`] blob.

use serde::{Deserialize, Serialize};

use crate::app::ports::StateError;
use crate::nodes::{ChildConfig, NUM_CHILDREN, ParentNode};
use crate::tracker::EffectivenessCounters;

/// Setpoints and tolerances of the comfort band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComfortZoneConfig {
    pub setpoint_temp_f: f32,
    pub setpoint_rel_humidity: f32,
    pub tolerance_temp_f: f32,
    pub tolerance_rel_humidity: f32,
}

impl Default for ComfortZoneConfig {
    fn default() -> Self {
        Self {
            setpoint_temp_f: 70.0,
            setpoint_rel_humidity: 45.0,
            tolerance_temp_f: 5.0,
            tolerance_rel_humidity: 8.0,
        }
    }
}

impl ComfortZoneConfig {
    pub fn temp_low(&self) -> f32 {
        self.setpoint_temp_f - self.tolerance_temp_f
    }

    pub fn temp_high(&self) -> f32 {
        self.setpoint_temp_f + self.tolerance_temp_f
    }

    pub fn humidity_low(&self) -> f32 {
        self.setpoint_rel_humidity - self.tolerance_rel_humidity
    }

    pub fn humidity_high(&self) -> f32 {
        self.setpoint_rel_humidity + self.tolerance_rel_humidity
    }
}

/// Bus protocol tunables, handed to each node session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// How long to wait for a child's response line (ms).
    pub response_timeout_ms: u32,
    /// Version character children must echo in the handshake.
    pub version: u8,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            response_timeout_ms: 35,
            version: b'A',
        }
    }
}

/// Core system configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    pub comfort: ComfortZoneConfig,
    pub protocol: ProtocolConfig,

    // --- Timing ---
    /// Period between resource-manager invocations (milliseconds)
    pub step_period_ms: u32,

    // --- Liveness ---
    /// Consecutive missed handshakes before a child counts as lost
    pub mia_max: u8,

    // --- Actuation ---
    /// Local humidity (%) above which an internal fan runs
    pub fan_humidity_threshold: f32,

    // --- Effectiveness ---
    /// Ticks that must accumulate before ratios are judged
    pub effectiveness_floor_ticks: u32,
    /// Fraction of the day outside the band that raises a fault
    pub effectiveness_criterion: f32,

    // --- Secondary temperature ---
    /// Exponential filter coefficient for secondary readings
    pub secondary_filter_coefficient: f32,
    /// Filtered secondary temperature (°F) below which a fault is raised
    pub secondary_low_limit_f: f32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            comfort: ComfortZoneConfig::default(),
            protocol: ProtocolConfig::default(),

            step_period_ms: 3000,

            mia_max: 4,

            fan_humidity_threshold: 55.0,

            effectiveness_floor_ticks: 1200,
            effectiveness_criterion: 0.3,

            secondary_filter_coefficient: 0.0327,
            secondary_low_limit_f: 50.0,
        }
    }
}

/// Range-check a comfort zone before it is accepted or persisted.
pub fn validate_comfort_zone(zone: &ComfortZoneConfig) -> Result<(), StateError> {
    if !(55.0..=95.0).contains(&zone.setpoint_temp_f) {
        return Err(StateError::ValidationFailed(
            "setpoint_temp_f must be 55–95",
        ));
    }
    if !(25.0..=80.0).contains(&zone.setpoint_rel_humidity) {
        return Err(StateError::ValidationFailed(
            "setpoint_rel_humidity must be 25–80",
        ));
    }
    if !(zone.tolerance_temp_f > 0.0 && zone.tolerance_temp_f <= 20.0) {
        return Err(StateError::ValidationFailed(
            "tolerance_temp_f must be >0 and ≤20",
        ));
    }
    if !(zone.tolerance_rel_humidity > 0.0 && zone.tolerance_rel_humidity <= 30.0) {
        return Err(StateError::ValidationFailed(
            "tolerance_rel_humidity must be >0 and ≤30",
        ));
    }
    Ok(())
}

pub fn validate_config(cfg: &SystemConfig) -> Result<(), StateError> {
    validate_comfort_zone(&cfg.comfort)?;
    if !(5..=1000).contains(&cfg.protocol.response_timeout_ms) {
        return Err(StateError::ValidationFailed(
            "response_timeout_ms must be 5–1000",
        ));
    }
    if !cfg.protocol.version.is_ascii_alphanumeric() {
        return Err(StateError::ValidationFailed(
            "protocol version must be an ASCII letter or digit",
        ));
    }
    if !(100..=60_000).contains(&cfg.step_period_ms) {
        return Err(StateError::ValidationFailed(
            "step_period_ms must be 100–60000",
        ));
    }
    if cfg.mia_max == 0 {
        return Err(StateError::ValidationFailed("mia_max must be ≥1"));
    }
    if !(0.0..=100.0).contains(&cfg.fan_humidity_threshold) {
        return Err(StateError::ValidationFailed(
            "fan_humidity_threshold must be 0–100",
        ));
    }
    if cfg.effectiveness_floor_ticks == 0 {
        return Err(StateError::ValidationFailed(
            "effectiveness_floor_ticks must be ≥1",
        ));
    }
    if !(cfg.effectiveness_criterion > 0.0 && cfg.effectiveness_criterion < 1.0) {
        return Err(StateError::ValidationFailed(
            "effectiveness_criterion must be between 0 and 1",
        ));
    }
    if !(cfg.secondary_filter_coefficient > 0.0 && cfg.secondary_filter_coefficient <= 1.0) {
        return Err(StateError::ValidationFailed(
            "secondary_filter_coefficient must be >0 and ≤1",
        ));
    }
    if !(-50.0..=120.0).contains(&cfg.secondary_low_limit_f) {
        return Err(StateError::ValidationFailed(
            "secondary_low_limit_f must be -50–120",
        ));
    }
    Ok(())
}

// ── Persisted blob ────────────────────────────────────────────

/// Everything the parent keeps across power cycles.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PersistedState {
    pub config: SystemConfig,
    pub parent: ParentNode,
    pub children: [ChildConfig; NUM_CHILDREN],
    pub counters: EffectivenessCounters,
}

/// Validate the whole blob, including the single exterior reference rule.
pub fn validate_state(state: &PersistedState) -> Result<(), StateError> {
    validate_config(&state.config)?;
    let references = state
        .children
        .iter()
        .filter(|c| c.defined && c.is_exterior_reference)
        .count();
    if references > 1 {
        return Err(StateError::ValidationFailed(
            "at most one child may be the exterior reference",
        ));
    }
    Ok(())
}
