//! Interior and exterior climate classification.
//!
//! Interior: where the building sits relative to the comfort band, one of
//! nine states partitioning the temperature/humidity plane.
//!
//! Exterior: how outside air compares to inside air, which tells the
//! decision engine whether exchanging air would move the interior toward
//! the band.

use serde::{Deserialize, Serialize};

use crate::config::ComfortZoneConfig;

/// Interior condition relative to the comfort band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClimateState {
    HotAndDamp,
    JustDamp,
    ColdAndDamp,
    JustCold,
    ColdAndDry,
    JustDry,
    HotAndDry,
    /// Hot, humidity within the band.
    VeryHot,
    InComfortZone,
}

impl ClimateState {
    pub const ALL: [Self; 9] = [
        Self::HotAndDamp,
        Self::JustDamp,
        Self::ColdAndDamp,
        Self::JustCold,
        Self::ColdAndDry,
        Self::JustDry,
        Self::HotAndDry,
        Self::VeryHot,
        Self::InComfortZone,
    ];

    pub const fn is_hot(self) -> bool {
        matches!(self, Self::HotAndDamp | Self::VeryHot | Self::HotAndDry)
    }

    pub const fn is_cold(self) -> bool {
        matches!(self, Self::ColdAndDamp | Self::JustCold | Self::ColdAndDry)
    }

    pub const fn is_damp(self) -> bool {
        matches!(self, Self::HotAndDamp | Self::JustDamp | Self::ColdAndDamp)
    }

    pub const fn is_dry(self) -> bool {
        matches!(self, Self::ColdAndDry | Self::JustDry | Self::HotAndDry)
    }
}

/// Exterior air relative to interior air.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelativeClimate {
    CoolerAndDrier,
    /// Drier, exterior temperature within the comfort band.
    DrierAndInTempBand,
    WarmerAndDrier,
    /// Warmer, exterior humidity within the comfort band.
    WarmerAndInHumidityBand,
    WarmerAndDamper,
    /// Damper, exterior temperature within the comfort band.
    DamperAndInTempBand,
    CoolerAndDamper,
    /// Cooler, exterior humidity within the comfort band.
    CoolerAndInHumidityBand,
    /// No rule matched, or no exterior reading is available.
    Indeterminate,
}

/// Exterior temperature strictly inside the band.
pub fn temperature_in_band(temp_f: f32, zone: &ComfortZoneConfig) -> bool {
    temp_f > zone.temp_low() && temp_f < zone.temp_high()
}

/// Exterior humidity strictly inside the band.
pub fn humidity_in_band(rh: f32, zone: &ComfortZoneConfig) -> bool {
    rh > zone.humidity_low() && rh < zone.humidity_high()
}

/// Classify the interior.  Below band means strictly under
/// `setpoint - tolerance`, above band strictly over `setpoint + tolerance`.
pub fn classify_interior(temp_f: f32, rh: f32, zone: &ComfortZoneConfig) -> ClimateState {
    let hot = temp_f > zone.temp_high();
    let cold = temp_f < zone.temp_low();
    let damp = rh > zone.humidity_high();
    let dry = rh < zone.humidity_low();

    match (hot, cold, damp, dry) {
        (true, _, true, _) => ClimateState::HotAndDamp,
        (true, _, _, true) => ClimateState::HotAndDry,
        (true, ..) => ClimateState::VeryHot,
        (_, true, true, _) => ClimateState::ColdAndDamp,
        (_, true, _, true) => ClimateState::ColdAndDry,
        (_, true, ..) => ClimateState::JustCold,
        (.., true, _) => ClimateState::JustDamp,
        (.., true) => ClimateState::JustDry,
        _ => ClimateState::InComfortZone,
    }
}

/// Classify exterior air against interior air.
///
/// Rules are tried in this order and the first match wins:
///
/// 1. cooler and drier
/// 2. drier, exterior temperature in band
/// 3. warmer and drier
/// 4. warmer, exterior humidity in band
/// 5. warmer and damper
/// 6. damper, exterior temperature in band
/// 7. cooler and damper
/// 8. cooler, exterior humidity in band
///
/// Equal temperatures or equal humidities only match the in-band rules;
/// anything left over is `Indeterminate`.
pub fn classify_exterior_relative(
    ext_temp_f: f32,
    ext_rh: f32,
    int_temp_f: f32,
    int_rh: f32,
    zone: &ComfortZoneConfig,
) -> RelativeClimate {
    let warmer = ext_temp_f > int_temp_f;
    let cooler = ext_temp_f < int_temp_f;
    let damper = ext_rh > int_rh;
    let drier = ext_rh < int_rh;
    let temp_band = temperature_in_band(ext_temp_f, zone);
    let hum_band = humidity_in_band(ext_rh, zone);

    if cooler && drier {
        RelativeClimate::CoolerAndDrier
    } else if drier && temp_band {
        RelativeClimate::DrierAndInTempBand
    } else if warmer && drier {
        RelativeClimate::WarmerAndDrier
    } else if warmer && hum_band {
        RelativeClimate::WarmerAndInHumidityBand
    } else if warmer && damper {
        RelativeClimate::WarmerAndDamper
    } else if damper && temp_band {
        RelativeClimate::DamperAndInTempBand
    } else if cooler && damper {
        RelativeClimate::CoolerAndDamper
    } else if cooler && hum_band {
        RelativeClimate::CoolerAndInHumidityBand
    } else {
        RelativeClimate::Indeterminate
    }
}
