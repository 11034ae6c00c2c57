//! Actuation decision engine.
//!
//! Pure rules mapping (resource, output, climate) to on/off.  The only
//! state kept here is the air-exchange flag: while exchangers are moving
//! outside air in, conditioning equipment is held off.

use log::debug;

use crate::climate::{ClimateState, RelativeClimate};
use crate::error::DecisionError;
use crate::nodes::{OutputSelector, ResourceKind};

/// Everything the rules look at besides the resource itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateContext {
    pub interior: ClimateState,
    pub exterior: RelativeClimate,
    /// Humidity measured at the node that owns the output.
    pub local_rel_humidity: Option<f32>,
}

/// Exterior condition under which exchanging air helps, per interior state.
pub const fn required_exterior(interior: ClimateState) -> Option<RelativeClimate> {
    match interior {
        ClimateState::ColdAndDamp => Some(RelativeClimate::WarmerAndDrier),
        ClimateState::JustCold => Some(RelativeClimate::WarmerAndInHumidityBand),
        ClimateState::ColdAndDry => Some(RelativeClimate::WarmerAndDamper),
        ClimateState::JustDry => Some(RelativeClimate::DamperAndInTempBand),
        ClimateState::HotAndDry => Some(RelativeClimate::CoolerAndDamper),
        ClimateState::VeryHot => Some(RelativeClimate::CoolerAndInHumidityBand),
        ClimateState::HotAndDamp => Some(RelativeClimate::CoolerAndDrier),
        ClimateState::JustDamp => Some(RelativeClimate::DrierAndInTempBand),
        ClimateState::InComfortZone => None,
    }
}

pub fn exchange_needed(interior: ClimateState, exterior: RelativeClimate) -> bool {
    required_exterior(interior) == Some(exterior)
}

/// Decision engine with the latched air-exchange flag.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    fan_humidity_threshold: f32,
    exchange_active: bool,
    exchanger_decided_this_pass: bool,
}

impl DecisionEngine {
    pub fn new(fan_humidity_threshold: f32) -> Self {
        Self {
            fan_humidity_threshold,
            exchange_active: false,
            exchanger_decided_this_pass: false,
        }
    }

    pub fn exchange_active(&self) -> bool {
        self.exchange_active
    }

    /// Called when the sequencer wraps.  A flag left over from a pass in
    /// which no exchanger was decided has no owner any more.
    pub fn begin_pass(&mut self) {
        if !self.exchanger_decided_this_pass && self.exchange_active {
            debug!("DECIDE: no exchanger seen last pass, clearing exchange flag");
            self.exchange_active = false;
        }
        self.exchanger_decided_this_pass = false;
    }

    /// Decide one output.  Exchanger decisions update the flag.
    pub fn decide(
        &mut self,
        resource: ResourceKind,
        output: OutputSelector,
        ctx: &ClimateContext,
    ) -> Result<bool, DecisionError> {
        let unsupported = DecisionError::UnsupportedOutput(resource, output);
        match resource {
            ResourceKind::Free => Err(DecisionError::NoRule(resource)),
            ResourceKind::InternalFan => {
                if output.is_relay() {
                    return Err(unsupported);
                }
                Ok(ctx
                    .local_rel_humidity
                    .is_some_and(|rh| rh > self.fan_humidity_threshold))
            }
            _ if !output.is_relay() => Err(unsupported),
            ResourceKind::AirExchangerIn | ResourceKind::AirExchangerOut => {
                let needed = exchange_needed(ctx.interior, ctx.exterior);
                self.exchange_active = needed;
                self.exchanger_decided_this_pass = true;
                Ok(needed)
            }
            ResourceKind::AirConditioner => Ok(!self.exchange_active
                && matches!(
                    ctx.interior,
                    ClimateState::HotAndDamp | ClimateState::JustDamp | ClimateState::VeryHot
                )),
            ResourceKind::Heater => Ok(!self.exchange_active
                && matches!(
                    ctx.interior,
                    ClimateState::ColdAndDamp | ClimateState::JustCold | ClimateState::ColdAndDry
                )),
            ResourceKind::Humidifier => Ok(!self.exchange_active
                && matches!(
                    ctx.interior,
                    ClimateState::ColdAndDry | ClimateState::JustDry | ClimateState::HotAndDry
                )),
            ResourceKind::DeHumidifier => {
                Ok(!self.exchange_active && ctx.interior == ClimateState::JustDamp)
            }
        }
    }
}
