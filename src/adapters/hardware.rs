//! Hardware adapter: bridges the parent's own peripherals to port traits.
//!
//! Owns the interior sensors, the two parent relay outputs and the
//! midnight clock, exposing them through [`InteriorSensorPort`],
//! [`ParentRelayPort`] and [`ClockPort`].  The PNet bus is a separate
//! adapter ([`super::rs485`]).

use embedded_hal::digital::OutputPin;
use log::{info, warn};

use crate::adapters::time::MidnightClock;
use crate::app::ports::{ClockPort, InteriorSample, InteriorSensorPort, ParentRelayPort};
use crate::nodes::ParentRelay;
use crate::sensors::interior::InteriorSensors;

/// Concrete adapter that combines the parent-local hardware.
pub struct HardwareAdapter<R1, R2> {
    interior: InteriorSensors,
    relay1: R1,
    relay2: R2,
    clock: MidnightClock,
    temperature_in_band: bool,
    humidity_in_band: bool,
}

impl<R1: OutputPin, R2: OutputPin> HardwareAdapter<R1, R2> {
    pub fn new(interior: InteriorSensors, relay1: R1, relay2: R2, clock: MidnightClock) -> Self {
        Self {
            interior,
            relay1,
            relay2,
            clock,
            temperature_in_band: true,
            humidity_in_band: true,
        }
    }

    pub fn relays(&self) -> (&R1, &R2) {
        (&self.relay1, &self.relay2)
    }

    /// De-energise both relays (boot, shutdown).
    pub fn all_off(&mut self) {
        for relay in ParentRelay::ALL {
            self.set_relay(relay, false);
        }
    }
}

// ── InteriorSensorPort implementation ─────────────────────────

impl<R1: OutputPin, R2: OutputPin> InteriorSensorPort for HardwareAdapter<R1, R2> {
    fn current_interior_sample(&mut self) -> InteriorSample {
        let reading = self.interior.read();

        if reading.temperature_in_band != self.temperature_in_band {
            self.temperature_in_band = reading.temperature_in_band;
            if reading.temperature_in_band {
                info!("Interior temperature sensor back in range");
            } else {
                warn!("Interior temperature sensor out of range ({:.1}F)", reading.temperature_f);
            }
        }
        if reading.humidity_in_band != self.humidity_in_band {
            self.humidity_in_band = reading.humidity_in_band;
            if reading.humidity_in_band {
                info!("Interior humidity sensor back in range");
            } else {
                warn!("Interior humidity sensor out of range ({:.1}%)", reading.rel_humidity);
            }
        }

        InteriorSample {
            temperature_f: reading.temperature_f,
            rel_humidity: reading.rel_humidity,
        }
    }
}

// ── ParentRelayPort implementation ────────────────────────────

impl<R1: OutputPin, R2: OutputPin> ParentRelayPort for HardwareAdapter<R1, R2> {
    fn set_relay(&mut self, relay: ParentRelay, on: bool) {
        let result = match relay {
            ParentRelay::Relay1 => self.relay1.set_state(on.into()).map_err(|_| ()),
            ParentRelay::Relay2 => self.relay2.set_state(on.into()).map_err(|_| ()),
        };
        if result.is_err() {
            warn!("Parent {:?} GPIO write failed", relay);
        }
    }
}

// ── ClockPort implementation ──────────────────────────────────

impl<R1, R2> ClockPort for HardwareAdapter<R1, R2> {
    fn is_midnight_tick(&mut self) -> bool {
        self.clock.is_midnight_tick()
    }
}
