//! Parent interior temperature / humidity sensors.
//!
//! - MCP9700A linear thermistor: 10 mV/°C with 500 mV at 0 °C, which is
//!   `°F = 180·V − 58`.
//! - HIH5030 ratiometric humidity sensor: `RH = 50·V − 25`.
//!
//! Each conversion averages [`SAMPLES_PER_READ`] ADC samples and applies a
//! multiplicative calibration factor.  A mean voltage outside
//! [`VALID_BAND_V`] means the sensor is open or shorted.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: reads ADC1_CH4 / ADC1_CH5 via the oneshot API (initialised
//! by hw_init).
//! On host/test: reads from static `AtomicU16`s for injection.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicU16, Ordering};

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;

#[cfg(not(target_os = "espidf"))]
static SIM_TEMP_ADC: AtomicU16 = AtomicU16::new(0);
#[cfg(not(target_os = "espidf"))]
static SIM_RH_ADC: AtomicU16 = AtomicU16::new(0);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_interior_adc(temp_raw: u16, rh_raw: u16) {
    SIM_TEMP_ADC.store(temp_raw, Ordering::Relaxed);
    SIM_RH_ADC.store(rh_raw, Ordering::Relaxed);
}

pub const SAMPLES_PER_READ: usize = 16;
pub const VALID_BAND_V: (f32, f32) = (0.2, 3.0);

const ADC_MAX: f32 = 4095.0;
const V_REF: f32 = 3.3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub temperature_factor: f32,
    pub humidity_factor: f32,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            temperature_factor: 1.0,
            humidity_factor: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteriorReading {
    pub temperature_f: f32,
    pub rel_humidity: f32,
    pub temperature_in_band: bool,
    pub humidity_in_band: bool,
}

#[derive(Clone, Copy)]
enum Channel {
    Temperature,
    Humidity,
}

pub struct InteriorSensors {
    cal: Calibration,
}

impl InteriorSensors {
    pub fn new(cal: Calibration) -> Self {
        Self { cal }
    }

    pub fn calibration(&self) -> Calibration {
        self.cal
    }

    pub fn read(&self) -> InteriorReading {
        let temp_v = self.mean_voltage(Channel::Temperature);
        let rh_v = self.mean_voltage(Channel::Humidity);
        InteriorReading {
            temperature_f: volts_to_fahrenheit(temp_v) * self.cal.temperature_factor,
            rel_humidity: volts_to_rel_humidity(rh_v) * self.cal.humidity_factor,
            temperature_in_band: in_valid_band(temp_v),
            humidity_in_band: in_valid_band(rh_v),
        }
    }

    fn mean_voltage(&self, channel: Channel) -> f32 {
        // First conversion after a channel switch is often the worst.
        let _ = self.read_adc(channel);
        let sum: u32 = (0..SAMPLES_PER_READ)
            .map(|_| u32::from(self.read_adc(channel)))
            .sum();
        let mean_raw = sum as f32 / SAMPLES_PER_READ as f32;
        (mean_raw / ADC_MAX) * V_REF
    }

    #[cfg(target_os = "espidf")]
    fn read_adc(&self, channel: Channel) -> u16 {
        match channel {
            Channel::Temperature => hw_init::adc1_read(hw_init::ADC1_CH_INTERIOR_TEMP),
            Channel::Humidity => hw_init::adc1_read(hw_init::ADC1_CH_INTERIOR_RH),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_adc(&self, channel: Channel) -> u16 {
        match channel {
            Channel::Temperature => SIM_TEMP_ADC.load(Ordering::Relaxed),
            Channel::Humidity => SIM_RH_ADC.load(Ordering::Relaxed),
        }
    }
}

pub fn volts_to_fahrenheit(v: f32) -> f32 {
    180.0 * v - 58.0
}

pub fn volts_to_rel_humidity(v: f32) -> f32 {
    50.0 * v - 25.0
}

fn in_valid_band(v: f32) -> bool {
    v >= VALID_BAND_V.0 && v <= VALID_BAND_V.1
}
