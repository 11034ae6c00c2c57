//! Peripheral drivers and one-shot hardware initialisation.

pub mod gpio;
pub mod hw_init;
pub mod uart;
pub mod watchdog;
