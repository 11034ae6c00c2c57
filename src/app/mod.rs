//! Application core: pure domain logic, zero I/O.
//!
//! The resource manager orchestrates the sequencer, the node sessions,
//! the decision engine and the fault tracker.  All interaction with
//! hardware happens through **port traits** defined in [`ports`],
//! keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
