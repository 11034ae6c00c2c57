//! CCS parent firmware library: the PNet resource manager.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod climate;
pub mod config;
pub mod decision;
pub mod error;
pub mod nodes;
pub mod pnet;
pub mod sequencer;
pub mod tracker;

pub mod pins;

// Hardware-facing layers; the actual peripheral access is cfg-guarded
// inside, with simulation stand-ins on host.
pub mod adapters;
pub mod drivers;
pub mod sensors;
