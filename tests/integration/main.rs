//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against the simulated child bus and mock adapters.  All tests run on
//! the host (x86_64) with no real hardware required.

mod mock_bus;
mod mock_hw;
mod resource_manager_tests;
mod sequencer_tests;
mod session_tests;
