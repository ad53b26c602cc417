//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against simulated sensors and host-backed stores.  All tests run on the
//! host (x86_64) with no real hardware required.

#![cfg(not(target_os = "espidf"))]

mod console_tests;
mod feedback_tests;
mod mock_hw;
mod wake_cycle_tests;
