//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the rules of the temperature feature: wake-cycle
//! orchestration, the controller protocol and the setup console.  All
//! interaction with sensors, flash and RTC memory happens through **port
//! traits** defined in [`ports`], keeping this layer fully testable without
//! real peripherals.

pub mod commands;
pub mod console;
pub mod feature;
pub mod ports;
pub mod service;
