//! Thermonode temperature feature library.
//!
//! Exposes the pure-logic modules for integration testing and the host
//! simulator. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod calibration;
pub mod config;
pub mod error;
pub mod identity;
pub mod protocol;
pub mod sensors;
pub mod store;

pub use app::feature::Feature;
pub use app::service::TempFeature;
pub use error::{Error, Result};
