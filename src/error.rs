//! Unified error types for the temperature feature.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! wake-cycle code's error handling uniform.  All variants are `Copy` so
//! they can be logged and returned without allocation.
//!
//! Expected conditions (absent sensors, ignored protocol values, rejected
//! console input) are *not* errors; they are handled where they occur.

use core::fmt;

use crate::app::ports::{ConfigError, StorageError};

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A sensor could not be read.
    Sensor(SensorError),
    /// The persistent key-value backend failed.
    Storage(StorageError),
    /// The persistent config could not be loaded or failed validation.
    Config(ConfigError),
    /// Conversion did not complete within the configured bound.
    ConversionTimeout { waited_ms: u32 },
    /// A store or bus could not be brought up, or the feature was used
    /// before `begin`.
    Init(&'static str),
    /// Operator input rejected; nothing was changed.
    InvalidInput(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::ConversionTimeout { waited_ms } => {
                write!(f, "conversion not complete after {waited_ms} ms")
            }
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The device did not answer on its bus.
    NotResponding,
    /// The addressed device is not on the bus any more.
    Disconnected,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotResponding => write!(f, "sensor not responding"),
            Self::Disconnected => write!(f, "sensor disconnected"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
