//! Port traits: the hexagonal boundary between the temperature core and
//! the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ TempFeature (domain)
//! ```
//!
//! Sensor drivers, the two persistence tiers and the setup console all sit
//! behind these traits.  [`TempFeature`](super::service::TempFeature) owns
//! one implementation of each, injected at construction, so the domain core
//! never touches a bus, a flash partition or a UART directly.

use crate::error::SensorError;
use crate::identity::{SensorClass, SensorIdentity};
use crate::store::{CycleState, PersistentConfig};

// ───────────────────────────────────────────────────────────────
// Sensor ports (driven adapters: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Multi-drop temperature bus (DS18B20 on 1-Wire).
///
/// Conversions are always started without blocking; completion is polled
/// through [`is_conversion_complete`](Self::is_conversion_complete).
pub trait BusSensorPort {
    /// Number of devices found by the bus search.
    fn device_count(&mut self) -> usize;

    /// ROM code of the device at enumeration `index`.  The order is
    /// driver-defined and only stable until the next power cycle.
    fn address(&mut self, index: usize) -> Option<SensorIdentity>;

    /// Configure conversion resolution (bits) on every device.
    fn set_resolution(&mut self, bits: u8);

    /// Start a temperature conversion on every device and return at once.
    fn request_conversion(&mut self);

    /// Whether the last requested conversion has finished.
    fn is_conversion_complete(&mut self) -> bool;

    /// Latest converted temperature of one device.
    fn read_celsius(&mut self, identity: &SensorIdentity) -> Result<f32, SensorError>;
}

/// Single-instance on-board sensor (HDC1080, SHT4x).
pub trait FixedSensorPort {
    /// Which family this chip belongs to.
    fn class(&self) -> SensorClass;

    /// Check whether the chip answers.  May fail transiently right after
    /// power-up.
    fn probe(&mut self) -> bool;

    /// Factory serial number.
    fn serial(&mut self) -> Result<SensorIdentity, SensorError>;

    /// Start a measurement without blocking.
    fn trigger_read(&mut self);

    /// Whether the triggered measurement is available.
    fn is_ready(&mut self) -> bool {
        true
    }

    /// Fetch the measured temperature.
    fn read_celsius(&mut self) -> Result<f32, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value blob storage.
///
/// - Keys are namespaced to prevent collisions between features.
/// - Write operations MUST be atomic; no partial writes on power loss.
///   The ESP-IDF NVS API guarantees this natively; in-memory simulation
///   achieves it trivially.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Config store port (power-loss-safe calibration truth)
// ───────────────────────────────────────────────────────────────

/// Durable store holding the default precision and the correction map.
///
/// Map keys are canonical identity strings ([`SensorIdentity::key`]).
/// Implementations MUST validate before persisting and leave their state
/// untouched when a write is rejected.
pub trait ConfigStorePort {
    /// Current view of the stored config.
    fn config(&self) -> &PersistentConfig;

    /// Stored default precision, if one has been written.
    fn precision(&self) -> Option<u8> {
        self.config().default_precision
    }

    fn set_precision(&mut self, bits: u8) -> Result<(), ConfigError>;

    fn has_offset(&self, key: &str) -> bool {
        self.config().offsets.contains_key(key)
    }

    fn offset(&self, key: &str) -> Option<f32> {
        self.config().offsets.get(key).copied()
    }

    fn set_offset(&mut self, key: &str, offset: f32) -> Result<(), ConfigError>;

    /// Remove a correction.  Returns whether an entry existed.
    fn remove_offset(&mut self, key: &str) -> Result<bool, ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Cycle store port (deep-sleep-retained cache)
// ───────────────────────────────────────────────────────────────

/// Cache that survives deep sleep but not power loss.
pub trait CycleStorePort {
    /// Whether the contents survived the most recent sleep.  Evaluated once
    /// per boot; writing during this wake does not change the answer.
    fn is_valid(&self) -> bool;

    /// Decode the stored state.  `None` if nothing coherent is stored.
    fn load(&self) -> Option<CycleState>;

    fn save(&mut self, state: &CycleState) -> Result<(), StorageError>;

    /// Drop the contents so the next boot rediscovers.
    fn invalidate(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Console port (line-based operator transport)
// ───────────────────────────────────────────────────────────────

/// Serial setup console.  Output goes through [`core::fmt::Write`].
pub trait ConsoleIo: core::fmt::Write {
    /// Block until the operator enters a line.  Returns `None` at end of
    /// input, which the menu treats as "return".
    fn read_line(&mut self) -> Option<String>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigStorePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A value failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] and [`CycleStorePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition or region is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl From<StorageError> for ConfigError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Full => Self::StorageFull,
            StorageError::NotFound | StorageError::IoError => Self::IoError,
        }
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
