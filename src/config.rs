//! Feature configuration parameters
//!
//! Compile-time defaults for the temperature feature.  These are tunables of
//! the firmware build, not operator settings: the operator-facing values
//! (default precision, per-sensor corrections) live in
//! [`PersistentConfig`](crate::store::PersistentConfig).

use serde::{Deserialize, Serialize};

/// Maximum number of bus-enumerated sensors tracked per node.
pub const MAX_BUS_SENSORS: usize = 8;

/// Sensor resolution range accepted from the controller, in bits.
pub const PRECISION_RANGE: core::ops::RangeInclusive<u8> = 9..=12;

/// Sensor resolution range accepted from the setup console, in bits.
pub const CONSOLE_PRECISION_RANGE: core::ops::RangeInclusive<u8> = 8..=12;

/// Temperature feature tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    // --- Defaults written on first boot ---
    /// Resolution (bits) stored when the persistent config has none
    pub default_precision: u8,

    // --- Discovery ---
    /// Pause before re-probing a fixed sensor that did not answer (ms)
    pub probe_retry_delay_ms: u32,

    // --- Conversion ---
    /// Upper bound on waiting for a conversion to finish (ms)
    pub conversion_timeout_ms: u32,
    /// Interval between completion polls (ms)
    pub conversion_poll_ms: u32,

    // --- Console identify-by-touch ---
    /// Number of polling rounds before giving up
    pub identify_rounds: u8,
    /// Pause between polling rounds (ms)
    pub identify_interval_ms: u32,
    /// Rise above baseline (°C) that marks a sensor as touched
    pub identify_threshold_c: f32,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            default_precision: 11,

            probe_retry_delay_ms: 15,

            // DS18B20 at 12 bit needs 750 ms
            conversion_timeout_ms: 1500,
            conversion_poll_ms: 1,

            identify_rounds: 20,
            identify_interval_ms: 300,
            identify_threshold_c: 2.0,
        }
    }
}
