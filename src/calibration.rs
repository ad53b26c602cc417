//! Calibration resolver.
//!
//! The only place where operator settings cross from the persistent config
//! into the cycle store.  Runs once per cold boot; a warm wake reuses the
//! cycle store as-is.

use crate::sensors::Discovery;
use crate::store::{CalibratedSlot, CycleState, PersistentConfig, SensorSlot};

/// Build the cycle state for a freshly discovered topology.
///
/// Pure: the same discovery and config always produce the same state.
/// Sensors without a stored correction get 0.0; absent fixed sensors keep
/// their zero-filled identity and 0.0.  Both request flags start cleared.
/// `fallback_precision` is used only if the config has no precision yet.
pub fn resolve(
    discovery: &Discovery,
    config: &PersistentConfig,
    fallback_precision: u8,
) -> CycleState {
    let calibrate = |slot: &SensorSlot| CalibratedSlot {
        slot: *slot,
        offset: if slot.connected {
            config.offset_for(&slot.identity)
        } else {
            0.0
        },
    };

    let mut state = CycleState::empty(config.default_precision.unwrap_or(fallback_precision));
    for slot in &discovery.bus {
        // Discovery is capped at the same capacity.
        let _ = state.bus.push(calibrate(slot));
    }
    state.hdc1080 = calibrate(&discovery.hdc1080);
    state.sht4x = calibrate(&discovery.sht4x);
    state
}
