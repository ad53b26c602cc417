//! The two persistence tiers.
//!
//! | Tier       | Survives            | Type                 | Role              |
//! |------------|---------------------|----------------------|-------------------|
//! | persistent | power loss          | [`PersistentConfig`] | calibration truth |
//! | cycle      | deep sleep only     | [`CycleState`]       | derived cache     |

pub mod cycle;
pub mod persistent;

pub use cycle::{CalibratedSlot, CycleState, SensorSlot};
pub use persistent::{PersistentConfig, PersistentStore};
