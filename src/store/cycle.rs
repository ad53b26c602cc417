//! Per-wake-cycle state kept in deep-sleep-retained memory.
//!
//! Everything here is a derived cache: it is rebuilt from a fresh bus scan
//! plus the persistent config whenever the cycle store does not survive a
//! sleep (see [`crate::calibration::resolve`]).

use serde::{Deserialize, Serialize};

use crate::config::MAX_BUS_SENSORS;
use crate::identity::{SensorClass, SensorIdentity};

/// One discovered sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorSlot {
    pub identity: SensorIdentity,
    pub connected: bool,
}

impl SensorSlot {
    pub const fn connected(identity: SensorIdentity) -> Self {
        Self {
            identity,
            connected: true,
        }
    }

    /// Placeholder for a fixed sensor that did not answer: zero-filled
    /// identity, not connected.
    pub const fn absent(class: SensorClass) -> Self {
        Self {
            identity: SensorIdentity::zeroed(class),
            connected: false,
        }
    }
}

/// A slot together with the correction resolved for it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibratedSlot {
    pub slot: SensorSlot,
    pub offset: f32,
}

impl CalibratedSlot {
    pub fn is_connected(&self) -> bool {
        self.slot.connected
    }
}

/// Contents of the cycle store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleState {
    /// Send `p` with the next delivery.
    pub precision_requested: bool,
    /// Send `c` with the next delivery.
    pub corrections_requested: bool,
    /// Live sensor resolution in bits.
    pub precision: u8,
    /// Bus sensors in enumeration order.
    pub bus: heapless::Vec<CalibratedSlot, MAX_BUS_SENSORS>,
    pub hdc1080: CalibratedSlot,
    pub sht4x: CalibratedSlot,
}

impl CycleState {
    /// State with no sensors, used before the first `begin`.
    pub fn empty(precision: u8) -> Self {
        Self {
            precision_requested: false,
            corrections_requested: false,
            precision,
            bus: heapless::Vec::new(),
            hdc1080: CalibratedSlot {
                slot: SensorSlot::absent(SensorClass::Hdc1080),
                offset: 0.0,
            },
            sht4x: CalibratedSlot {
                slot: SensorSlot::absent(SensorClass::Sht4x),
                offset: 0.0,
            },
        }
    }

    pub fn sensor_count(&self) -> usize {
        self.bus.len()
    }

    /// Every connected sensor in reporting order: bus sensors by index,
    /// then the HDC1080, then the SHT4x.
    pub fn connected(&self) -> impl Iterator<Item = (SensorClass, &CalibratedSlot)> {
        self.bus
            .iter()
            .map(|s| (SensorClass::Bus, s))
            .chain(core::iter::once((SensorClass::Hdc1080, &self.hdc1080)))
            .chain(core::iter::once((SensorClass::Sht4x, &self.sht4x)))
            .filter(|(_, s)| s.is_connected())
    }

    /// Connected sensor with the given identity.
    pub fn find_mut(&mut self, identity: &SensorIdentity) -> Option<&mut CalibratedSlot> {
        self.bus
            .iter_mut()
            .chain(core::iter::once(&mut self.hdc1080))
            .chain(core::iter::once(&mut self.sht4x))
            .find(|s| s.is_connected() && s.slot.identity == *identity)
    }
}
