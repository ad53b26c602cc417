//! Cold-boot sensor enumeration.

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use super::{SensorBank, fixed_slot};
use crate::app::ports::{BusSensorPort, FixedSensorPort};
use crate::config::MAX_BUS_SENSORS;
use crate::store::SensorSlot;

/// Result of one bus scan plus fixed-sensor probes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    /// Bus sensors in driver enumeration order, capped at [`MAX_BUS_SENSORS`].
    pub bus: heapless::Vec<SensorSlot, MAX_BUS_SENSORS>,
    pub hdc1080: SensorSlot,
    pub sht4x: SensorSlot,
}

impl<B, H, S> SensorBank<B, H, S>
where
    B: BusSensorPort,
    H: FixedSensorPort,
    S: FixedSensorPort,
{
    /// Enumerate every sensor on the node.
    ///
    /// Fixed sensors may not answer straight after power-up; if either
    /// probe fails, both are probed once more after `retry_delay_ms` before
    /// concluding absence.  More than [`MAX_BUS_SENSORS`] bus devices are
    /// truncated to the cap.
    pub fn discover(&mut self, delay: &mut impl DelayNs, retry_delay_ms: u32) -> Discovery {
        let (mut hdc, mut sht) = self.probe_fixed();
        if !hdc || !sht {
            debug!(
                "SENS | fixed probe hdc={} sht={}, retrying in {} ms",
                hdc, sht, retry_delay_ms
            );
            delay.delay_ms(retry_delay_ms);
            (hdc, sht) = self.probe_fixed();
        }

        let found = self.bus.device_count();
        if found > MAX_BUS_SENSORS {
            warn!(
                "SENS | {} bus sensors found, tracking first {}",
                found, MAX_BUS_SENSORS
            );
        }

        let mut bus = heapless::Vec::new();
        for index in 0..found.min(MAX_BUS_SENSORS) {
            match self.bus.address(index) {
                // Capacity equals the loop bound.
                Some(identity) => {
                    let _ = bus.push(SensorSlot::connected(identity));
                }
                None => warn!("SENS | bus device {} vanished during scan", index),
            }
        }

        let hdc1080 = fixed_slot(&mut self.hdc1080, hdc);
        let sht4x = fixed_slot(&mut self.sht4x, sht);
        self.set_fixed_presence(hdc1080.connected, sht4x.connected);

        info!(
            "SENS | discovered {} bus sensor(s), hdc1080={} sht4x={}",
            bus.len(),
            if hdc1080.connected { "present" } else { "absent" },
            if sht4x.connected { "present" } else { "absent" },
        );

        Discovery {
            bus,
            hdc1080,
            sht4x,
        }
    }
}
