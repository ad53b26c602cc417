//! Sensor subsystem: discovery and the conversion scheduler.
//!
//! [`SensorBank`] owns the three sensor providers (1-Wire bus, HDC1080,
//! SHT4x).  It enumerates them on a cold boot, starts conversions without
//! blocking, and gates reads on completion with a bounded, yielding wait.

pub mod discovery;

use embedded_hal::delay::DelayNs;
use log::{debug, warn};

use crate::app::ports::{BusSensorPort, FixedSensorPort};
use crate::error::{Error, Result, SensorError};
use crate::identity::{SensorClass, SensorIdentity};
use crate::store::SensorSlot;

pub use discovery::Discovery;

/// Aggregates the sensor providers of one node.
pub struct SensorBank<B, H, S> {
    pub bus: B,
    pub hdc1080: H,
    pub sht4x: S,
    /// Live presence of the fixed sensors for this wake.
    hdc1080_present: bool,
    sht4x_present: bool,
}

impl<B, H, S> SensorBank<B, H, S>
where
    B: BusSensorPort,
    H: FixedSensorPort,
    S: FixedSensorPort,
{
    /// Construct a bank from pre-built drivers.  Presence is unknown until
    /// [`discover`](Self::discover) or [`probe_fixed`](Self::probe_fixed).
    pub fn new(bus: B, hdc1080: H, sht4x: S) -> Self {
        Self {
            bus,
            hdc1080,
            sht4x,
            hdc1080_present: false,
            sht4x_present: false,
        }
    }

    /// Probe both fixed sensors once, without retry, and record the result.
    pub fn probe_fixed(&mut self) -> (bool, bool) {
        self.hdc1080_present = self.hdc1080.probe();
        self.sht4x_present = self.sht4x.probe();
        (self.hdc1080_present, self.sht4x_present)
    }

    /// Override live presence (warm wake: a sensor only counts if it was
    /// resolved at cold boot *and* still answers).
    pub fn set_fixed_presence(&mut self, hdc1080: bool, sht4x: bool) {
        self.hdc1080_present = hdc1080;
        self.sht4x_present = sht4x;
    }

    pub fn fixed_presence(&self) -> (bool, bool) {
        (self.hdc1080_present, self.sht4x_present)
    }

    // ── Conversion scheduling ─────────────────────────────────

    /// Configure resolution and start a conversion, without waiting.  The
    /// first conversion after a resolution change is unreliable, so callers
    /// discard whatever it produces.
    pub fn apply_precision(&mut self, bits: u8) {
        debug!("SENS | resolution -> {} bit", bits);
        self.bus.set_resolution(bits);
        self.bus.request_conversion();
    }

    /// Start a conversion on every sensor that supports background
    /// conversion.
    pub fn begin_conversion(&mut self) {
        self.bus.request_conversion();
        if self.hdc1080_present {
            self.hdc1080.trigger_read();
        }
        if self.sht4x_present {
            self.sht4x.trigger_read();
        }
    }

    /// Whether every started conversion has finished.
    pub fn is_ready(&mut self) -> bool {
        self.bus.is_conversion_complete()
            && (!self.hdc1080_present || self.hdc1080.is_ready())
            && (!self.sht4x_present || self.sht4x.is_ready())
    }

    /// Poll [`is_ready`](Self::is_ready), yielding `poll_ms` between polls,
    /// for at most `timeout_ms`.  Returns the time waited.
    pub fn wait_ready(
        &mut self,
        delay: &mut impl DelayNs,
        timeout_ms: u32,
        poll_ms: u32,
    ) -> Result<u32> {
        let poll_ms = poll_ms.max(1);
        let mut waited_ms = 0u32;
        loop {
            if self.is_ready() {
                return Ok(waited_ms);
            }
            if waited_ms >= timeout_ms {
                warn!("SENS | conversion timed out after {} ms", waited_ms);
                return Err(Error::ConversionTimeout { waited_ms });
            }
            delay.delay_ms(poll_ms);
            waited_ms = waited_ms.saturating_add(poll_ms);
        }
    }

    /// Blocking conversion whose fixed-sensor results are guaranteed fresh
    /// (see [`refresh_fixed`](Self::refresh_fixed)).
    pub fn convert_fresh(
        &mut self,
        delay: &mut impl DelayNs,
        timeout_ms: u32,
        poll_ms: u32,
    ) -> Result<u32> {
        self.refresh_fixed();
        self.bus.request_conversion();
        self.wait_ready(delay, timeout_ms, poll_ms)
    }

    // ── Reads ─────────────────────────────────────────────────

    /// Latest converted temperature of one sensor, before correction.
    pub fn read_raw(&mut self, class: SensorClass, identity: &SensorIdentity) -> Result<f32> {
        let reading = match class {
            SensorClass::Bus => self.bus.read_celsius(identity),
            SensorClass::Hdc1080 if self.hdc1080_present => self.hdc1080.read_celsius(),
            SensorClass::Sht4x if self.sht4x_present => self.sht4x.read_celsius(),
            SensorClass::Hdc1080 | SensorClass::Sht4x => Err(SensorError::Disconnected),
        };
        reading.map_err(Error::from)
    }

    /// Fresh measurement from the fixed sensors: a throw-away read to clear
    /// any stale result, then a new trigger.
    pub fn refresh_fixed(&mut self) {
        if self.hdc1080_present {
            let _ = self.hdc1080.read_celsius();
            self.hdc1080.trigger_read();
        }
        if self.sht4x_present {
            let _ = self.sht4x.read_celsius();
            self.sht4x.trigger_read();
        }
    }
}

/// Stand-in for a fixed sensor that is not fitted on this board variant.
#[derive(Debug, Clone, Copy)]
pub struct NotFitted(pub SensorClass);

impl FixedSensorPort for NotFitted {
    fn class(&self) -> SensorClass {
        self.0
    }

    fn probe(&mut self) -> bool {
        false
    }

    fn serial(&mut self) -> core::result::Result<SensorIdentity, SensorError> {
        Err(SensorError::NotResponding)
    }

    fn trigger_read(&mut self) {}

    fn read_celsius(&mut self) -> core::result::Result<f32, SensorError> {
        Err(SensorError::NotResponding)
    }
}

/// Slot for a fixed sensor that answered the probe.  A serial-number read
/// failure demotes it to absent for this cycle.
fn fixed_slot(sensor: &mut impl FixedSensorPort, present: bool) -> SensorSlot {
    let class = sensor.class();
    if !present {
        return SensorSlot::absent(class);
    }
    match sensor.serial() {
        Ok(identity) => SensorSlot::connected(identity),
        Err(e) => {
            warn!("SENS | {:?} answered but serial read failed: {}", class, e);
            SensorSlot::absent(class)
        }
    }
}
