//! Simulated sensors and delay for the host build.
//!
//! Drives the host simulator binary and the test suite.  Each sim records
//! how it was used (conversions started, triggers, probes) so tests can
//! assert on the scheduling behaviour without real hardware.

use embedded_hal::delay::DelayNs;

use crate::app::ports::{BusSensorPort, FixedSensorPort};
use crate::error::SensorError;
use crate::identity::{SensorClass, SensorIdentity};

/// DS18B20 power-on resolution.
const POWER_ON_RESOLUTION: u8 = 12;

/// Quantise a temperature to the step of a `bits`-bit conversion.
fn quantise(celsius: f32, bits: u8) -> f32 {
    let step = match bits {
        0..=9 => 0.5,
        10 => 0.25,
        11 => 0.125,
        _ => 0.0625,
    };
    (celsius / step).round() * step
}

// ── Touch simulation ──────────────────────────────────────────

/// A temperature rise that kicks in after a number of reads, standing in
/// for an operator holding the sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Touch {
    pub after_reads: u32,
    pub rise_c: f32,
}

fn touched(base: f32, reads: u32, touch: Option<Touch>) -> f32 {
    match touch {
        Some(t) if reads > t.after_reads => base + t.rise_c,
        _ => base,
    }
}

// ── Bus ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SimProbe {
    pub identity: SensorIdentity,
    pub celsius: f32,
    /// Unplugged probes drop out of enumeration and fail reads.
    pub attached: bool,
    pub touch: Option<Touch>,
    pub reads: u32,
}

/// Simulated 1-Wire bus of DS18B20 probes.
#[derive(Debug, Clone)]
pub struct SimBus {
    pub probes: Vec<SimProbe>,
    /// Completion polls that report "busy" after each conversion request.
    pub polls_until_complete: u32,
    pub resolution: u8,
    /// Conversions requested so far.
    pub conversions: u32,
    pending_polls: u32,
}

impl Default for SimBus {
    fn default() -> Self {
        Self {
            probes: Vec::new(),
            polls_until_complete: 0,
            resolution: POWER_ON_RESOLUTION,
            conversions: 0,
            pending_polls: 0,
        }
    }
}

impl SimBus {
    /// Bus with one probe per `(id, celsius)` pair.  Identities are the
    /// single byte `id`, so they encode as two hex digits.
    pub fn with_probes(probes: &[(u8, f32)]) -> Self {
        let mut bus = Self::default();
        for (id, celsius) in probes {
            let identity = SensorIdentity::from_bytes(&[*id])
                .unwrap_or(SensorIdentity::zeroed(SensorClass::Bus));
            bus.attach(identity, *celsius);
        }
        bus
    }

    pub fn attach(&mut self, identity: SensorIdentity, celsius: f32) {
        self.probes.push(SimProbe {
            identity,
            celsius,
            attached: true,
            touch: None,
            reads: 0,
        });
    }

    pub fn probe_mut(&mut self, identity: &SensorIdentity) -> Option<&mut SimProbe> {
        self.probes.iter_mut().find(|p| p.identity == *identity)
    }

    fn attached(&self) -> impl Iterator<Item = &SimProbe> {
        self.probes.iter().filter(|p| p.attached)
    }
}

impl BusSensorPort for SimBus {
    fn device_count(&mut self) -> usize {
        self.attached().count()
    }

    fn address(&mut self, index: usize) -> Option<SensorIdentity> {
        self.attached().nth(index).map(|p| p.identity)
    }

    fn set_resolution(&mut self, bits: u8) {
        self.resolution = bits;
    }

    fn request_conversion(&mut self) {
        self.conversions += 1;
        self.pending_polls = self.polls_until_complete;
    }

    fn is_conversion_complete(&mut self) -> bool {
        if self.pending_polls == 0 {
            return true;
        }
        self.pending_polls -= 1;
        false
    }

    fn read_celsius(&mut self, identity: &SensorIdentity) -> Result<f32, SensorError> {
        let bits = self.resolution;
        let probe = self
            .probes
            .iter_mut()
            .find(|p| p.attached && p.identity == *identity)
            .ok_or(SensorError::Disconnected)?;
        probe.reads += 1;
        Ok(quantise(touched(probe.celsius, probe.reads, probe.touch), bits))
    }
}

// ── Fixed sensors ─────────────────────────────────────────────

/// Simulated HDC1080 or SHT4x.
#[derive(Debug, Clone)]
pub struct SimFixedSensor {
    pub class: SensorClass,
    pub serial: SensorIdentity,
    pub celsius: f32,
    pub present: bool,
    /// Probes that fail before the chip starts answering.
    pub fails_first_probes: u32,
    pub touch: Option<Touch>,
    pub probes: u32,
    pub triggers: u32,
    pub reads: u32,
}

impl SimFixedSensor {
    pub fn new(class: SensorClass, serial: &[u8], celsius: f32) -> Self {
        Self {
            class,
            serial: SensorIdentity::from_bytes(serial).unwrap_or(SensorIdentity::zeroed(class)),
            celsius,
            present: true,
            fails_first_probes: 0,
            touch: None,
            probes: 0,
            triggers: 0,
            reads: 0,
        }
    }

    /// A sensor that never answers.
    pub fn missing(class: SensorClass) -> Self {
        let mut sensor = Self::new(class, &[], 0.0);
        sensor.present = false;
        sensor
    }
}

impl FixedSensorPort for SimFixedSensor {
    fn class(&self) -> SensorClass {
        self.class
    }

    fn probe(&mut self) -> bool {
        self.probes += 1;
        if self.fails_first_probes > 0 {
            self.fails_first_probes -= 1;
            return false;
        }
        self.present
    }

    fn serial(&mut self) -> Result<SensorIdentity, SensorError> {
        if self.present {
            Ok(self.serial)
        } else {
            Err(SensorError::NotResponding)
        }
    }

    fn trigger_read(&mut self) {
        self.triggers += 1;
    }

    fn read_celsius(&mut self) -> Result<f32, SensorError> {
        if !self.present {
            return Err(SensorError::NotResponding);
        }
        self.reads += 1;
        Ok(touched(self.celsius, self.reads, self.touch))
    }
}

// ── Delay ─────────────────────────────────────────────────────

/// Delay that only accounts for time instead of sleeping.
#[derive(Debug, Default, Clone)]
pub struct SimDelay {
    elapsed_ns: u64,
}

impl SimDelay {
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ns / 1_000_000
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns += u64::from(ns);
    }
}
