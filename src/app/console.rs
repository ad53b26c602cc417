//! Interactive calibration console.
//!
//! Operator-driven operations on a running [`TempFeature`]: find a sensor by
//! warming it, read it, and edit the default precision and corrections.
//! Corrections are keyed by [`SensorIdentity::key`], the same string the
//! wire protocol sends, so a value set here comes back verbatim in `c`.
//!
//! The operations return [`Result`] and never print; [`run_menu`] wraps
//! them in the line-based menu and reports failures to the operator.
//!
//! [`run_menu`]: TempFeature::run_menu

use core::fmt::{self, Write as _};

use embedded_hal::delay::DelayNs;
use log::info;

use super::ports::{BusSensorPort, ConfigStorePort, ConsoleIo, CycleStorePort, FixedSensorPort};
use super::service::{TempFeature, reportable};
use crate::config::CONSOLE_PRECISION_RANGE;
use crate::error::{Error, Result};
use crate::identity::{SensorClass, SensorIdentity};

/// One sensor read through the console.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub class: SensorClass,
    pub identity: SensorIdentity,
    pub raw: core::result::Result<f32, Error>,
    pub offset: f32,
}

impl Reading {
    pub fn corrected(&self) -> core::result::Result<f32, Error> {
        self.raw.map(|r| r + self.offset)
    }
}

/// Where a console correction landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionScope {
    /// Stored, and applied to a sensor connected right now.
    Live,
    /// Stored only; picked up when that sensor is next discovered.
    StoredOnly,
}

/// Menu entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Identify,
    ReadRaw,
    ReadCorrected,
    SetPrecision,
    SetCorrection,
    DeleteCorrection,
    Return,
}

impl MenuChoice {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "1" => Some(Self::Identify),
            "2" => Some(Self::ReadRaw),
            "3" => Some(Self::ReadCorrected),
            "4" => Some(Self::SetPrecision),
            "5" => Some(Self::SetCorrection),
            "6" => Some(Self::DeleteCorrection),
            "9" => Some(Self::Return),
            _ => None,
        }
    }
}

const MENU: &str = "\
Temperature setup
  1) Identify sensor by touch
  2) Read raw temperatures
  3) Read corrected temperatures
  4) Set default precision
  5) Set correction
  6) Delete correction
  9) Return
> ";

fn parse_identity(input: &str) -> Result<SensorIdentity> {
    SensorIdentity::parse(input).map_err(|_| Error::InvalidInput("malformed sensor identity"))
}

impl<B, H, S, C, V, D> TempFeature<B, H, S, C, V, D>
where
    B: BusSensorPort,
    H: FixedSensorPort,
    S: FixedSensorPort,
    C: ConfigStorePort,
    V: CycleStorePort,
    D: DelayNs,
{
    // ── Operations ────────────────────────────────────────────

    /// Run a blocking conversion and read every reported sensor.
    pub fn read_sensors(&mut self) -> Result<Vec<Reading>> {
        self.ensure_begun()?;
        self.sensors.convert_fresh(
            &mut self.delay,
            self.tunables.conversion_timeout_ms,
            self.tunables.conversion_poll_ms,
        )?;
        let presence = self.sensors.fixed_presence();
        let mut out = Vec::new();
        for (class, slot) in reportable(&self.state, presence) {
            let identity = slot.slot.identity;
            out.push(Reading {
                class,
                identity,
                raw: self.sensors.read_raw(class, &identity),
                offset: slot.offset,
            });
        }
        Ok(out)
    }

    /// Take a baseline, then poll until one sensor warms by the configured
    /// threshold.  `None` if nothing rose within the round limit.
    pub fn identify_touched(&mut self) -> Result<Option<(SensorClass, SensorIdentity)>> {
        let baseline = self.read_sensors()?;
        self.watch_for_touch(&baseline)
    }

    /// Poll against an earlier `baseline`.  Sensors are checked in wire
    /// order and the first one over the threshold wins.
    pub fn watch_for_touch(
        &mut self,
        baseline: &[Reading],
    ) -> Result<Option<(SensorClass, SensorIdentity)>> {
        let threshold = self.tunables.identify_threshold_c;

        for round in 0..self.tunables.identify_rounds {
            self.delay.delay_ms(self.tunables.identify_interval_ms);
            let now = self.read_sensors()?;
            for reading in &now {
                let Ok(current) = reading.raw else { continue };
                let base = baseline
                    .iter()
                    .find(|b| b.identity == reading.identity)
                    .and_then(|b| b.raw.ok());
                if let Some(base) = base {
                    if current - base >= threshold {
                        info!("TEMP | identified {} in round {}", reading.identity, round + 1);
                        return Ok(Some((reading.class, reading.identity)));
                    }
                }
            }
        }
        Ok(None)
    }

    /// Persist a new default precision and apply it now.  Accepts 8..=12.
    pub fn set_default_precision(&mut self, bits: u8) -> Result<()> {
        self.ensure_begun()?;
        if !CONSOLE_PRECISION_RANGE.contains(&bits) {
            return Err(Error::InvalidInput("precision must be 8..=12 bit"));
        }
        self.change_precision(bits)?;
        self.commit_cycle()
    }

    /// Store a correction for `identity` and apply it to the live sensor if
    /// one with that identity is connected.
    pub fn set_correction(&mut self, identity: &str, offset: f32) -> Result<CorrectionScope> {
        self.ensure_begun()?;
        let id = parse_identity(identity)?;
        if !offset.is_finite() {
            return Err(Error::InvalidInput("correction must be a finite number"));
        }
        self.config_store.set_offset(&id.key(), offset)?;
        let live = if let Some(slot) = self.state.find_mut(&id) {
            slot.offset = offset;
            true
        } else {
            false
        };
        if live {
            self.commit_cycle()?;
            info!("TEMP | correction {} = {}", id, offset);
            Ok(CorrectionScope::Live)
        } else {
            info!("TEMP | correction {} = {} stored for later", id, offset);
            Ok(CorrectionScope::StoredOnly)
        }
    }

    /// Remove the stored correction for `identity` and zero the live one.
    /// Returns whether there was anything to remove.
    pub fn delete_correction(&mut self, identity: &str) -> Result<bool> {
        self.ensure_begun()?;
        let id = parse_identity(identity)?;
        let stored = self.config_store.remove_offset(&id.key())?;
        let live = if let Some(slot) = self.state.find_mut(&id) {
            slot.offset = 0.0;
            true
        } else {
            false
        };
        if live {
            self.commit_cycle()?;
        }
        Ok(stored || live)
    }

    // ── Menu ──────────────────────────────────────────────────

    /// Serve the setup menu until the operator picks "return" or input
    /// ends.  Only console I/O failures end the menu early.
    pub fn run_menu(&mut self, con: &mut dyn ConsoleIo) -> fmt::Result {
        loop {
            con.write_str(MENU)?;
            let Some(line) = con.read_line() else {
                return Ok(());
            };
            match MenuChoice::parse(&line) {
                Some(MenuChoice::Return) => return Ok(()),
                Some(choice) => self.menu_action(choice, con)?,
                None => writeln!(con, "Invalid choice '{}'", line.trim())?,
            }
        }
    }

    fn menu_action(&mut self, choice: MenuChoice, con: &mut dyn ConsoleIo) -> fmt::Result {
        match choice {
            MenuChoice::Identify => {
                let baseline = match self.read_sensors() {
                    Ok(readings) => readings,
                    Err(e) => return writeln!(con, "Error: {}", e),
                };
                write!(con, "Hit <enter> to start identification, then hold the sensor ")?;
                if con.read_line().is_none() {
                    return Ok(());
                }
                writeln!(con, "Watching...")?;
                match self.watch_for_touch(&baseline) {
                    Ok(Some((class, id))) => writeln!(con, "Touched: {} ({:?})", id, class),
                    Ok(None) => writeln!(con, "No sensor warmed up"),
                    Err(e) => writeln!(con, "Error: {}", e),
                }
            }
            MenuChoice::ReadRaw | MenuChoice::ReadCorrected => {
                let corrected = choice == MenuChoice::ReadCorrected;
                match self.read_sensors() {
                    Ok(readings) if readings.is_empty() => writeln!(con, "No sensors connected"),
                    Ok(readings) => {
                        for r in readings {
                            let value = if corrected { r.corrected() } else { r.raw };
                            match value {
                                Ok(c) => writeln!(con, "  {} ({:?}): {:.4} C", r.identity, r.class, c)?,
                                Err(e) => writeln!(con, "  {} ({:?}): {}", r.identity, r.class, e)?,
                            }
                        }
                        Ok(())
                    }
                    Err(e) => writeln!(con, "Error: {}", e),
                }
            }
            MenuChoice::SetPrecision => {
                write!(con, "Precision (8-12): ")?;
                let Some(line) = con.read_line() else {
                    return Ok(());
                };
                let result = line
                    .trim()
                    .parse::<u8>()
                    .map_err(|_| Error::InvalidInput("precision must be a number"))
                    .and_then(|bits| self.set_default_precision(bits).map(|()| bits));
                match result {
                    Ok(bits) => writeln!(con, "Precision set to {} bit", bits),
                    Err(e) => writeln!(con, "Error: {}", e),
                }
            }
            MenuChoice::SetCorrection => {
                write!(con, "Sensor identity: ")?;
                let Some(id) = con.read_line() else {
                    return Ok(());
                };
                write!(con, "Correction (C): ")?;
                let Some(value) = con.read_line() else {
                    return Ok(());
                };
                let result = value
                    .trim()
                    .parse::<f32>()
                    .map_err(|_| Error::InvalidInput("correction must be a number"))
                    .and_then(|offset| self.set_correction(&id, offset));
                match result {
                    Ok(CorrectionScope::Live) => writeln!(con, "Correction applied"),
                    Ok(CorrectionScope::StoredOnly) => {
                        writeln!(con, "Sensor not connected; correction stored for later")
                    }
                    Err(e) => writeln!(con, "Error: {}", e),
                }
            }
            MenuChoice::DeleteCorrection => {
                write!(con, "Sensor identity: ")?;
                let Some(id) = con.read_line() else {
                    return Ok(());
                };
                match self.delete_correction(&id) {
                    Ok(true) => writeln!(con, "Correction deleted"),
                    Ok(false) => writeln!(con, "No correction stored"),
                    Err(e) => writeln!(con, "Error: {}", e),
                }
            }
            MenuChoice::Return => Ok(()),
        }
    }
}
