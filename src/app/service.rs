//! Temperature feature: the hexagonal core.
//!
//! [`TempFeature`] owns the sensor bank, both persistence tiers and the
//! cycle state.  Everything it touches is injected at construction, so the
//! whole wake cycle runs against simulated sensors and in-memory stores in
//! tests.
//!
//! ```text
//!  SensorBank ──▶ ┌──────────────────────────┐ ──▶ Message (t, c, p)
//!                 │        TempFeature        │
//!  ConfigStore ◀─▶│ discover · resolve · codec│◀── Message (p, r)
//!  CycleStore  ◀─▶└──────────────────────────┘
//! ```

use core::fmt::{self, Write as _};

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::calibration;
use crate::config::FeatureConfig;
use crate::error::{Error, Result};
use crate::identity::SensorClass;
use crate::protocol::{self, Message};
use crate::sensors::SensorBank;
use crate::store::{CalibratedSlot, CycleState};

use super::commands::{Directive, RequestCode};
use super::feature::Feature;
use super::ports::{
    BusSensorPort, ConfigStorePort, ConsoleIo, CycleStorePort, FixedSensorPort,
};

pub const FEATURE_NAME: &str = "temp";
pub const FEATURE_VERSION: u32 = 1;

/// Connected sensors that are reported this wake, in wire order.  A fixed
/// sensor needs both its cold-boot slot and live presence.
pub(crate) fn reportable(
    state: &CycleState,
    (hdc1080, sht4x): (bool, bool),
) -> impl Iterator<Item = (SensorClass, &CalibratedSlot)> {
    state.connected().filter(move |(class, _)| match class {
        SensorClass::Bus => true,
        SensorClass::Hdc1080 => hdc1080,
        SensorClass::Sht4x => sht4x,
    })
}

// ───────────────────────────────────────────────────────────────
// TempFeature
// ───────────────────────────────────────────────────────────────

/// The temperature feature.
pub struct TempFeature<B, H, S, C, V, D> {
    pub(crate) sensors: SensorBank<B, H, S>,
    pub(crate) config_store: C,
    pub(crate) cycle_store: V,
    pub(crate) delay: D,
    pub(crate) tunables: FeatureConfig,
    pub(crate) state: CycleState,
    cold_boot: bool,
    begun: bool,
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
    /// Wire up the feature.  Nothing touches hardware or storage until
    /// [`begin`](Feature::begin).
    pub fn new(
        sensors: SensorBank<B, H, S>,
        config_store: C,
        cycle_store: V,
        delay: D,
        tunables: FeatureConfig,
    ) -> Self {
        let state = CycleState::empty(tunables.default_precision);
        Self {
            sensors,
            config_store,
            cycle_store,
            delay,
            tunables,
            state,
            cold_boot: true,
            begun: false,
        }
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn state(&self) -> &CycleState {
        &self.state
    }

    /// Whether this wake had to rediscover the sensors.
    pub fn is_cold_boot(&self) -> bool {
        self.cold_boot
    }

    pub fn sensors(&self) -> &SensorBank<B, H, S> {
        &self.sensors
    }

    pub fn sensors_mut(&mut self) -> &mut SensorBank<B, H, S> {
        &mut self.sensors
    }

    pub fn config_store(&self) -> &C {
        &self.config_store
    }

    pub fn cycle_store(&self) -> &V {
        &self.cycle_store
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }

    /// Take the feature apart, e.g. to carry the stores into the next
    /// simulated wake.
    pub fn into_parts(self) -> (SensorBank<B, H, S>, C, V, D) {
        (self.sensors, self.config_store, self.cycle_store, self.delay)
    }

    /// Drop the cycle store.  The feature refuses further work until
    /// [`begin`](Feature::begin) has rediscovered the sensors.
    pub fn invalidate_cycle_state(&mut self) {
        self.cycle_store.invalidate();
        self.begun = false;
        info!("TEMP | cycle state invalidated, rediscovery required");
    }

    // ── Internals ─────────────────────────────────────────────

    pub(crate) fn ensure_begun(&self) -> Result<()> {
        if self.begun {
            Ok(())
        } else {
            Err(Error::Init("temperature feature used before begin"))
        }
    }

    /// Write the cycle state through to the cycle store.
    pub(crate) fn commit_cycle(&mut self) -> Result<()> {
        self.cycle_store.save(&self.state).map_err(|e| {
            warn!("TEMP | cycle store write failed: {}", e);
            Error::from(e)
        })
    }

    /// Persist a new precision and apply it to the live state and sensors.
    /// Nothing changes if persisting fails.
    pub(crate) fn change_precision(&mut self, bits: u8) -> Result<()> {
        self.config_store.set_precision(bits)?;
        self.state.precision = bits;
        self.sensors.apply_precision(bits);
        info!("TEMP | precision -> {} bit", bits);
        Ok(())
    }

    /// Act on one decoded feedback directive.  Does not commit.
    pub fn apply(&mut self, directive: Directive) -> Result<()> {
        match directive {
            Directive::SetPrecision(bits) => self.change_precision(bits),
            Directive::Request(RequestCode::Precision) => {
                self.state.precision_requested = true;
                Ok(())
            }
            Directive::Request(RequestCode::Corrections) => {
                self.state.corrections_requested = true;
                Ok(())
            }
        }
    }

    fn warm_begin(&mut self, state: CycleState) {
        self.state = state;
        let (hdc, sht) = self.sensors.probe_fixed();
        let hdc = hdc && self.state.hdc1080.is_connected();
        let sht = sht && self.state.sht4x.is_connected();
        self.sensors.set_fixed_presence(hdc, sht);
        debug!(
            "TEMP | warm wake: {} bus sensor(s), hdc={} sht={}",
            self.state.sensor_count(),
            hdc,
            sht
        );
    }

    fn cold_begin(&mut self) -> Result<()> {
        let discovery = self
            .sensors
            .discover(&mut self.delay, self.tunables.probe_retry_delay_ms);
        self.state = calibration::resolve(
            &discovery,
            self.config_store.config(),
            self.tunables.default_precision,
        );
        info!(
            "TEMP | cold boot: {} bus sensor(s) at {} bit",
            self.state.sensor_count(),
            self.state.precision
        );
        self.commit_cycle()
    }
}

impl<B, H, S, C, V, D> Feature for TempFeature<B, H, S, C, V, D>
where
    B: BusSensorPort,
    H: FixedSensorPort,
    S: FixedSensorPort,
    C: ConfigStorePort,
    V: CycleStorePort,
    D: DelayNs,
{
    fn name(&self) -> &'static str {
        FEATURE_NAME
    }

    fn version(&self) -> u32 {
        FEATURE_VERSION
    }

    fn begin(&mut self) -> Result<()> {
        if self.config_store.precision().is_none() {
            info!(
                "TEMP | no stored precision, defaulting to {} bit",
                self.tunables.default_precision
            );
            self.config_store
                .set_precision(self.tunables.default_precision)?;
        }

        let retained = if self.cycle_store.is_valid() {
            self.cycle_store.load()
        } else {
            None
        };
        self.cold_boot = retained.is_none();
        match retained {
            Some(state) => self.warm_begin(state),
            None => self.cold_begin()?,
        }
        self.begun = true;
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        self.ensure_begun()?;
        if self.cold_boot {
            // First conversion after a resolution change is discarded.
            self.sensors.apply_precision(self.state.precision);
            if let Err(e) = self.sensors.wait_ready(
                &mut self.delay,
                self.tunables.conversion_timeout_ms,
                self.tunables.conversion_poll_ms,
            ) {
                warn!("TEMP | settling conversion failed: {}", e);
            }
        }
        self.sensors.begin_conversion();
        Ok(())
    }

    fn deliver(&mut self, msg: &mut Message) -> Result<()> {
        self.ensure_begun()?;
        let presence = self.sensors.fixed_presence();
        let mut flags_consumed = false;

        if self.state.precision_requested {
            protocol::put_precision(msg, self.state.precision);
            self.state.precision_requested = false;
            flags_consumed = true;
        }

        if self.state.corrections_requested {
            let table = reportable(&self.state, presence)
                .map(|(_, s)| protocol::entry(&s.slot.identity, s.offset))
                .collect();
            protocol::append_entries(msg, protocol::KEY_CORRECTIONS, table);
            self.state.corrections_requested = false;
            flags_consumed = true;
        }

        let committed = if flags_consumed {
            self.commit_cycle()
        } else {
            Ok(())
        };

        let waited = self.sensors.wait_ready(
            &mut self.delay,
            self.tunables.conversion_timeout_ms,
            self.tunables.conversion_poll_ms,
        )?;
        debug!("TEMP | conversion ready after {} ms", waited);

        let mut readings = Vec::new();
        for (class, slot) in reportable(&self.state, presence) {
            let identity = slot.slot.identity;
            match self.sensors.read_raw(class, &identity) {
                Ok(raw) => readings.push(protocol::entry(&identity, raw + slot.offset)),
                Err(e) => warn!("TEMP | {} unreadable, not reported: {}", identity, e),
            }
        }
        protocol::append_entries(msg, protocol::KEY_TEMPERATURES, readings);

        committed
    }

    fn feedback(&mut self, msg: &Message) -> Result<()> {
        self.ensure_begun()?;
        let directives = protocol::decode_feedback(msg);
        if directives.is_empty() {
            return Ok(());
        }

        let mut first_err = None;
        for directive in directives {
            if let Err(e) = self.apply(directive) {
                warn!("TEMP | {:?} failed: {}", directive, e);
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
        let committed = self.commit_cycle();
        match first_err {
            Some(e) => Err(e),
            None => committed,
        }
    }

    fn end(&mut self) -> Result<()> {
        if !self.begun {
            return Ok(());
        }
        self.commit_cycle()
    }

    fn print_cycle_state(&self, out: &mut dyn ConsoleIo) -> fmt::Result {
        let yes_no = |b: bool| if b { "yes" } else { "no" };
        writeln!(out, "Temperature cycle state")?;
        writeln!(out, "  precision requested:   {}", yes_no(self.state.precision_requested))?;
        writeln!(out, "  corrections requested: {}", yes_no(self.state.corrections_requested))?;
        writeln!(out, "  precision:             {} bit", self.state.precision)?;
        writeln!(out, "  bus sensors:           {}", self.state.sensor_count())?;
        for (i, s) in self.state.bus.iter().enumerate() {
            writeln!(out, "    [{}] {} offset {:.4}", i, s.slot.identity, s.offset)?;
        }
        for (name, s) in [("hdc1080", &self.state.hdc1080), ("sht4x", &self.state.sht4x)] {
            if s.is_connected() {
                writeln!(out, "  {}: {} offset {:.4}", name, s.slot.identity, s.offset)?;
            } else {
                writeln!(out, "  {}: absent", name)?;
            }
        }
        Ok(())
    }

    fn print_persistent(&self, out: &mut dyn ConsoleIo) -> fmt::Result {
        let cfg = self.config_store.config();
        writeln!(out, "Temperature persistent config")?;
        match cfg.default_precision {
            Some(p) => writeln!(out, "  default precision: {} bit", p)?,
            None => writeln!(out, "  default precision: unset")?,
        }
        writeln!(out, "  stored corrections: {}", cfg.offsets.len())?;
        for (key, offset) in &cfg.offsets {
            writeln!(out, "    {} {:.4}", key, offset)?;
        }
        Ok(())
    }

    fn setup_handover(&mut self, console: &mut dyn ConsoleIo) -> fmt::Result {
        self.run_menu(console)
    }
}
