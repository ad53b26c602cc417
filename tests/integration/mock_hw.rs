//! Simulated node for integration tests.
//!
//! A [`Board`] is everything that outlives one wake cycle: the sensors, the
//! flash partition and the RTC region.  [`Board::wake`] builds a feature on
//! top of it; [`Board::sleep`] takes it apart again, exactly as the
//! firmware's wake loop does around deep sleep.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::Value;

use thermonode::adapters::nvs::NvsAdapter;
use thermonode::adapters::rtc::{RtcCycleStore, RtcRegion};
use thermonode::adapters::sim::{SimBus, SimDelay, SimFixedSensor};
use thermonode::app::ports::{ConfigError, ConfigStorePort, StorageError, StoragePort};
use thermonode::config::FeatureConfig;
use thermonode::identity::{SensorClass, SensorIdentity};
use thermonode::protocol::Message;
use thermonode::sensors::SensorBank;
use thermonode::store::PersistentStore;
use thermonode::{Feature, TempFeature};

pub type Sensors = SensorBank<SimBus, SimFixedSensor, SimFixedSensor>;

pub type Node = TempFeature<
    SimBus,
    SimFixedSensor,
    SimFixedSensor,
    PersistentStore<FlakyStorage>,
    RtcCycleStore,
    SimDelay,
>;

// ── FlakyStorage ──────────────────────────────────────────────

/// NVS that can be told to refuse reads or writes.  Clones share the same
/// flash contents, so a test can keep a handle on the partition while the
/// feature owns another.
#[derive(Clone)]
pub struct FlakyStorage {
    inner: Rc<RefCell<NvsAdapter>>,
    pub fail_writes: bool,
    /// Number of upcoming reads that fail with an I/O error.
    pub fail_reads: Rc<Cell<u32>>,
}

impl FlakyStorage {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(NvsAdapter::new().unwrap())),
            fail_writes: false,
            fail_reads: Rc::new(Cell::new(0)),
        }
    }
}

impl StoragePort for FlakyStorage {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let pending = self.fail_reads.get();
        if pending > 0 {
            self.fail_reads.set(pending - 1);
            return Err(StorageError::IoError);
        }
        self.inner.borrow().read(namespace, key, buf)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::IoError);
        }
        self.inner.borrow_mut().write(namespace, key, data)
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.inner.borrow_mut().delete(namespace, key)
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.inner.borrow().exists(namespace, key)
    }
}

// ── Board ─────────────────────────────────────────────────────

pub struct Board {
    pub sensors: Sensors,
    pub storage: FlakyStorage,
    pub rtc: RtcRegion,
}

#[allow(dead_code)]
impl Board {
    pub fn new(sensors: Sensors) -> Self {
        Self {
            sensors,
            storage: FlakyStorage::new(),
            rtc: RtcRegion::power_on(),
        }
    }

    /// Bus probes `a1` at 20.0 and `a2` at 21.0; neither fixed sensor fitted.
    pub fn two_probes() -> Self {
        Self::new(SensorBank::new(
            SimBus::with_probes(&[(0xa1, 20.0), (0xa2, 21.0)]),
            SimFixedSensor::missing(SensorClass::Hdc1080),
            SimFixedSensor::missing(SensorClass::Sht4x),
        ))
    }

    /// Two bus probes plus both fixed sensors.
    pub fn full() -> Self {
        Self::new(SensorBank::new(
            SimBus::with_probes(&[(0xa1, 20.0), (0xa2, 21.0)]),
            SimFixedSensor::new(SensorClass::Hdc1080, &[0x10, 0x80, 0, 0, 0, 1], 23.0),
            SimFixedSensor::new(SensorClass::Sht4x, &[0xde, 0xad, 0xbe, 0xef], 22.5),
        ))
    }

    /// Pre-load a stored correction, as if set in an earlier session.
    pub fn with_offset(mut self, key: &str, offset: f32) -> Self {
        let mut store = PersistentStore::open(self.storage).unwrap();
        store.set_offset(key, offset).unwrap();
        self.storage = store.into_backend();
        self
    }

    /// Build the feature without calling `begin`.  Fails if the config
    /// store cannot be loaded.
    pub fn try_boot(self) -> Result<Node, ConfigError> {
        Ok(TempFeature::new(
            self.sensors,
            PersistentStore::open(self.storage)?,
            RtcCycleStore::new(self.rtc),
            SimDelay::default(),
            FeatureConfig::default(),
        ))
    }

    pub fn boot(self) -> Node {
        self.try_boot().unwrap()
    }

    /// Boot, `begin` and `start`.
    pub fn wake(self) -> Node {
        let mut node = self.boot();
        node.begin().unwrap();
        node.start().unwrap();
        node
    }

    /// `end` the wake and keep what survives deep sleep.
    pub fn sleep(mut node: Node) -> Self {
        node.end().unwrap();
        let (sensors, config_store, cycle_store, _) = node.into_parts();
        Self {
            sensors,
            storage: config_store.into_backend(),
            rtc: cycle_store.into_region(),
        }
    }

    /// Lose power: RTC memory is gone, flash is not.
    pub fn power_cycle(mut self) -> Self {
        self.rtc.simulate_power_loss();
        self
    }
}

// ── Message helpers ───────────────────────────────────────────

pub fn msg(v: Value) -> Message {
    match v {
        Value::Object(m) => m,
        other => panic!("expected a JSON object, got {other}"),
    }
}

#[allow(dead_code)]
pub fn deliver(node: &mut Node) -> Message {
    let mut out = Message::new();
    node.deliver(&mut out).unwrap();
    out
}

#[allow(dead_code)]
pub fn id(byte: u8) -> SensorIdentity {
    SensorIdentity::from_bytes(&[byte]).unwrap()
}
