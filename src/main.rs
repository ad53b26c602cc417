//! Thermonode host simulator: runs the temperature feature through
//! simulated wake cycles.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  SimBus · SimFixedSensor     NvsAdapter      RtcRegion      │
//! │  (sensors)                   (power-safe)    (sleep-safe)   │
//! │  ──────────────── Port Trait Boundary ─────────────────     │
//! │          TempFeature: begin → start → deliver → end         │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! After each wake the outgoing message is printed and a command is read:
//!
//! | Input          | Action                                         |
//! |----------------|------------------------------------------------|
//! | *(empty)*      | deep sleep, then wake                          |
//! | `{...}`        | apply as controller feedback, then sleep       |
//! | `setup`        | hand the console to the setup menu             |
//! | `state`        | dump cycle state and persistent config         |
//! | `power`        | cut power: RTC memory is lost, NVS survives    |
//! | `quit`         | exit                                           |

#[cfg(not(target_os = "espidf"))]
fn main() -> anyhow::Result<()> {
    sim::run()
}

#[cfg(target_os = "espidf")]
fn main() {
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
    log::error!("thermonode: host simulator binary; firmware links the library");
}

#[cfg(not(target_os = "espidf"))]
mod sim {
    use core::fmt::Write as _;

    use anyhow::{Context, Result};
    use log::{info, warn};

    use thermonode::adapters::console_io::StdConsole;
    use thermonode::adapters::nvs::NvsAdapter;
    use thermonode::adapters::rtc::{RtcCycleStore, RtcRegion};
    use thermonode::adapters::sim::{SimBus, SimDelay, SimFixedSensor};
    use thermonode::app::ports::ConsoleIo;
    use thermonode::config::FeatureConfig;
    use thermonode::identity::{SensorClass, SensorIdentity};
    use thermonode::protocol::Message;
    use thermonode::sensors::SensorBank;
    use thermonode::store::PersistentStore;
    use thermonode::{Feature, TempFeature};

    type Sensors = SensorBank<SimBus, SimFixedSensor, SimFixedSensor>;

    /// Board with three bus probes and both fixed sensors.  The SHT4x is
    /// slow to come up after power-on, so discovery has to retry it.
    fn board() -> Sensors {
        let mut bus = SimBus::default();
        bus.polls_until_complete = 3;
        bus.attach(SensorIdentity::rom([0x28, 0xff, 0x4c, 0x1e, 0x61, 0x16, 0x04, 0x3a]), 21.4);
        bus.attach(SensorIdentity::rom([0x28, 0xff, 0x9a, 0x02, 0x72, 0x16, 0x03, 0x5c]), 19.8);
        bus.attach(SensorIdentity::rom([0x28, 0x61, 0x64, 0x12, 0x3c, 0x7d, 0x2f, 0x91]), 22.1);

        let hdc = SimFixedSensor::new(SensorClass::Hdc1080, &[0x10, 0x80, 0x2b, 0x44, 0x91, 0x0e], 23.0);
        let mut sht = SimFixedSensor::new(SensorClass::Sht4x, &[0x0f, 0x3a, 0x52, 0xc1], 22.6);
        sht.fails_first_probes = 1;

        SensorBank::new(bus, hdc, sht)
    }

    pub fn run() -> Result<()> {
        env_logger::init();
        info!("Thermonode simulator v{}", env!("CARGO_PKG_VERSION"));

        let mut console = StdConsole;
        let mut sensors = board();
        let mut nvs = NvsAdapter::new().map_err(|e| anyhow::anyhow!("NVS init: {e}"))?;
        let mut rtc = RtcRegion::power_on();
        let mut wake: u32 = 0;

        loop {
            wake += 1;
            let config_store = PersistentStore::open(nvs)
                .map_err(|e| anyhow::anyhow!("config store: {e}"))?;
            let mut feature = TempFeature::new(
                sensors,
                config_store,
                RtcCycleStore::new(rtc),
                SimDelay::default(),
                FeatureConfig::default(),
            );

            feature.begin().context("begin")?;
            feature.start().context("start")?;
            info!(
                "wake {} ({})",
                wake,
                if feature.is_cold_boot() { "cold" } else { "warm" }
            );

            // Another feature got there first.
            let mut msg = Message::new();
            msg.insert("v".to_owned(), serde_json::json!(3.31));
            if let Err(e) = feature.deliver(&mut msg) {
                warn!("deliver failed: {}", e);
            }
            writeln!(console, "{}", serde_json::Value::Object(msg))?;

            let mut power_cut = false;
            let quit = loop {
                write!(console, "[enter=sleep | {{json}} | setup | state | power | quit] ")?;
                let Some(line) = console.read_line() else {
                    break true;
                };
                let line = line.trim();
                match line {
                    "" => break false,
                    "quit" => break true,
                    "setup" => feature.setup_handover(&mut console)?,
                    "state" => {
                        feature.print_cycle_state(&mut console)?;
                        feature.print_persistent(&mut console)?;
                    }
                    "power" => {
                        power_cut = true;
                        break false;
                    }
                    json if json.starts_with('{') => {
                        match serde_json::from_str::<Message>(json) {
                            Ok(reply) => {
                                if let Err(e) = feature.feedback(&reply) {
                                    warn!("feedback failed: {}", e);
                                }
                                break false;
                            }
                            Err(e) => writeln!(console, "bad JSON: {}", e)?,
                        }
                    }
                    other => writeln!(console, "unknown command '{}'", other)?,
                }
            };

            feature.end().context("end")?;
            let (bank, config_store, cycle_store, _) = feature.into_parts();
            sensors = bank;
            nvs = config_store.into_backend();
            rtc = cycle_store.into_region();

            if quit {
                return Ok(());
            }
            if power_cut {
                info!("power lost");
                rtc.simulate_power_loss();
                sensors = board();
            }
        }
    }
}
