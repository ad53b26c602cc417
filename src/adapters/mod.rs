//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter      | Implements               | Connects to                 |
//! |--------------|--------------------------|-----------------------------|
//! | `nvs`        | StoragePort              | NVS / in-memory store       |
//! | `rtc`        | CycleStorePort           | RTC slow memory / host heap |
//! | `sim`        | BusSensorPort            | simulated DS18B20 bus       |
//! |              | FixedSensorPort          | simulated HDC1080 / SHT4x   |
//! | `console_io` | ConsoleIo                | stdin / stdout, scripts     |

pub mod console_io;
pub mod nvs;
pub mod rtc;
#[cfg(not(target_os = "espidf"))]
pub mod sim;
