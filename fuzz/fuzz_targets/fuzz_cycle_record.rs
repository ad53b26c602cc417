//! Fuzz target: retained cycle record
//!
//! Writes arbitrary bytes over the RTC region (as after a brown-out) and
//! verifies:
//! - Opening the cycle store never panics
//! - A region that fails validation never yields a state
//!
//! cargo fuzz run fuzz_cycle_record

#![no_main]

use libfuzzer_sys::fuzz_target;
use thermonode::adapters::rtc::{RtcCycleStore, RtcRegion};
use thermonode::app::ports::CycleStorePort;

fuzz_target!(|data: &[u8]| {
    let mut region = RtcRegion::power_on();
    region.overwrite(data);
    let store = RtcCycleStore::new(region);
    let state = store.load();
    if !store.is_valid() {
        assert!(state.is_none());
    }
});
