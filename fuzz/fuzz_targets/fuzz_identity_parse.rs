//! Fuzz target: sensor identity parsing
//!
//! Feeds arbitrary UTF-8 to `SensorIdentity::parse` and verifies:
//! - No panics on any input
//! - Anything accepted re-encodes to a key that parses to the same identity
//!
//! cargo fuzz run fuzz_identity_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use thermonode::identity::SensorIdentity;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = core::str::from_utf8(data) else {
        return;
    };
    if let Ok(id) = SensorIdentity::parse(s) {
        let key = id.key();
        assert_eq!(SensorIdentity::parse(&key), Ok(id));
        assert_eq!(key.len(), id.as_bytes().len() * 2);
    }
});
