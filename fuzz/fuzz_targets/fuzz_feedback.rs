//! Fuzz target: controller feedback decoding
//!
//! Parses arbitrary bytes as a JSON object and decodes it as feedback,
//! verifying:
//! - No panics on any input
//! - Only precisions in 9..=12 are ever accepted
//!
//! cargo fuzz run fuzz_feedback

#![no_main]

use libfuzzer_sys::fuzz_target;
use thermonode::app::commands::Directive;
use thermonode::protocol::{Message, decode_feedback};

fuzz_target!(|data: &[u8]| {
    let Ok(msg) = serde_json::from_slice::<Message>(data) else {
        return;
    };
    for directive in decode_feedback(&msg) {
        if let Directive::SetPrecision(bits) = directive {
            assert!((9..=12).contains(&bits), "accepted precision {bits}");
        }
    }
});
