//! Controller message codec.
//!
//! The outgoing message is a key-value document shared by every feature on
//! the node, so this module only ever *adds* to it: array keys are appended
//! to, never replaced.  Inbound messages are decoded into [`Directive`]s;
//! anything missing, mistyped or out of range is dropped.
//!
//! | Key | Dir | Shape                         | Meaning              |
//! |-----|-----|-------------------------------|----------------------|
//! | `p` | out | int                           | live precision       |
//! | `c` | out | `[[id, offset], ...]`         | correction table     |
//! | `t` | out | `[[id, celsius], ...]`        | corrected readings   |
//! | `p` | in  | int in 9..=12                 | new precision        |
//! | `r` | in  | `[code, ...]`                 | one-shot requests    |

use log::{debug, warn};
use serde_json::{Number, Value};

use crate::app::commands::{Directive, RequestCode};
use crate::config::PRECISION_RANGE;
use crate::identity::SensorIdentity;

/// Shared controller message.
pub type Message = serde_json::Map<String, Value>;

pub const KEY_PRECISION: &str = "p";
pub const KEY_CORRECTIONS: &str = "c";
pub const KEY_TEMPERATURES: &str = "t";
pub const KEY_REQUESTS: &str = "r";

/// Decimal places kept for numbers on the wire.
const WIRE_DECIMALS: i32 = 4;

/// JSON number for a sensor value.  `f32` widened to `f64` carries float
/// noise (`0.1` becomes `0.10000000149`), so values are rounded first.
/// Non-finite values become `null`.
pub fn wire_number(value: f32) -> Value {
    let scale = 10f64.powi(WIRE_DECIMALS);
    let rounded = (f64::from(value) * scale).round() / scale;
    Number::from_f64(rounded).map_or(Value::Null, Value::Number)
}

/// One `[id, value]` pair.
pub fn entry(identity: &SensorIdentity, value: f32) -> Value {
    Value::Array(vec![
        Value::String(identity.key().as_str().to_owned()),
        wire_number(value),
    ])
}

/// Write the precision under `p`.
pub fn put_precision(msg: &mut Message, bits: u8) {
    msg.insert(KEY_PRECISION.to_owned(), Value::from(bits));
}

/// Append `entries` to the array under `key`, creating it if needed.
///
/// Returns `false` (and leaves the message alone) if another contributor
/// already put something that is not an array under `key`.
pub fn append_entries(msg: &mut Message, key: &str, entries: Vec<Value>) -> bool {
    match msg.get_mut(key) {
        Some(Value::Array(existing)) => {
            existing.extend(entries);
            true
        }
        Some(other) => {
            warn!("TEMP | key '{}' already holds {}, not appending", key, kind(other));
            false
        }
        None => {
            msg.insert(key.to_owned(), Value::Array(entries));
            true
        }
    }
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Non-negative whole number, whether the sender encoded it as an integer
/// or as a float with no fractional part (`10.0`).
fn whole_number(v: &Value) -> Option<u64> {
    if let Some(n) = v.as_u64() {
        return Some(n);
    }
    let f = v.as_f64()?;
    (f.is_finite() && f.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&f))
        .then_some(f as u64)
}

/// Decode a feedback message.
///
/// `p` is accepted only as a whole number in 9..=12.  `r` must be an array;
/// unknown codes inside it are skipped.  Every other key is ignored.
pub fn decode_feedback(msg: &Message) -> Vec<Directive> {
    let mut out = Vec::new();

    if let Some(p) = msg.get(KEY_PRECISION) {
        match whole_number(p).and_then(|v| u8::try_from(v).ok()) {
            Some(bits) if PRECISION_RANGE.contains(&bits) => {
                out.push(Directive::SetPrecision(bits));
            }
            _ => debug!("TEMP | ignoring precision {}", p),
        }
    }

    match msg.get(KEY_REQUESTS) {
        Some(Value::Array(codes)) => {
            for code in codes {
                match whole_number(code).and_then(RequestCode::from_code) {
                    Some(req) => out.push(Directive::Request(req)),
                    None => debug!("TEMP | ignoring request code {}", code),
                }
            }
        }
        Some(other) => debug!("TEMP | ignoring request field {}", other),
        None => {}
    }

    out
}
