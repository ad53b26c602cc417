//! Inbound directives to the temperature feature.
//!
//! These represent actions the remote controller asks for in a feedback
//! message.  [`protocol::decode_feedback`](crate::protocol::decode_feedback)
//! produces them; [`TempFeature`](super::service::TempFeature) acts on them.

/// Request codes carried in the `r` array of a feedback message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RequestCode {
    /// Send the correction table with the next delivery.
    Corrections = 4,
    /// Send the live precision with the next delivery.
    Precision = 6,
}

impl RequestCode {
    /// Map a wire code to a request.  Unknown codes are `None`.
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            4 => Some(Self::Corrections),
            6 => Some(Self::Precision),
            _ => None,
        }
    }
}

/// Directives the controller can send to the feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Persist and apply a new sensor resolution (already range-checked).
    SetPrecision(u8),

    /// Arm a one-shot flag for the next delivery.
    Request(RequestCode),
}
