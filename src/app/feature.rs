//! Feature capability interface.
//!
//! A node runs several independent features (temperature, humidity,
//! battery, ...) side by side.  The node's wake loop drives each one
//! through this trait and never needs to know which feature it is
//! talking to:
//!
//! ```text
//!  boot ─▶ begin ─▶ start ─▶ deliver(msg) ─▶ feedback(reply) ─▶ end ─▶ sleep
//!                                  ▲                │
//!                                  └── next wake ───┘
//! ```

use core::fmt;

use super::ports::ConsoleIo;
use crate::error::Result;
use crate::protocol::Message;

pub trait Feature {
    /// Short name, also used as the persistent-config namespace.
    fn name(&self) -> &'static str;

    fn version(&self) -> u32;

    /// Bring up stores and sensors.  On a cold boot this discovers the
    /// sensors and resolves their calibration.
    fn begin(&mut self) -> Result<()>;

    /// Kick off this wake's measurement without blocking.
    fn start(&mut self) -> Result<()>;

    /// Contribute to the outgoing message.  May wait (bounded) for the
    /// measurement started in [`start`](Self::start).
    fn deliver(&mut self, msg: &mut Message) -> Result<()>;

    /// Apply the controller's reply.
    fn feedback(&mut self, msg: &Message) -> Result<()>;

    /// Flush state before deep sleep.
    fn end(&mut self) -> Result<()>;

    /// Dump the per-cycle state.
    fn print_cycle_state(&self, out: &mut dyn ConsoleIo) -> fmt::Result;

    /// Dump the persistent config.
    fn print_persistent(&self, out: &mut dyn ConsoleIo) -> fmt::Result;

    /// Run the interactive setup menu until the operator leaves it.
    fn setup_handover(&mut self, console: &mut dyn ConsoleIo) -> fmt::Result;
}
