//! Console transports.
//!
//! [`StdConsole`] runs the setup menu over the process's stdin/stdout (the
//! serial monitor on the device, the terminal on the host).
//! [`ScriptedConsole`] feeds canned lines and captures output, for tests
//! and for replaying operator sessions.

use std::collections::VecDeque;
use std::io::{BufRead, Write as _};

use crate::app::ports::ConsoleIo;

/// Line console over stdin/stdout.
#[derive(Debug, Default)]
pub struct StdConsole;

impl core::fmt::Write for StdConsole {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let mut out = std::io::stdout().lock();
        out.write_all(s.as_bytes()).map_err(|_| core::fmt::Error)?;
        out.flush().map_err(|_| core::fmt::Error)
    }
}

impl ConsoleIo for StdConsole {
    fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_owned()),
        }
    }
}

/// Console fed from a fixed list of input lines.
#[derive(Debug, Default, Clone)]
pub struct ScriptedConsole {
    input: VecDeque<String>,
    output: String,
}

impl ScriptedConsole {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            input: lines.into_iter().map(Into::into).collect(),
            output: String::new(),
        }
    }

    /// Everything written so far.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Input lines not yet consumed.
    pub fn remaining(&self) -> usize {
        self.input.len()
    }
}

impl core::fmt::Write for ScriptedConsole {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.output.push_str(s);
        Ok(())
    }
}

impl ConsoleIo for ScriptedConsole {
    fn read_line(&mut self) -> Option<String> {
        self.input.pop_front()
    }
}
