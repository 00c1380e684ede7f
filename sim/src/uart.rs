// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Consoles: a scripted one for tests and a stdio one for interactive
//! runs.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::rc::Rc;

use drv_board_api::{Uart, UartError};

/// Cloneable view of everything a scripted console has emitted.
#[derive(Clone, Default)]
pub struct SharedOutput {
    inner: Rc<RefCell<Vec<u8>>>,
}

impl SharedOutput {
    pub fn as_string(&self) -> String {
        String::from_utf8_lossy(&self.inner.borrow()).into_owned()
    }

    /// The output split into lines.
    pub fn lines(&self) -> Vec<String> {
        self.as_string().lines().map(str::to_owned).collect()
    }
}

/// Feeds a fixed list of operator lines and records all output. When the
/// script runs out the console reports [`UartError::Closed`], which ends
/// `run_console` in the simulator.
pub struct ScriptUart {
    input: VecDeque<String>,
    output: SharedOutput,
}

impl ScriptUart {
    pub fn new(lines: &[&str]) -> (Self, SharedOutput) {
        let output = SharedOutput::default();
        let uart = Self {
            input: lines.iter().map(|s| s.to_string()).collect(),
            output: output.clone(),
        };
        (uart, output)
    }
}

impl Uart for ScriptUart {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), UartError> {
        self.output.inner.borrow_mut().extend_from_slice(bytes);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), UartError> {
        Ok(())
    }

    fn read_line(&mut self, buf: &mut [u8]) -> Result<usize, UartError> {
        let line = self.input.pop_front().ok_or(UartError::Closed)?;
        let bytes = line.as_bytes();
        let n = bytes.len().min(buf.len());
        buf[..n].copy_from_slice(&bytes[..n]);
        Ok(n)
    }
}

/// The host terminal as the operator console.
#[derive(Default)]
pub struct StdioUart;

impl Uart for StdioUart {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), UartError> {
        std::io::stdout()
            .write_all(bytes)
            .map_err(|_| UartError::DeviceError)
    }

    fn flush(&mut self) -> Result<(), UartError> {
        std::io::stdout().flush().map_err(|_| UartError::DeviceError)
    }

    fn read_line(&mut self, buf: &mut [u8]) -> Result<usize, UartError> {
        let mut line = String::new();
        let n = std::io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|_| UartError::DeviceError)?;
        if n == 0 {
            return Err(UartError::Closed);
        }

        let trimmed = line.trim_end_matches(['\n', '\r']);
        let bytes = trimmed.as_bytes();
        let n = bytes.len().min(buf.len());
        buf[..n].copy_from_slice(&bytes[..n]);
        Ok(n)
    }
}
