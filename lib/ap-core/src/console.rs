// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Operator console in the host-harness line protocol.
//!
//! Every line the AP emits carries one of four tags the host tooling
//! dispatches on: `%info: ` for protocol results, `%debug: ` for
//! diagnostics and prompts, `%error: ` for failures, and `%success: ` for
//! terminal command outcomes. Input is solicited by printing the prompt
//! as an (unterminated) debug line, flushing, and emitting the `%ack%`
//! sentinel; the reply is read bounded with the newline stripped, and a
//! blank line is echoed once the read completes.

use core::fmt;

use drv_board_api::{Uart, UartError};

const INFO_TAG: &str = "%info: ";
const DEBUG_TAG: &str = "%debug: ";
const ERROR_TAG: &str = "%error: ";
const SUCCESS_TAG: &str = "%success: ";
const ACK: &str = "%ack%\n";

pub struct HostConsole<U: Uart> {
    uart: U,
}

impl<U: Uart> HostConsole<U> {
    pub fn new(uart: U) -> Self {
        Self { uart }
    }

    /// Gives the UART back, e.g. to rewire it after boot hand-off.
    pub fn into_inner(self) -> U {
        self.uart
    }

    pub fn info(&mut self, args: fmt::Arguments<'_>) -> Result<(), UartError> {
        self.tagged_line(INFO_TAG, args)
    }

    pub fn debug(&mut self, args: fmt::Arguments<'_>) -> Result<(), UartError> {
        self.tagged_line(DEBUG_TAG, args)
    }

    pub fn error(&mut self, args: fmt::Arguments<'_>) -> Result<(), UartError> {
        self.tagged_line(ERROR_TAG, args)
    }

    pub fn success(&mut self, args: fmt::Arguments<'_>) -> Result<(), UartError> {
        self.tagged_line(SUCCESS_TAG, args)
    }

    /// Prompts the operator and reads one line, bounded by `buf`.
    ///
    /// The prompt goes out as an unterminated `%debug: ` line so the
    /// harness can render it inline, then the UART is flushed and the
    /// `%ack%` sentinel tells the harness the AP is ready for input.
    pub fn recv_input<'a>(
        &mut self,
        prompt: &str,
        buf: &'a mut [u8],
    ) -> Result<&'a [u8], UartError> {
        self.uart.write_all(DEBUG_TAG.as_bytes())?;
        self.uart.write_all(prompt.as_bytes())?;
        self.uart.flush()?;
        self.uart.write_all(ACK.as_bytes())?;

        let n = self.uart.read_line(buf)?;
        self.uart.write_all(b"\n")?;
        Ok(&buf[..n])
    }

    fn tagged_line(
        &mut self,
        tag: &str,
        args: fmt::Arguments<'_>,
    ) -> Result<(), UartError> {
        use fmt::Write as _;

        let mut w = UartWriter { uart: &mut self.uart, err: None };
        let res = w
            .write_str(tag)
            .and_then(|_| w.write_fmt(args))
            .and_then(|_| w.write_str("\n"));
        match (res, w.err) {
            (_, Some(e)) => Err(e),
            (Err(fmt::Error), None) => Err(UartError::DeviceError),
            (Ok(()), None) => Ok(()),
        }
    }
}

struct UartWriter<'a, U: Uart> {
    uart: &'a mut U,
    err: Option<UartError>,
}

impl<U: Uart> fmt::Write for UartWriter<'_, U> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.uart.write_all(s.as_bytes()).map_err(|e| {
            self.err = Some(e);
            fmt::Error
        })
    }
}

/// `host_info!(console, "F>0x{:08x}", id)` and friends: the printf-shaped
/// convenience layer over [`HostConsole`].
#[macro_export]
macro_rules! host_info {
    ($console:expr, $($arg:tt)*) => {
        $console.info(core::format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! host_debug {
    ($console:expr, $($arg:tt)*) => {
        $console.debug(core::format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! host_error {
    ($console:expr, $($arg:tt)*) => {
        $console.error(core::format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! host_success {
    ($console:expr, $($arg:tt)*) => {
        $console.success(core::format_args!($($arg)*))
    };
}
