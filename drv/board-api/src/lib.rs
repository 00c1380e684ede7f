// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Board peripheral seams: operator console UART, status LEDs, the delay
//! timer, and the hardware entropy source.
//!
//! Everything here is deliberately small. The core only ever needs a
//! line-oriented console, three LEDs, busy-waits measured in microseconds,
//! and a stream of entropy to seed its CSPRNG. The entropy seam is
//! [`rand_core::RngCore`] directly, so a hardware TRNG driver and a host
//! RNG plug in the same way.

#![no_std]

pub use rand_core::RngCore;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum UartError {
    /// The peer side of the console went away. Real UARTs never report
    /// this; simulated consoles do when their script runs out.
    Closed,
    /// Hardware-level transfer failure
    DeviceError,
}

/// Line-oriented operator console.
pub trait Uart {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), UartError>;

    /// Push any buffered output to the wire.
    fn flush(&mut self) -> Result<(), UartError>;

    /// Read one line into `buf`, up to `buf.len()` bytes, stripping the
    /// trailing newline. Returns the number of bytes stored.
    fn read_line(&mut self, buf: &mut [u8]) -> Result<usize, UartError>;
}

/// The board status LEDs.
///
/// On the reference board LED1+LED3 together read as purple (normal
/// operation); LED3 alone turned off leaves red, which the auth penalty
/// path uses as its visible indicator.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LedId {
    Led1,
    Led2,
    Led3,
}

pub trait Leds {
    fn on(&mut self, led: LedId);
    fn off(&mut self, led: LedId);
}

/// Busy-wait delay timer.
pub trait Delay {
    fn delay_us(&mut self, us: u32);
}
