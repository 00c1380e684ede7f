// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! API for the roster flash page.
//!
//! The persistent roster occupies a single flash page at a fixed address
//! chosen by the board support package. This crate defines the seam the
//! core uses to reach it: a whole-record read, a page erase, and a
//! contiguous write. Flash semantics are the usual NOR ones, so a write
//! must be preceded by an erase and an erased page reads back `0xFF`.

#![no_std]

/// Fill value of an erased page.
pub const ERASED_BYTE: u8 = 0xFF;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FlashError {
    /// The requested span does not fit in the roster page
    OutOfBounds,
    /// The controller reported a program or erase failure
    DeviceError,
    /// A write was attempted over bytes that were not erased first
    NotErased,
}

/// Access to the single roster page.
pub trait FlashDriver {
    /// Read `out.len()` bytes from the start of the page.
    fn read(&mut self, out: &mut [u8]) -> Result<(), FlashError>;

    /// Erase the whole page.
    fn erase_page(&mut self) -> Result<(), FlashError>;

    /// Program `data` at the start of the page. The page must have been
    /// erased since the last write.
    fn write(&mut self, data: &[u8]) -> Result<(), FlashError>;
}
