// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! API for the shared component bus.
//!
//! The bus carries fixed-size message frames between the application
//! processor and its provisioned components. It is an I2C-style transport:
//! 7-bit addresses, writes that are either acknowledged or not, and reads
//! that may come back empty until the addressed component has produced a
//! reply.
//!
//! The actual bus engine lives behind the [`CbusDriver`] trait; this crate
//! only defines the interface, the address space, and the addresses that
//! must never be driven because they belong to other devices on the board.

#![no_std]

/// A 7-bit bus address.
pub type BusAddr = u8;

/// First address probed during a scan.
pub const SCAN_ADDR_START: BusAddr = 0x08;

/// One past the last address probed during a scan.
pub const SCAN_ADDR_END: BusAddr = 0x78;

/// Addresses that are never driven: they conflict with fixed-function
/// devices sharing the bus on the reference board.
pub const RESERVED_ADDRS: [BusAddr; 3] = [0x18, 0x28, 0x36];

/// Returns true if `addr` belongs to a fixed-function device and must be
/// skipped when scanning.
pub fn is_reserved(addr: BusAddr) -> bool {
    RESERVED_ADDRS.contains(&addr)
}

/// The fixed component-ID-to-bus-address mapping used by the provisioning
/// toolchain: a component answers at the low seven bits of its ID.
pub fn component_id_to_addr(component_id: u32) -> BusAddr {
    (component_id as BusAddr) & 0x7F
}

/// Errors produced by a bus driver. These are specific not because callers
/// handle them differently, but to give upstack software some context
/// around the failure.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BusError {
    /// The addressed device did not acknowledge the transfer
    Nack,
    /// The bus engine reported a transfer error mid-frame
    TransferError,
    /// The bus locked up and was reset
    BusLocked,
    /// The address is outside the 7-bit range this bus supports
    BadAddr,
}

/// The bus seam. One driver instance owns one physical bus.
///
/// `send` blocks until the frame has been clocked out (or refused);
/// `try_recv` is a single non-blocking poll. Callers that need a blocking
/// receive run their own retry loop over `try_recv`, which keeps the
/// timeout policy out of the driver.
pub trait CbusDriver {
    /// Write one frame to `addr`.
    fn send(&mut self, addr: BusAddr, frame: &[u8]) -> Result<(), BusError>;

    /// Poll once for a frame from `addr`. Returns `Ok(None)` if the
    /// component has not produced a reply yet; `Ok(Some(len))` once `buf`
    /// holds a frame of `len` bytes.
    fn try_recv(
        &mut self,
        addr: BusAddr,
        buf: &mut [u8],
    ) -> Result<Option<usize>, BusError>;
}
