// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The AP side of the component protocol: scan, validate, boot, attest.
//!
//! Every command is built from `issue`: send the prepared transmit frame,
//! take one challenge-checked reply. Validate and attest are two-step
//! handshakes, so both ends have proven themselves before any payload of
//! consequence moves. Boot rides on the tail of the validate session:
//! restoring the challenge captured per peer during validation steers the
//! transport into the continuation that peer expects, and the peer keys
//! on the leg count rather than a fresh opcode.
//!
//! Per-peer failures are reported and the roster loop continues; the
//! operator sees every broken component, not just the first.

use drv_cbus_api::{
    component_id_to_addr, is_reserved, BusAddr, CbusDriver, SCAN_ADDR_END,
    SCAN_ADDR_START,
};
use drv_board_api::{Delay, Leds, Uart, UartError};
use drv_flash_api::FlashDriver;
use rand_core::RngCore;

use crate::config;
use crate::dispatcher::Ap;
use crate::messaging::{Opcode, XferError};
use crate::roster::MAX_COMPONENTS;
use crate::{host_error, host_info, host_success};

/// A component boot banner is at most this long.
pub const BANNER_LEN: usize = 64;

/// Attestation fields are 64 bytes each at fixed offsets with a one-byte
/// gap between them; the gap bytes are part of the peer's framing and are
/// ignored.
pub const ATTEST_FIELD_LEN: usize = 64;
const ATTEST_LOC_OFF: usize = 0;
const ATTEST_DATE_OFF: usize = 65;
const ATTEST_CUST_OFF: usize = 130;

impl<B, F, U, L, D, E> Ap<B, F, U, L, D, E>
where
    B: CbusDriver,
    F: FlashDriver,
    U: Uart,
    L: Leds,
    D: Delay,
    E: RngCore,
{
    /// Sends the prepared transmit frame to `addr` and takes one
    /// challenge-checked reply into the receive frame.
    pub(crate) fn issue(&mut self, addr: BusAddr) -> Result<(), XferError> {
        self.transport.transmit_to(addr, &mut self.rng)?;
        self.transport.poll_recv(addr, false, &mut self.delay)
    }

    /// `list`: report the provisioned roster, then probe every
    /// non-reserved bus address and report who answered.
    pub(crate) fn scan_components(&mut self) -> Result<(), UartError> {
        for &id in self.roster.ids() {
            host_info!(self.console, "P>0x{:08x}", id)?;
        }

        for addr in SCAN_ADDR_START..SCAN_ADDR_END {
            if is_reserved(addr) {
                continue;
            }

            self.transport.transmit.set_opcode(Opcode::Scan);
            if self.issue(addr).is_ok() {
                host_info!(
                    self.console,
                    "F>0x{:08x}",
                    self.transport.receive.contents_word()
                )?;
            }
        }

        host_success!(self.console, "List")?;
        Ok(())
    }

    /// Runs the two-step validate handshake against every provisioned
    /// component. Returns the aggregate verdict and the challenge
    /// captured from each peer's final reply, which `boot_components`
    /// needs to continue each session.
    pub(crate) fn validate_components(
        &mut self,
    ) -> Result<(bool, [u32; MAX_COMPONENTS]), UartError> {
        let mut all_valid = true;
        let mut challenges = [0u32; MAX_COMPONENTS];

        for i in 0..self.roster.count() {
            let id = self.roster.ids()[i];
            let addr = component_id_to_addr(id);
            self.transport.transmit.set_opcode(Opcode::Validate);

            if self.issue(addr).is_err() {
                host_error!(self.console, "Component ID: 0x{:08x} invalid", id)?;
                all_valid = false;
                continue;
            }

            // The peer has proven itself; one more leg proves us to it.
            if self.issue(addr).is_err() {
                host_error!(self.console, "Component ID: 0x{:08x} invalid", id)?;
                all_valid = false;
                continue;
            }

            // A peer that failed above keeps challenge 0 here, so its
            // boot leg opens a fresh handshake; it refuses or times out
            // either way.
            challenges[i] = self.transport.receive.chal();

            if self.transport.receive.contents_word() != id {
                host_error!(self.console, "Component ID: 0x{:08x} invalid", id)?;
                all_valid = false;
            }
        }

        Ok((all_valid, challenges))
    }

    /// Tells every provisioned component the aggregate verdict. A peer
    /// that receives 0 finishes booting and answers with its banner; any
    /// other verdict makes it abort. Note that a boot failure taints the
    /// verdict for the peers after it, exactly as the aggregate demands.
    pub(crate) fn boot_components(
        &mut self,
        challenges: &[u32; MAX_COMPONENTS],
        validate_ok: bool,
    ) -> Result<bool, UartError> {
        let mut boot_ok = validate_ok;

        for i in 0..self.roster.count() {
            let id = self.roster.ids()[i];
            let addr = component_id_to_addr(id);

            // Restore this peer's challenge so the transport answers
            // with the continuation it expects.
            self.transport.receive.set_chal(challenges[i]);

            let verdict = if boot_ok { 0 } else { u32::MAX };
            self.transport.transmit.set_contents_word(verdict);

            if self.issue(addr).is_err() {
                host_error!(
                    self.console,
                    "Could not boot component 0x{:08x}",
                    id
                )?;
                boot_ok = false;
                continue;
            }

            if self.transport.receive.contents_word() == 0 {
                let banner =
                    bounded_str(&self.transport.receive.contents[4..4 + BANNER_LEN]);
                host_info!(self.console, "0x{:08x}>{}", id, banner)?;
            } else {
                host_error!(
                    self.console,
                    "Could not boot component 0x{:08x}",
                    id
                )?;
                boot_ok = false;
            }
        }

        Ok(boot_ok)
    }

    /// `boot`: validate everything, issue the verdict round, and on
    /// success print the AP banner and hand off.
    pub(crate) fn attempt_boot(&mut self) -> Result<bool, UartError> {
        let (validate_ok, challenges) = self.validate_components()?;
        let boot_ok = self.boot_components(&challenges, validate_ok)?;

        if !boot_ok {
            host_error!(self.console, "Boot Failed")?;
            return Ok(false);
        }

        host_info!(self.console, "AP>{}", config::AP_BOOT_MSG)?;
        host_success!(self.console, "Boot")?;
        self.transport.reset();
        Ok(true)
    }

    /// `attest`: two-step handshake, then print the peer's location,
    /// date, and customer fields.
    pub(crate) fn attest_component(
        &mut self,
        component_id: u32,
    ) -> Result<(), UartError> {
        if !self.roster.contains(component_id) {
            host_error!(self.console, "Cannot attest non-provisioned component")?;
            return Ok(());
        }

        let addr = component_id_to_addr(component_id);
        self.transport.transmit.set_opcode(Opcode::Attest);

        if self.issue(addr).is_err() {
            host_error!(self.console, "Failed to validate component")?;
            return Ok(());
        }
        if self.issue(addr).is_err() {
            host_error!(self.console, "Failed to retrieve attestation data")?;
            return Ok(());
        }

        host_info!(self.console, "C>0x{:08x}", component_id)?;
        let contents = &self.transport.receive.contents;
        host_info!(
            self.console,
            "LOC>{}",
            bounded_str(&contents[ATTEST_LOC_OFF..ATTEST_LOC_OFF + ATTEST_FIELD_LEN])
        )?;
        host_info!(
            self.console,
            "DATE>{}",
            bounded_str(&contents[ATTEST_DATE_OFF..ATTEST_DATE_OFF + ATTEST_FIELD_LEN])
        )?;
        host_info!(
            self.console,
            "CUST>{}",
            bounded_str(&contents[ATTEST_CUST_OFF..ATTEST_CUST_OFF + ATTEST_FIELD_LEN])
        )?;
        host_success!(self.console, "Attest")?;
        Ok(())
    }
}

/// NUL-bounded view of a fixed-size field; a wild field shows its valid
/// UTF-8 prefix rather than nothing.
fn bounded_str(bytes: &[u8]) -> &str {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let prefix = &bytes[..end];
    match core::str::from_utf8(prefix) {
        Ok(s) => s,
        Err(e) => core::str::from_utf8(&prefix[..e.valid_up_to()]).unwrap_or(""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_str_stops_at_nul_and_bad_utf8() {
        assert_eq!(bounded_str(b"Bldg-7\0garbage"), "Bldg-7");
        assert_eq!(bounded_str(b"no-nul-at-all"), "no-nul-at-all");
        assert_eq!(bounded_str(b"ok\xFF\xFEtail"), "ok");
        assert_eq!(bounded_str(b"\0"), "");
    }

    #[test]
    fn attest_offsets_leave_one_byte_gaps() {
        assert_eq!(ATTEST_DATE_OFF, ATTEST_LOC_OFF + ATTEST_FIELD_LEN + 1);
        assert_eq!(ATTEST_CUST_OFF, ATTEST_DATE_OFF + ATTEST_FIELD_LEN + 1);
    }
}
