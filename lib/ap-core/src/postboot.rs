// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The surface the AP keeps honoring after boot hand-off.
//!
//! Once every component has booted, the application firmware owns the
//! bus. It talks through length-prefixed secure messages: `secure_send`
//! opens a handshake (transmit, checked receive, transmit-with-payload:
//! three legs, no final ack, for compatibility with deployed peers) and
//! `secure_receive` runs the mirror image, accepting the peer's opening
//! challenge unchecked and refusing payloads beyond the 64-byte cap.

use drv_board_api::Delay;
use drv_cbus_api::{BusAddr, CbusDriver};
use rand_core::RngCore;

use crate::messaging::{MessageTransport, XferError, CONTENTS_LEN};
use crate::roster::Roster;

/// Longest payload `secure_receive` accepts.
pub const MAX_SECURE_MSG_LEN: usize = 64;

pub struct PostBoot<B: CbusDriver, D: Delay, E: RngCore> {
    transport: MessageTransport<B>,
    roster: Roster,
    delay: D,
    rng: E,
}

impl<B: CbusDriver, D: Delay, E: RngCore> PostBoot<B, D, E> {
    pub(crate) fn new(
        transport: MessageTransport<B>,
        roster: Roster,
        delay: D,
        rng: E,
    ) -> Self {
        Self { transport, roster, delay, rng }
    }

    /// Securely sends `buffer` to the component at `addr`: handshake
    /// first, then the payload behind a one-byte length prefix.
    pub fn secure_send(
        &mut self,
        addr: BusAddr,
        buffer: &[u8],
    ) -> Result<(), XferError> {
        if buffer.len() >= CONTENTS_LEN {
            return Err(XferError::OversizeMessage);
        }

        self.transport.reset();

        // Initiate the handshake and take the peer's continuation.
        self.transport.transmit_to(addr, &mut self.rng)?;
        self.transport.poll_recv(addr, false, &mut self.delay)?;

        // Both sides have proven themselves; now the actual message.
        self.transport.transmit.contents[0] = buffer.len() as u8;
        self.transport.transmit.contents[1..1 + buffer.len()]
            .copy_from_slice(buffer);
        self.transport.transmit_to(addr, &mut self.rng)
    }

    /// Securely receives from the component at `addr` into `buffer`.
    /// Returns the payload length.
    pub fn secure_receive(
        &mut self,
        addr: BusAddr,
        buffer: &mut [u8],
    ) -> Result<usize, XferError> {
        self.transport.reset();

        // The peer initiates; its opening challenge is taken as-is.
        self.transport.poll_recv(addr, true, &mut self.delay)?;
        self.transport.transmit_to(addr, &mut self.rng)?;

        // Final leg carries the message.
        self.transport.poll_recv(addr, false, &mut self.delay)?;

        let len = usize::from(self.transport.receive.contents[0]);
        if len > MAX_SECURE_MSG_LEN || len > buffer.len() {
            return Err(XferError::OversizeMessage);
        }
        buffer[..len]
            .copy_from_slice(&self.transport.receive.contents[1..1 + len]);
        Ok(len)
    }

    /// Copies the provisioned component IDs into `buffer` and returns
    /// how many there are.
    pub fn get_provisioned_ids(&self, buffer: &mut [u32]) -> usize {
        let n = self.roster.count().min(buffer.len());
        buffer[..n].copy_from_slice(&self.roster.ids()[..n]);
        n
    }
}
