// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Message frames and the bus transport.
//!
//! Frames are fixed-size: one opcode byte, a 32-bit challenge, and a
//! payload buffer sized for the largest reply in the protocol (the
//! three-field attestation record). Two frames exist for the life of the
//! transport, `transmit` and `receive`, and both are scrubbed between
//! logical exchanges.
//!
//! The challenge field chains a handshake across legs: a transmit that
//! opens an exchange carries a fresh CSPRNG nonce, every later transmit
//! carries the peer's last challenge plus one, and a checked receive
//! requires the peer to have done the same to ours. Challenge zero is
//! reserved as the "no handshake in progress" sentinel, so fresh draws
//! avoid it (and the very top of the range, which would chain onto it).

use drv_board_api::Delay;
use drv_cbus_api::{BusAddr, BusError, CbusDriver};
use rand_core::RngCore;
use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};
use zeroize::Zeroize;

/// Payload capacity of one frame.
pub const CONTENTS_LEN: usize = 256;

/// Wire size of one frame.
pub const FRAME_LEN: usize = 1 + 4 + CONTENTS_LEN;

/// How many times a receive polls the bus before giving up.
pub const POLL_ATTEMPTS: u32 = 200;

/// Pause between receive polls.
pub const POLL_INTERVAL_US: u32 = 1_000;

/// Commands understood by both ends of the bus.
///
/// `Boot` is part of the wire vocabulary even though the AP side never
/// stores it: the boot leg rides on the tail of a validate handshake and
/// the peer distinguishes it by leg count.
#[derive(Copy, Clone, Debug, Eq, PartialEq, num_derive::FromPrimitive)]
#[repr(u8)]
pub enum Opcode {
    None = 0,
    Scan = 1,
    Validate = 2,
    Boot = 3,
    Attest = 4,
}

#[derive(Clone, FromBytes, IntoBytes, KnownLayout, Immutable, Zeroize)]
#[repr(C)]
pub struct MessageFrame {
    pub opcode: u8,
    chal: [u8; 4],
    pub contents: [u8; CONTENTS_LEN],
}

static_assertions::const_assert_eq!(
    core::mem::size_of::<MessageFrame>(),
    FRAME_LEN
);

impl MessageFrame {
    pub fn chal(&self) -> u32 {
        u32::from_le_bytes(self.chal)
    }

    pub fn set_chal(&mut self, chal: u32) {
        self.chal = chal.to_le_bytes();
    }

    pub fn set_opcode(&mut self, opcode: Opcode) {
        self.opcode = opcode as u8;
    }

    /// First four payload bytes as a little-endian word; every command
    /// reply leads with one (component ID, boot verdict).
    pub fn contents_word(&self) -> u32 {
        read_u32(&self.contents)
    }

    pub fn set_contents_word(&mut self, word: u32) {
        self.contents[..4].copy_from_slice(&word.to_le_bytes());
    }
}

/// Reads a little-endian u32 from the front of `bytes`.
pub fn read_u32(bytes: &[u8]) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(word)
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum XferError {
    /// The polled receive exhausted its attempt budget
    Timeout,
    /// The received challenge is not the expected continuation
    ChallengeMismatch,
    /// A frame arrived with the wrong length
    RuntFrame,
    /// A payload length field exceeded what the exchange permits
    OversizeMessage,
    /// The bus driver failed outright
    Bus(BusError),
}

impl From<BusError> for XferError {
    fn from(e: BusError) -> Self {
        XferError::Bus(e)
    }
}

/// The transport owns the two singleton frames and the bus driver.
pub struct MessageTransport<B: CbusDriver> {
    bus: B,
    pub transmit: MessageFrame,
    pub receive: MessageFrame,
}

impl<B: CbusDriver> MessageTransport<B> {
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            transmit: MessageFrame::new_zeroed(),
            receive: MessageFrame::new_zeroed(),
        }
    }

    /// Scrubs both frames; call between logical exchanges.
    pub fn reset(&mut self) {
        self.transmit.zeroize();
        self.receive.zeroize();
    }

    /// Sends the transmit frame to `addr`, stamping the challenge first:
    /// a fresh nonce when no handshake is open, otherwise the
    /// continuation of the peer's last challenge.
    pub fn transmit_to(
        &mut self,
        addr: BusAddr,
        rng: &mut impl RngCore,
    ) -> Result<(), XferError> {
        let chal = match self.receive.chal() {
            0 => fresh_challenge(rng),
            peer => peer.wrapping_add(1),
        };
        self.transmit.set_chal(chal);
        self.bus.send(addr, self.transmit.as_bytes())?;
        Ok(())
    }

    /// Polls for a frame from `addr` until one arrives or the attempt
    /// budget runs out. Unless `skip_chal_check` is set, the received
    /// challenge must continue the one we just transmitted.
    pub fn poll_recv(
        &mut self,
        addr: BusAddr,
        skip_chal_check: bool,
        delay: &mut impl Delay,
    ) -> Result<(), XferError> {
        let expected = self.transmit.chal().wrapping_add(1);

        for attempt in 0..POLL_ATTEMPTS {
            if attempt != 0 {
                delay.delay_us(POLL_INTERVAL_US);
            }
            match self.bus.try_recv(addr, self.receive.as_mut_bytes())? {
                None => continue,
                Some(FRAME_LEN) => {
                    if !skip_chal_check && self.receive.chal() != expected {
                        return Err(XferError::ChallengeMismatch);
                    }
                    return Ok(());
                }
                Some(_) => return Err(XferError::RuntFrame),
            }
        }
        Err(XferError::Timeout)
    }
}

/// Draws a challenge that opens an exchange. The zero sentinel and the
/// top of the range are excluded so no leg of the `+1` chain can land on
/// zero.
fn fresh_challenge(rng: &mut impl RngCore) -> u32 {
    loop {
        let chal = rng.next_u32();
        if chal != 0 && chal < u32::MAX - 8 {
            return chal;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha20Rng;
    use rand_core::SeedableRng;

    #[derive(Default)]
    struct LoopbackBus {
        sent: Vec<(BusAddr, Vec<u8>)>,
        reply: Option<Vec<u8>>,
        polls_until_reply: u32,
    }

    impl CbusDriver for LoopbackBus {
        fn send(&mut self, addr: BusAddr, frame: &[u8]) -> Result<(), BusError> {
            self.sent.push((addr, frame.to_vec()));
            Ok(())
        }

        fn try_recv(
            &mut self,
            _addr: BusAddr,
            buf: &mut [u8],
        ) -> Result<Option<usize>, BusError> {
            if self.polls_until_reply > 0 {
                self.polls_until_reply -= 1;
                return Ok(None);
            }
            match self.reply.take() {
                None => Ok(None),
                Some(frame) => {
                    buf[..frame.len()].copy_from_slice(&frame);
                    Ok(Some(frame.len()))
                }
            }
        }
    }

    struct NoDelay;
    impl Delay for NoDelay {
        fn delay_us(&mut self, _us: u32) {}
    }

    fn rng() -> ChaCha20Rng {
        ChaCha20Rng::from_seed([0x42; 32])
    }

    fn reply_frame(chal: u32) -> Vec<u8> {
        let mut frame = MessageFrame::new_zeroed();
        frame.set_chal(chal);
        frame.as_bytes().to_vec()
    }

    #[test]
    fn opening_transmit_draws_fresh_nonzero_challenge() {
        let mut t = MessageTransport::new(LoopbackBus::default());
        t.transmit_to(0x24, &mut rng()).unwrap();
        assert_ne!(t.transmit.chal(), 0);
    }

    #[test]
    fn continuation_transmit_advances_peer_challenge() {
        let mut t = MessageTransport::new(LoopbackBus::default());
        t.receive.set_chal(0x1000);
        t.transmit_to(0x24, &mut rng()).unwrap();
        assert_eq!(t.transmit.chal(), 0x1001);
    }

    #[test]
    fn checked_receive_requires_continuation() {
        let mut t = MessageTransport::new(LoopbackBus::default());
        let mut r = rng();
        t.transmit_to(0x24, &mut r).unwrap();
        let good = t.transmit.chal().wrapping_add(1);

        t.bus.reply = Some(reply_frame(good.wrapping_add(1)));
        assert_eq!(
            t.poll_recv(0x24, false, &mut NoDelay),
            Err(XferError::ChallengeMismatch)
        );

        t.transmit_to(0x24, &mut r).unwrap();
        let good = t.transmit.chal().wrapping_add(1);
        t.bus.reply = Some(reply_frame(good));
        assert_eq!(t.poll_recv(0x24, false, &mut NoDelay), Ok(()));
        assert_eq!(t.receive.chal(), good);
    }

    #[test]
    fn skip_chal_check_accepts_any_challenge() {
        let mut t = MessageTransport::new(LoopbackBus::default());
        t.bus.reply = Some(reply_frame(0xDEAD_0001));
        assert_eq!(t.poll_recv(0x24, true, &mut NoDelay), Ok(()));
        assert_eq!(t.receive.chal(), 0xDEAD_0001);
    }

    #[test]
    fn slow_peer_is_tolerated_and_absent_peer_times_out() {
        let mut t = MessageTransport::new(LoopbackBus::default());
        t.transmit_to(0x24, &mut rng()).unwrap();
        let good = t.transmit.chal().wrapping_add(1);
        t.bus.reply = Some(reply_frame(good));
        t.bus.polls_until_reply = POLL_ATTEMPTS - 1;
        assert_eq!(t.poll_recv(0x24, false, &mut NoDelay), Ok(()));

        assert_eq!(
            t.poll_recv(0x24, false, &mut NoDelay),
            Err(XferError::Timeout)
        );
    }

    #[test]
    fn runt_frames_are_rejected() {
        let mut t = MessageTransport::new(LoopbackBus::default());
        t.bus.reply = Some(vec![0u8; FRAME_LEN - 1]);
        assert_eq!(
            t.poll_recv(0x24, true, &mut NoDelay),
            Err(XferError::RuntFrame)
        );
    }

    #[test]
    fn reset_scrubs_both_frames() {
        let mut t = MessageTransport::new(LoopbackBus::default());
        t.transmit.set_opcode(Opcode::Attest);
        t.transmit.contents.fill(0xA5);
        t.receive.set_chal(0x1234);
        t.reset();
        assert!(t.transmit.as_bytes().iter().all(|&b| b == 0));
        assert!(t.receive.as_bytes().iter().all(|&b| b == 0));
    }
}
