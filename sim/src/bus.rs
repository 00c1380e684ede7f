// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scripted bus components and the bus that carries them.
//!
//! [`SimComponent`] implements the peer side of the protocol: it echoes
//! challenge continuations, walks the validate/boot and attest leg
//! counts, and speaks the post-boot secure-message framing. Fault
//! injection is a matter of flipping its public knobs: a `silent`
//! component swallows frames (the AP times out), `reported_id` makes
//! validation lie, `refuse_boot` aborts the boot leg.
//!
//! [`SimBus`] is a cloneable handle; the `Ap` drives one clone while the
//! test keeps another for set-up and post-mortem.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use ap_core::messaging::{MessageFrame, Opcode, FRAME_LEN};
use drv_cbus_api::{component_id_to_addr, BusAddr, BusError, CbusDriver};
use num_traits::FromPrimitive;
use zerocopy::{FromBytes, FromZeros, IntoBytes};

pub struct SimComponent {
    id: u32,
    pub boot_msg: String,
    pub attest_loc: String,
    pub attest_date: String,
    pub attest_cust: String,

    // Fault injection.
    pub silent: bool,
    pub reported_id: Option<u32>,
    pub refuse_boot: bool,

    // Session tracking.
    validate_legs: u8,
    attest_legs: u8,
    secure_legs: u8,
    pending_outbound: Option<Vec<u8>>,

    // What the component saw; tests assert ordering through these.
    pub validate_reply_chal: Option<u32>,
    pub boot_chal_seen: Option<u32>,
    pub boot_verdict_seen: Option<u32>,
    pub received_secure: Vec<Vec<u8>>,
}

impl SimComponent {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            boot_msg: format!("component {id:08x} online"),
            attest_loc: "Bldg-1".to_string(),
            attest_date: "2024-01-01".to_string(),
            attest_cust: "Nobody".to_string(),
            silent: false,
            reported_id: None,
            refuse_boot: false,
            validate_legs: 0,
            attest_legs: 0,
            secure_legs: 0,
            pending_outbound: None,
            validate_reply_chal: None,
            boot_chal_seen: None,
            boot_verdict_seen: None,
            received_secure: Vec::new(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Handles one frame from the AP; `Some` is a reply to queue.
    fn handle(&mut self, frame: &MessageFrame) -> Option<MessageFrame> {
        let mut reply = MessageFrame::new_zeroed();
        reply.set_chal(frame.chal().wrapping_add(1));

        match Opcode::from_u8(frame.opcode) {
            Some(Opcode::Scan) => {
                reply.set_contents_word(self.id);
                Some(reply)
            }
            Some(Opcode::Validate) => {
                self.validate_legs += 1;
                match self.validate_legs {
                    1 => Some(reply),
                    2 => {
                        reply.set_contents_word(
                            self.reported_id.unwrap_or(self.id),
                        );
                        self.validate_reply_chal = Some(reply.chal());
                        Some(reply)
                    }
                    _ => {
                        // Third leg of a validate session is the boot
                        // order; the AP leaves the opcode as-is.
                        self.validate_legs = 0;
                        self.boot_chal_seen = Some(frame.chal());
                        let verdict = frame.contents_word();
                        self.boot_verdict_seen = Some(verdict);
                        if verdict == 0 && !self.refuse_boot {
                            reply.set_contents_word(0);
                            let msg = self.boot_msg.as_bytes();
                            let n = msg.len().min(64);
                            reply.contents[4..4 + n]
                                .copy_from_slice(&msg[..n]);
                        } else {
                            reply.set_contents_word(u32::MAX);
                        }
                        Some(reply)
                    }
                }
            }
            Some(Opcode::Attest) => {
                self.attest_legs += 1;
                if self.attest_legs == 1 {
                    Some(reply)
                } else {
                    self.attest_legs = 0;
                    put_field(&mut reply.contents[0..64], &self.attest_loc);
                    put_field(&mut reply.contents[65..129], &self.attest_date);
                    put_field(&mut reply.contents[130..194], &self.attest_cust);
                    Some(reply)
                }
            }
            Some(Opcode::None) | None => {
                // Post-boot secure traffic runs with a zero opcode.
                if self.pending_outbound.is_some() {
                    // We initiated; this is the AP's continuation, so the
                    // next leg carries our payload.
                    let payload = self.pending_outbound.take().unwrap();
                    reply.contents[0] = payload.len() as u8;
                    reply.contents[1..1 + payload.len()]
                        .copy_from_slice(&payload);
                    Some(reply)
                } else {
                    self.secure_legs += 1;
                    if self.secure_legs == 1 {
                        Some(reply)
                    } else {
                        // Payload leg of an AP-initiated send; consume,
                        // no reply expected.
                        self.secure_legs = 0;
                        let len = usize::from(frame.contents[0]);
                        self.received_secure
                            .push(frame.contents[1..1 + len].to_vec());
                        None
                    }
                }
            }
            Some(Opcode::Boot) => {
                // The AP never addresses us with a bare boot opcode.
                None
            }
        }
    }
}

fn put_field(dest: &mut [u8], text: &str) {
    let bytes = text.as_bytes();
    let n = bytes.len().min(dest.len());
    dest[..n].copy_from_slice(&bytes[..n]);
}

#[derive(Default)]
struct BusInner {
    components: BTreeMap<BusAddr, SimComponent>,
    inboxes: BTreeMap<BusAddr, VecDeque<Vec<u8>>>,
    touched: Vec<BusAddr>,
    next_chal: u32,
}

/// Cloneable handle to the shared bus.
#[derive(Clone, Default)]
pub struct SimBus {
    inner: Rc<RefCell<BusInner>>,
}

impl SimBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a component at the address derived from its ID and returns
    /// that address.
    pub fn add_component(&self, component: SimComponent) -> BusAddr {
        let addr = component_id_to_addr(component.id);
        self.inner.borrow_mut().components.insert(addr, component);
        addr
    }

    /// Every address the AP has driven, in order.
    pub fn touched(&self) -> Vec<BusAddr> {
        self.inner.borrow().touched.clone()
    }

    /// Runs `f` against the component at `addr`.
    pub fn with_component<R>(
        &self,
        addr: BusAddr,
        f: impl FnOnce(&mut SimComponent) -> R,
    ) -> R {
        let mut inner = self.inner.borrow_mut();
        let component = inner
            .components
            .get_mut(&addr)
            .expect("no component at address");
        f(component)
    }

    /// Has the component at `addr` initiate a secure message carrying
    /// `payload`; the AP collects it with `secure_receive`. Payloads over
    /// the AP's 64-byte cap are allowed through here on purpose, so the
    /// cap itself can be exercised.
    pub fn queue_secure_message(&self, addr: BusAddr, payload: &[u8]) {
        assert!(payload.len() <= 255);
        let mut inner = self.inner.borrow_mut();

        inner.next_chal = inner.next_chal.wrapping_add(1);
        let chal = 0x5EED_0000u32.wrapping_add(inner.next_chal);

        let mut frame = MessageFrame::new_zeroed();
        frame.set_chal(chal);

        let component = inner
            .components
            .get_mut(&addr)
            .expect("no component at address");
        component.pending_outbound = Some(payload.to_vec());

        let bytes = frame.as_bytes().to_vec();
        inner.inboxes.entry(addr).or_default().push_back(bytes);
    }
}

impl CbusDriver for SimBus {
    fn send(&mut self, addr: BusAddr, frame: &[u8]) -> Result<(), BusError> {
        let mut inner = self.inner.borrow_mut();
        inner.touched.push(addr);

        if !inner.components.contains_key(&addr) {
            return Err(BusError::Nack);
        }
        if frame.len() != FRAME_LEN {
            return Err(BusError::TransferError);
        }

        let frame = MessageFrame::read_from_bytes(frame)
            .map_err(|_| BusError::TransferError)?;

        let component = inner.components.get_mut(&addr).unwrap();
        if component.silent {
            return Ok(());
        }
        if let Some(reply) = component.handle(&frame) {
            let bytes = reply.as_bytes().to_vec();
            inner.inboxes.entry(addr).or_default().push_back(bytes);
        }
        Ok(())
    }

    fn try_recv(
        &mut self,
        addr: BusAddr,
        buf: &mut [u8],
    ) -> Result<Option<usize>, BusError> {
        let mut inner = self.inner.borrow_mut();
        match inner.inboxes.get_mut(&addr).and_then(VecDeque::pop_front) {
            None => Ok(None),
            Some(bytes) => {
                buf[..bytes.len()].copy_from_slice(&bytes);
                Ok(Some(bytes.len()))
            }
        }
    }
}
