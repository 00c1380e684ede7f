// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! RAM-backed roster page with NOR discipline: erase fills `0xFF`, and a
//! write over unerased bytes is an error, which is exactly the mistake a
//! flash fake exists to catch.

use std::cell::RefCell;
use std::rc::Rc;

use ap_core::roster::RECORD_LEN;
use drv_flash_api::{FlashDriver, FlashError, ERASED_BYTE};

struct FlashInner {
    page: [u8; RECORD_LEN],
    erased: bool,
}

/// Cloneable handle to the shared page.
#[derive(Clone)]
pub struct RamFlash {
    inner: Rc<RefCell<FlashInner>>,
}

impl RamFlash {
    /// A factory-blank page.
    pub fn blank() -> Self {
        Self {
            inner: Rc::new(RefCell::new(FlashInner {
                page: [ERASED_BYTE; RECORD_LEN],
                erased: true,
            })),
        }
    }

    /// Raw page contents, for byte-identity assertions.
    pub fn contents(&self) -> [u8; RECORD_LEN] {
        self.inner.borrow().page
    }

    /// Flips one bit, as a flash-resident attacker would.
    pub fn corrupt_bit(&self, byte: usize, bit: u8) {
        self.inner.borrow_mut().page[byte] ^= 1 << bit;
    }
}

impl Default for RamFlash {
    fn default() -> Self {
        Self::blank()
    }
}

impl FlashDriver for RamFlash {
    fn read(&mut self, out: &mut [u8]) -> Result<(), FlashError> {
        let inner = self.inner.borrow();
        if out.len() > inner.page.len() {
            return Err(FlashError::OutOfBounds);
        }
        out.copy_from_slice(&inner.page[..out.len()]);
        Ok(())
    }

    fn erase_page(&mut self) -> Result<(), FlashError> {
        let mut inner = self.inner.borrow_mut();
        inner.page.fill(ERASED_BYTE);
        inner.erased = true;
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<(), FlashError> {
        let mut inner = self.inner.borrow_mut();
        if data.len() > inner.page.len() {
            return Err(FlashError::OutOfBounds);
        }
        if !inner.erased {
            return Err(FlashError::NotErased);
        }
        inner.page[..data.len()].copy_from_slice(data);
        inner.erased = false;
        Ok(())
    }
}
