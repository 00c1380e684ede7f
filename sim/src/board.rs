// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! LEDs and the delay timer.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use drv_board_api::{Delay, LedId, Leds};

/// Records LED transitions; cloneable handle.
#[derive(Clone, Default)]
pub struct RecordingLeds {
    events: Rc<RefCell<Vec<(LedId, bool)>>>,
}

impl RecordingLeds {
    pub fn events(&self) -> Vec<(LedId, bool)> {
        self.events.borrow().clone()
    }
}

impl Leds for RecordingLeds {
    fn on(&mut self, led: LedId) {
        self.events.borrow_mut().push((led, true));
    }

    fn off(&mut self, led: LedId) {
        self.events.borrow_mut().push((led, false));
    }
}

/// Counts requested delay time instead of sleeping; cloneable handle.
#[derive(Clone, Default)]
pub struct RecordingDelay {
    total_us: Rc<RefCell<u64>>,
}

impl RecordingDelay {
    pub fn total_us(&self) -> u64 {
        *self.total_us.borrow()
    }
}

impl Delay for RecordingDelay {
    fn delay_us(&mut self, us: u32) {
        *self.total_us.borrow_mut() += u64::from(us);
    }
}

/// Actually sleeps; for interactive runs.
#[derive(Default)]
pub struct SleepDelay;

impl Delay for SleepDelay {
    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(Duration::from_micros(u64::from(us)));
    }
}
