// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared rig: an `Ap` over the simulated board, with handles to every
//! piece the tests want to inspect afterwards.

// Each test binary uses a different slice of the rig.
#![allow(dead_code)]

use ap_core::roster::Roster;
use ap_core::Ap;
use ap_sim::{
    RamFlash, RecordingDelay, RecordingLeds, ScriptUart, SharedOutput,
    SimBus, SimComponent,
};
use rand_chacha::ChaCha20Rng;

pub type SimAp =
    Ap<SimBus, RamFlash, ScriptUart, RecordingLeds, RecordingDelay, ChaCha20Rng>;

pub struct Rig {
    pub bus: SimBus,
    pub flash: RamFlash,
    pub leds: RecordingLeds,
    pub delay: RecordingDelay,
    pub output: SharedOutput,
    pub ap: SimAp,
}

/// Provisions `ids`, populates the bus with one healthy component per ID,
/// and scripts the console.
pub fn rig(ids: &[u32], script: &[&str]) -> Rig {
    let bus = SimBus::new();
    for &id in ids {
        bus.add_component(SimComponent::new(id));
    }
    rig_over(bus, ids, script)
}

/// Like [`rig`], but the caller owns bus population (absent or faulty
/// components).
pub fn rig_over(bus: SimBus, ids: &[u32], script: &[&str]) -> Rig {
    let flash = RamFlash::blank();
    let mut provisioning_flash = flash.clone();
    Roster::provision(&mut provisioning_flash, &mut ap_sim::seeded_rng(0xF0), ids)
        .expect("provisioning flash");

    let (uart, output) = ScriptUart::new(script);
    let leds = RecordingLeds::default();
    let delay = RecordingDelay::default();

    let ap = Ap::init(
        bus.clone(),
        flash.clone(),
        uart,
        leds.clone(),
        delay.clone(),
        ap_sim::seeded_rng(0x51),
    )
    .expect("board init");

    Rig { bus, flash, leds, delay, output, ap }
}

/// The provisioned PIN/token/banner, as the operator would type them.
pub fn pin() -> &'static str {
    core::str::from_utf8(&ap_core::config::AP_PIN).unwrap()
}

pub fn token() -> &'static str {
    core::str::from_utf8(&ap_core::config::AP_TOKEN).unwrap()
}
