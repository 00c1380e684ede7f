// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A complete simulated board for the AP core.
//!
//! Every hardware seam the core defines has a software stand-in here: a
//! bus populated with scripted components that speak the peer side of the
//! protocol, a RAM flash page with NOR erase/write discipline, script and
//! stdio consoles, recording LEDs and delay timer, and both seeded and
//! OS-backed entropy.
//!
//! Everything stateful is a cheap cloneable handle over shared interior
//! state, so a test can keep a handle to the bus, flash, console output,
//! LEDs, or delay while the `Ap` owns the other. The peer components
//! double as introspection points: they record the challenges and
//! verdicts they saw, which is how the ordering properties of the
//! protocol get asserted without cracking open the core.

mod board;
mod bus;
mod flash;
mod uart;

pub use board::{RecordingDelay, RecordingLeds, SleepDelay};
pub use bus::{SimBus, SimComponent};
pub use flash::RamFlash;
pub use uart::{ScriptUart, SharedOutput, StdioUart};

/// Host-backed entropy for interactive runs.
pub use rand_core::OsRng;

/// Deterministic entropy for tests.
pub fn seeded_rng(seed: u8) -> rand_chacha::ChaCha20Rng {
    use rand_core::SeedableRng;
    rand_chacha::ChaCha20Rng::from_seed([seed; 32])
}
