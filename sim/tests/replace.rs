// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `replace` behavior: token gating, duplicate/unknown refusals, and
//! persistence across reboot.

mod common;

use ap_core::roster::{LoadOutcome, Roster};
use common::{rig, token};
use drv_board_api::LedId;

const IDS: [u32; 2] = [0xCAFE_BABE, 0x1111_1125];

#[test]
fn replace_swaps_and_survives_reboot() {
    let mut r = rig(
        &IDS,
        &["replace", token(), "0xDEADBEEF", "0xCAFEBABE"],
    );
    r.ap.run_console();

    let lines = r.output.lines();
    assert!(lines
        .iter()
        .any(|l| l == "%debug: Replaced 0xcafebabe with 0xdeadbeef"));
    assert!(lines.iter().any(|l| l == "%success: Replace"));

    // Reboot: load the same flash fresh.
    let mut flash = r.flash.clone();
    let (roster, outcome) =
        Roster::load(&mut flash, &mut ap_sim::seeded_rng(9)).unwrap();
    assert_eq!(outcome, LoadOutcome::Valid);
    assert!(roster.contains(0xDEAD_BEEF));
    assert!(!roster.contains(0xCAFE_BABE));
    assert!(roster.contains(0x1111_1125));
}

#[test]
fn replace_with_provisioned_incoming_id_is_a_flash_noop() {
    let mut r = rig(
        &IDS,
        // Incoming ID is already on the roster.
        &["replace", token(), "0x11111125", "0xCAFEBABE"],
    );
    let before = r.flash.contents();
    r.ap.run_console();

    assert!(r
        .output
        .lines()
        .iter()
        .any(|l| l == "%error: Component 0x11111125 is already provisioned!"));
    assert_eq!(r.flash.contents(), before);
}

#[test]
fn replace_with_unknown_outgoing_id_is_refused() {
    let mut r = rig(
        &IDS,
        &["replace", token(), "0xDEADBEEF", "0x42424242"],
    );
    let before = r.flash.contents();
    r.ap.run_console();

    assert!(r.output.lines().iter().any(
        |l| l == "%error: Component 0x42424242 is not provisioned for the system"
    ));
    assert_eq!(r.flash.contents(), before);
}

#[test]
fn wrong_token_burns_the_penalty_and_reads_no_ids() {
    let mut r = rig(&IDS, &["replace", "xxxxxxxxxxxxxxxx"]);
    r.ap.run_console();

    let lines = r.output.lines();
    assert!(lines.iter().any(|l| l == "%error: Invalid Token!"));
    // The ID prompts never appeared.
    assert!(!lines.iter().any(|l| l.contains("Component ID In:")));

    let total = r.delay.total_us();
    assert!((4_500_000..=5_500_000).contains(&total), "{total}");

    let events = r.leds.events();
    let drop =
        events.iter().position(|&e| e == (LedId::Led3, false)).unwrap();
    assert_eq!(events[drop + 1], (LedId::Led3, true));
}
