// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `list` behavior: output shape, bus coverage, and the reserved-address
//! blacklist.

mod common;

use ap_core::RunExit;
use ap_sim::{SimBus, SimComponent};
use common::{rig, rig_over};
use drv_cbus_api::{
    component_id_to_addr, is_reserved, SCAN_ADDR_END, SCAN_ADDR_START,
};

#[test]
fn scan_reports_roster_then_responders() {
    // Only 0xAAAAAAAA is actually on the bus; 0xBBBBBBBB is provisioned
    // but absent.
    let bus = SimBus::new();
    bus.add_component(SimComponent::new(0xAAAA_AAAA));

    let mut r = rig_over(bus, &[0xAAAA_AAAA, 0xBBBB_BBBB], &["list"]);
    assert_eq!(r.ap.run_console(), RunExit::ConsoleClosed);

    let lines = r.output.lines();
    let p_a = lines.iter().position(|l| l == "%info: P>0xaaaaaaaa").unwrap();
    let p_b = lines.iter().position(|l| l == "%info: P>0xbbbbbbbb").unwrap();
    let f_a = lines.iter().position(|l| l == "%info: F>0xaaaaaaaa").unwrap();
    assert!(p_a < p_b && p_b < f_a);

    // Nobody claims to have found the absent component.
    assert!(!lines.iter().any(|l| l == "%info: F>0xbbbbbbbb"));

    // The command's terminal outcome is its last line; only the next
    // prompt follows it.
    let last_payload = lines
        .iter()
        .filter(|l| !l.starts_with("%debug: Enter Command:") && !l.is_empty())
        .next_back()
        .unwrap();
    assert_eq!(last_payload, "%success: List");
}

#[test]
fn scan_addresses_full_range_except_reserved() {
    let mut r = rig(&[0x1111_1124], &["list"]);
    r.ap.run_console();

    let expected: Vec<u8> = (SCAN_ADDR_START..SCAN_ADDR_END)
        .filter(|&a| !is_reserved(a))
        .collect();
    assert_eq!(r.bus.touched(), expected);
    assert!(!r.bus.touched().contains(&0x18));
    assert!(!r.bus.touched().contains(&0x28));
    assert!(!r.bus.touched().contains(&0x36));
}

#[test]
fn every_responding_component_is_found() {
    let ids = [0x1111_1124, 0x1111_1125];
    let mut r = rig(&ids, &["list"]);
    r.ap.run_console();

    let lines = r.output.lines();
    for id in ids {
        assert!(
            lines.contains(&format!("%info: F>0x{id:08x}")),
            "missing F> line for {id:08x}"
        );
        // The scan really did reach the component's derived address.
        assert!(r.bus.touched().contains(&component_id_to_addr(id)));
    }
}

#[test]
fn unknown_command_is_reported_and_loop_continues() {
    let mut r = rig(&[0x1111_1124], &["frobnicate", "list"]);
    assert_eq!(r.ap.run_console(), RunExit::ConsoleClosed);

    let lines = r.output.lines();
    let err = lines
        .iter()
        .position(|l| l == "%error: Unrecognized command 'frobnicate'")
        .unwrap();
    let list = lines.iter().position(|l| l == "%success: List").unwrap();
    assert!(err < list);
}

#[test]
fn startup_banner_comes_first() {
    let mut r = rig(&[0x1111_1124], &[]);
    r.ap.run_console();

    let lines = r.output.lines();
    assert_eq!(lines[0], "%info: Application Processor Started");
}
