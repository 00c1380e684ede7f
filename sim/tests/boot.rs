// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `boot` behavior: validate-then-boot ordering, verdict propagation,
//! and the hand-off banner.

mod common;

use ap_core::{config, RunExit};
use ap_sim::{SimBus, SimComponent};
use common::{rig, rig_over};
use drv_cbus_api::component_id_to_addr;

const IDS: [u32; 2] = [0x2000_0011, 0x2000_0012];

#[test]
fn all_valid_components_boot_and_ap_hands_off() {
    let mut r = rig(&IDS, &["boot"]);
    assert_eq!(r.ap.run_console(), RunExit::Booted);

    let lines = r.output.lines();
    for id in IDS {
        let addr = component_id_to_addr(id);
        let banner = r.bus.with_component(addr, |c| c.boot_msg.clone());
        assert!(lines.contains(&format!("%info: 0x{id:08x}>{banner}")));
        assert_eq!(r.bus.with_component(addr, |c| c.boot_verdict_seen), Some(0));
    }

    let ap_banner = lines
        .iter()
        .position(|l| l == &format!("%info: AP>{}", config::AP_BOOT_MSG))
        .unwrap();
    let marker = lines.iter().position(|l| l == "%success: Boot").unwrap();
    assert!(ap_banner < marker);
}

#[test]
fn boot_reuses_the_challenge_captured_during_validation() {
    let mut r = rig(&IDS, &["boot"]);
    assert_eq!(r.ap.run_console(), RunExit::Booted);

    for id in IDS {
        let addr = component_id_to_addr(id);
        let (validate_chal, boot_chal) = r.bus.with_component(addr, |c| {
            (c.validate_reply_chal.unwrap(), c.boot_chal_seen.unwrap())
        });
        // The boot frame continues the exact challenge this peer issued
        // in its final validation reply.
        assert_eq!(boot_chal, validate_chal.wrapping_add(1));
    }
}

#[test]
fn one_invalid_component_taints_every_verdict() {
    let bus = SimBus::new();
    bus.add_component(SimComponent::new(IDS[0]));
    bus.add_component(SimComponent::new(IDS[1]));
    // The second component lies about its identity.
    bus.with_component(component_id_to_addr(IDS[1]), |c| {
        c.reported_id = Some(0xBAD0_0001);
    });

    let mut r = rig_over(bus, &IDS, &["boot"]);
    assert_eq!(r.ap.run_console(), RunExit::ConsoleClosed);

    let lines = r.output.lines();
    assert!(lines
        .contains(&format!("%error: Component ID: 0x{:08x} invalid", IDS[1])));
    assert!(lines.iter().any(|l| l == "%error: Boot Failed"));
    assert!(!lines.iter().any(|l| l.starts_with("%info: AP>")));
    assert!(!lines.iter().any(|l| l == "%success: Boot"));

    // Every peer was told to abort, not just the liar.
    for id in IDS {
        let addr = component_id_to_addr(id);
        assert_eq!(
            r.bus.with_component(addr, |c| c.boot_verdict_seen),
            Some(u32::MAX)
        );
    }
}

#[test]
fn silent_component_fails_validation_and_boot() {
    let bus = SimBus::new();
    bus.add_component(SimComponent::new(IDS[0]));
    bus.add_component(SimComponent::new(IDS[1]));
    bus.with_component(component_id_to_addr(IDS[1]), |c| c.silent = true);

    let mut r = rig_over(bus, &IDS, &["boot"]);
    assert_eq!(r.ap.run_console(), RunExit::ConsoleClosed);

    let lines = r.output.lines();
    assert!(lines
        .contains(&format!("%error: Component ID: 0x{:08x} invalid", IDS[1])));
    assert!(lines
        .contains(&format!("%error: Could not boot component 0x{:08x}", IDS[1])));
    assert!(lines.iter().any(|l| l == "%error: Boot Failed"));
}

#[test]
fn refused_boot_is_reported() {
    let bus = SimBus::new();
    bus.add_component(SimComponent::new(IDS[0]));
    bus.add_component(SimComponent::new(IDS[1]));
    bus.with_component(component_id_to_addr(IDS[1]), |c| c.refuse_boot = true);

    let mut r = rig_over(bus, &IDS, &["boot"]);
    assert_eq!(r.ap.run_console(), RunExit::ConsoleClosed);

    let lines = r.output.lines();
    // The first component validated and booted before the refusal.
    assert!(lines.contains(&format!(
        "%error: Could not boot component 0x{:08x}",
        IDS[1]
    )));
    assert!(lines.iter().any(|l| l == "%error: Boot Failed"));
}
