// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bakes the provisioning parameters into the crate.
//!
//! The provisioning toolchain hands these in through the environment; a
//! developer build falls back to the reference values below. Everything
//! lands in `$OUT_DIR/ap_config.rs`, included by `src/config.rs`.

use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

const DEFAULT_PIN: &str = "123456";
const DEFAULT_TOKEN: &str = "0123456789abcdef";
const DEFAULT_BOOT_MSG: &str = "Test boot message";
const DEFAULT_COMPONENT_IDS: &str = "0x11111124,0x11111125";
const DEFAULT_FLASH_MAGIC: &str = "0xDEADBEEF";
const DEFAULT_AES_KEY: &str = "000102030405060708090a0b0c0d0e0f";
const DEFAULT_MAC_KEY: &str =
    "101112131415161718191a1b1c1d1e1f202122232425262728292a2b2c2d2e2f";

const MAX_COMPONENTS: usize = 32;

fn env_or(name: &str, default: &str) -> String {
    println!("cargo:rerun-if-env-changed={name}");
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_u32(name: &str, text: &str) -> u32 {
    let text = text.trim();
    let (digits, radix) = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (text, 10),
    };
    u32::from_str_radix(digits, radix)
        .unwrap_or_else(|_| panic!("{name}: bad integer {text:?}"))
}

fn parse_hex_key(name: &str, text: &str, len: usize) -> Vec<u8> {
    let text = text.trim();
    if text.len() != 2 * len || !text.is_ascii() {
        panic!("{name}: expected {} hex characters", 2 * len);
    }
    (0..len)
        .map(|i| {
            u8::from_str_radix(&text[2 * i..2 * i + 2], 16)
                .unwrap_or_else(|_| panic!("{name}: bad hex byte at {i}"))
        })
        .collect()
}

fn byte_array_literal(bytes: &[u8]) -> String {
    let mut out = String::from("[");
    for b in bytes {
        write!(out, "{b:#04x}, ").unwrap();
    }
    out.push(']');
    out
}

fn main() {
    let pin = env_or("AP_PIN", DEFAULT_PIN);
    let token = env_or("AP_TOKEN", DEFAULT_TOKEN);
    let boot_msg = env_or("AP_BOOT_MSG", DEFAULT_BOOT_MSG);
    let ids_text = env_or("AP_COMPONENT_IDS", DEFAULT_COMPONENT_IDS);
    let magic = parse_u32("AP_FLASH_MAGIC", &env_or("AP_FLASH_MAGIC", DEFAULT_FLASH_MAGIC));
    let aes_key = parse_hex_key("AP_AES_KEY", &env_or("AP_AES_KEY", DEFAULT_AES_KEY), 16);
    let mac_key = parse_hex_key("AP_MAC_KEY", &env_or("AP_MAC_KEY", DEFAULT_MAC_KEY), 32);

    if pin.len() != 6 {
        panic!("AP_PIN must be exactly 6 characters");
    }
    if token.len() != 16 {
        panic!("AP_TOKEN must be exactly 16 characters");
    }
    if boot_msg.contains('\n') {
        panic!("AP_BOOT_MSG must be a single line");
    }

    let ids: Vec<u32> = ids_text
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| parse_u32("AP_COMPONENT_IDS", s))
        .collect();
    if ids.is_empty() || ids.len() > MAX_COMPONENTS {
        panic!("AP_COMPONENT_IDS must name between 1 and {MAX_COMPONENTS} components");
    }

    let mut out = String::new();
    writeln!(out, "pub const FLASH_MAGIC: u32 = {magic:#010x};").unwrap();
    writeln!(out, "pub const COMPONENT_CNT: usize = {};", ids.len()).unwrap();
    write!(out, "pub const COMPONENT_IDS: [u32; COMPONENT_CNT] = [").unwrap();
    for id in &ids {
        write!(out, "{id:#010x}, ").unwrap();
    }
    writeln!(out, "];").unwrap();
    writeln!(
        out,
        "pub const AP_PIN: [u8; {}] = {};",
        pin.len(),
        byte_array_literal(pin.as_bytes())
    )
    .unwrap();
    writeln!(
        out,
        "pub const AP_TOKEN: [u8; {}] = {};",
        token.len(),
        byte_array_literal(token.as_bytes())
    )
    .unwrap();
    writeln!(out, "pub const AP_BOOT_MSG: &str = {boot_msg:?};").unwrap();
    writeln!(
        out,
        "pub const AES_KEY: [u8; 16] = {};",
        byte_array_literal(&aes_key)
    )
    .unwrap();
    writeln!(
        out,
        "pub const MAC_KEY: [u8; 32] = {};",
        byte_array_literal(&mac_key)
    )
    .unwrap();

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    fs::write(out_dir.join("ap_config.rs"), out).unwrap();
}
