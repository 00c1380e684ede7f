// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Provisioned build-time parameters.
//!
//! The constants here are generated by the build script from the
//! provisioning environment: the flash magic, the factory component
//! roster, the operator PIN and replacement token, the AP boot banner,
//! and the bulk-cipher and integrity-hash keys.

use static_assertions::const_assert;

include!(concat!(env!("OUT_DIR"), "/ap_config.rs"));

pub const PIN_LEN: usize = 6;
pub const TOKEN_LEN: usize = 16;

const_assert!(COMPONENT_CNT >= 1);
const_assert!(COMPONENT_CNT <= crate::roster::MAX_COMPONENTS);
const_assert!(AP_PIN.len() == PIN_LEN);
const_assert!(AP_TOKEN.len() == TOKEN_LEN);
