// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Operator authentication: the attest PIN and the replacement token.
//!
//! Both checks read a bounded line, then burn a uniformly random delay in
//! [0.5 s, 1.5 s] before anything about the input is inspected. The delay
//! is drawn from the CSPRNG independent of the input, so it carries no
//! information about it; its job is to swamp any length- or
//! position-correlated timing further down the path. The comparison
//! itself is constant-time over the secret's declared length.
//!
//! Rejection is reported here; the flat 4-second penalty and the red LED
//! belong to the caller, which owns the board.

use drv_board_api::{Delay, Uart, UartError};
use rand_core::RngCore;

use crate::config;
use crate::console::HostConsole;
use crate::{host_debug, host_error};

const INPUT_CAP: usize = 50;

const PRE_COMPARE_DELAY_MIN_US: u32 = 500_000;
const PRE_COMPARE_DELAY_MAX_US: u32 = 1_500_000;

/// Prompts for and checks the attest PIN. `Ok(true)` means accepted.
pub fn validate_pin<U: Uart>(
    console: &mut HostConsole<U>,
    delay: &mut impl Delay,
    rng: &mut impl RngCore,
) -> Result<bool, UartError> {
    let mut buf = [0u8; INPUT_CAP];
    let line = console.recv_input("Enter pin: ", &mut buf)?;

    random_delay(delay, rng);
    if line.len() == config::PIN_LEN && ap_crypto::ct_eq(line, &config::AP_PIN)
    {
        host_debug!(console, "Pin Accepted!")?;
        Ok(true)
    } else {
        host_error!(console, "Invalid PIN!")?;
        Ok(false)
    }
}

/// Prompts for and checks the replacement token. `Ok(true)` means
/// accepted.
pub fn validate_token<U: Uart>(
    console: &mut HostConsole<U>,
    delay: &mut impl Delay,
    rng: &mut impl RngCore,
) -> Result<bool, UartError> {
    let mut buf = [0u8; INPUT_CAP];
    let line = console.recv_input("Enter token: ", &mut buf)?;

    random_delay(delay, rng);
    if line.len() == config::TOKEN_LEN
        && ap_crypto::ct_eq(line, &config::AP_TOKEN)
    {
        host_debug!(console, "Token Accepted!")?;
        Ok(true)
    } else {
        host_error!(console, "Invalid Token!")?;
        Ok(false)
    }
}

/// Uniform draw in the pre-compare window. Always consumes exactly one
/// CSPRNG word so the stream position never depends on the input.
fn random_delay(delay: &mut impl Delay, rng: &mut impl RngCore) {
    let window = PRE_COMPARE_DELAY_MAX_US - PRE_COMPARE_DELAY_MIN_US + 1;
    let us = PRE_COMPARE_DELAY_MIN_US + rng.next_u32() % window;
    delay.delay_us(us);
}
