// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Security core of the application processor.
//!
//! The AP holds the roster of provisioned components in an encrypted,
//! integrity-checked flash record, speaks a challenge-chained message
//! protocol to each component over the shared bus, and gates the
//! `replace` and `attest` commands behind operator secrets. This crate is
//! the whole of that logic; the hardware underneath it (bus engine, flash
//! controller, UART, LEDs, delay timer, TRNG) arrives through the
//! `drv-*-api` traits, so a board support package and a simulator plug in
//! identically.
//!
//! Entry point: build an [`dispatcher::Ap`], call
//! [`dispatcher::Ap::run_console`], and on a successful boot convert the
//! value into a [`postboot::PostBoot`] for the application firmware.

#![cfg_attr(not(test), no_std)]

pub mod auth;
pub mod config;
pub mod console;
pub mod dispatcher;
pub mod messaging;
pub mod postboot;
pub mod protocol;
pub mod roster;

pub use dispatcher::{Ap, RunExit};
pub use postboot::PostBoot;
