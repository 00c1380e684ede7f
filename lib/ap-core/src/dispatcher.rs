// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The command dispatcher: the AP's forever loop.
//!
//! [`Ap`] bundles the board (bus transport, flash, console, LEDs, delay
//! timer, CSPRNG) with the loaded roster and hands each console command
//! to its handler. The message frames are scrubbed before every dispatch
//! so no command sees another's residue.
//!
//! The loop ends one of two ways: a successful `boot`, after which the
//! caller converts the `Ap` into a [`crate::postboot::PostBoot`] and
//! never comes back, or (on a simulated board only) the console script
//! running out.

use drv_board_api::{Delay, LedId, Leds, Uart, UartError};
use drv_cbus_api::CbusDriver;
use drv_flash_api::{FlashDriver, FlashError};
use rand_core::RngCore;

use crate::auth;
use crate::console::HostConsole;
use crate::messaging::MessageTransport;
use crate::postboot::PostBoot;
use crate::roster::{LoadOutcome, ReplaceError, Roster};
use crate::{host_debug, host_error, host_info, host_success};

/// Why `run_console` returned.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RunExit {
    /// All components booted; convert into the post-boot value and go.
    Booted,
    /// The operator console went away (simulation only).
    ConsoleClosed,
}

pub struct Ap<B, F, U, L, D, E>
where
    B: CbusDriver,
    F: FlashDriver,
    U: Uart,
    L: Leds,
    D: Delay,
    E: RngCore,
{
    pub(crate) transport: MessageTransport<B>,
    pub(crate) flash: F,
    pub(crate) console: HostConsole<U>,
    pub(crate) leds: L,
    pub(crate) delay: D,
    pub(crate) rng: E,
    pub(crate) roster: Roster,
    load_outcome: LoadOutcome,
}

impl<B, F, U, L, D, E> Ap<B, F, U, L, D, E>
where
    B: CbusDriver,
    F: FlashDriver,
    U: Uart,
    L: Leds,
    D: Delay,
    E: RngCore,
{
    /// Brings the board up: loads (or rebuilds) the roster and wires the
    /// peripherals together. Nothing is printed until `run_console`.
    pub fn init(
        bus: B,
        mut flash: F,
        uart: U,
        leds: L,
        delay: D,
        mut rng: E,
    ) -> Result<Self, FlashError> {
        let (roster, load_outcome) = Roster::load(&mut flash, &mut rng)?;

        Ok(Self {
            transport: MessageTransport::new(bus),
            flash,
            console: HostConsole::new(uart),
            leds,
            delay,
            rng,
            roster,
            load_outcome,
        })
    }

    /// The operator REPL. Returns [`RunExit::Booted`] after a successful
    /// boot sequence; the AP side of the protocol is then finished and
    /// the caller moves into post-boot.
    pub fn run_console(&mut self) -> RunExit {
        match self.console_loop() {
            Ok(exit) => exit,
            Err(_) => RunExit::ConsoleClosed,
        }
    }

    /// Consumes the AP after a successful boot, keeping only what the
    /// post-boot application is owed: the transport, the roster, and
    /// enough board to keep the secure channel alive.
    pub fn into_post_boot(self) -> PostBoot<B, D, E> {
        PostBoot::new(self.transport, self.roster, self.delay, self.rng)
    }

    fn console_loop(&mut self) -> Result<RunExit, UartError> {
        if self.load_outcome == LoadOutcome::Reinitialized {
            host_debug!(
                self.console,
                "Failed to verify flash integrity, resetting flash!"
            )?;
        }
        host_info!(self.console, "Application Processor Started")?;

        // LED1+LED3 read as purple: normal operation.
        self.leds.on(LedId::Led1);
        self.leds.on(LedId::Led3);

        let mut buf = [0u8; 100];
        loop {
            // Clear out any data that might still be in the frames.
            self.transport.reset();

            let line = self.console.recv_input("Enter Command: ", &mut buf)?;

            if line == b"list" {
                self.scan_components()?;
            } else if line == b"boot" {
                if self.attempt_boot()? {
                    return Ok(RunExit::Booted);
                }
            } else if line == b"replace" {
                self.attempt_replace()?;
            } else if line == b"attest" {
                self.attempt_attest()?;
            } else {
                let shown = core::str::from_utf8(line).unwrap_or("");
                host_error!(self.console, "Unrecognized command '{}'", shown)?;
            }
        }
    }

    fn attempt_replace(&mut self) -> Result<(), UartError> {
        let authed = auth::validate_token(
            &mut self.console,
            &mut self.delay,
            &mut self.rng,
        )?;
        if !authed {
            self.auth_penalty();
            return Ok(());
        }

        let mut buf = [0u8; 50];
        let id_in = {
            let line = self.console.recv_input("Component ID In: ", &mut buf)?;
            parse_hex_id(line)
        };
        let id_out = {
            let line =
                self.console.recv_input("Component ID Out: ", &mut buf)?;
            parse_hex_id(line)
        };

        match self.roster.replace(&mut self.flash, id_out, id_in) {
            Ok(()) => {
                host_debug!(
                    self.console,
                    "Replaced 0x{:08x} with 0x{:08x}",
                    id_out,
                    id_in
                )?;
                host_success!(self.console, "Replace")?;
            }
            Err(ReplaceError::Duplicate) => {
                host_error!(
                    self.console,
                    "Component 0x{:08x} is already provisioned!",
                    id_in
                )?;
            }
            Err(ReplaceError::NotProvisioned) => {
                host_error!(
                    self.console,
                    "Component 0x{:08x} is not provisioned for the system",
                    id_out
                )?;
            }
            Err(ReplaceError::Flash(_)) => {
                host_error!(self.console, "Failed to persist roster")?;
            }
        }
        Ok(())
    }

    fn attempt_attest(&mut self) -> Result<(), UartError> {
        let authed = auth::validate_pin(
            &mut self.console,
            &mut self.delay,
            &mut self.rng,
        )?;
        if !authed {
            self.auth_penalty();
            return Ok(());
        }

        let mut buf = [0u8; 50];
        let component_id = {
            let line = self.console.recv_input("Component ID: ", &mut buf)?;
            parse_hex_id(line)
        };
        self.attest_component(component_id)
    }

    /// We are potentially being attacked: burn four seconds with LED3
    /// off, which leaves the status LED red.
    fn auth_penalty(&mut self) {
        self.leds.off(LedId::Led3);
        self.delay.delay_us(4_000_000);
        self.leds.on(LedId::Led3);
    }
}

/// Hex ID parse with scanf-style forgiveness: optional `0x`, and anything
/// unparseable is zero.
fn parse_hex_id(line: &[u8]) -> u32 {
    let text = core::str::from_utf8(line).unwrap_or("").trim();
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u32::from_str_radix(digits, 16).unwrap_or(0)
}
