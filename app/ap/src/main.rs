// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interactive AP console over the simulated board.
//!
//! Runs the real security core against simulated components on the host
//! terminal: type `list`, `boot`, `replace`, or `attest` exactly as the
//! operator harness would. After a successful `boot` the process moves
//! into a small post-boot application that exercises the secure channel
//! once per component and exits.
//!
//! Host-side diagnostics go through `log` (set `RUST_LOG=debug` to watch
//! the LEDs); everything the firmware itself says uses the `%info:` /
//! `%debug:` / `%error:` / `%success:` console protocol on stdout.

use anyhow::{anyhow, Result};
use clap::Parser;
use log::{debug, info};
use rand_core::RngCore;

use ap_crypto::{Csprng, RESEED_THRESHOLD};
use ap_core::roster::Roster;
use ap_core::{Ap, PostBoot, RunExit};
use ap_sim::{OsRng, RamFlash, SimBus, SimComponent, SleepDelay, StdioUart};
use drv_board_api::{LedId, Leds};
use drv_cbus_api::component_id_to_addr;

const DEFAULT_IDS: [u32; 2] = [0x11111124, 0x11111125];

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Component ID (hex) to provision and place on the bus; may repeat.
    /// Defaults to the reference pair.
    #[arg(long = "component", value_parser = parse_id)]
    components: Vec<u32>,

    /// Provisioned component ID (hex) to leave off the bus, to watch the
    /// failure paths; may repeat
    #[arg(long = "absent", value_parser = parse_id)]
    absent: Vec<u32>,

    /// Seed the CSPRNG for a reproducible session instead of using host
    /// entropy
    #[arg(long)]
    seed: Option<u8>,
}

fn parse_id(text: &str) -> Result<u32, String> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u32::from_str_radix(digits, 16)
        .map_err(|e| format!("bad component ID {text:?}: {e}"))
}

/// Board LEDs rendered into the host log.
#[derive(Default)]
struct LogLeds;

impl Leds for LogLeds {
    fn on(&mut self, led: LedId) {
        debug!("LED {led:?} on");
    }

    fn off(&mut self, led: LedId) {
        debug!("LED {led:?} off");
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let ids = if args.components.is_empty() {
        DEFAULT_IDS.to_vec()
    } else {
        args.components
    };

    // The firmware composition: a ChaCha20 CSPRNG reseeding from the
    // board entropy source, which on the host is the OS RNG. A seeded
    // run swaps the whole stack for a reproducible stream.
    let mut rng: Box<dyn RngCore> = match args.seed {
        Some(seed) => Box::new(ap_sim::seeded_rng(seed)),
        None => Box::new(
            Csprng::new(OsRng, RESEED_THRESHOLD)
                .map_err(|e| anyhow!("seeding CSPRNG: {e}"))?,
        ),
    };

    let bus = SimBus::new();
    for &id in &ids {
        if args.absent.contains(&id) {
            info!("leaving component 0x{id:08x} off the bus");
        } else {
            bus.add_component(SimComponent::new(id));
        }
    }

    let flash = RamFlash::blank();
    Roster::provision(&mut flash.clone(), &mut rng, &ids)
        .map_err(|e| anyhow!("provisioning flash: {e:?}"))?;
    info!("provisioned {} component(s)", ids.len());

    let mut ap = Ap::init(
        bus,
        flash,
        StdioUart::default(),
        LogLeds::default(),
        SleepDelay::default(),
        rng,
    )
    .map_err(|e| anyhow!("board init: {e:?}"))?;

    match ap.run_console() {
        RunExit::ConsoleClosed => {
            info!("console closed; shutting down");
            Ok(())
        }
        RunExit::Booted => post_boot_main(ap.into_post_boot(), &ids),
    }
}

/// The stand-in post-boot application: one secure heartbeat per
/// component, then report the roster and exit.
fn post_boot_main(
    mut pb: PostBoot<SimBus, SleepDelay, Box<dyn RngCore>>,
    ids: &[u32],
) -> Result<()> {
    for &id in ids {
        let addr = component_id_to_addr(id);
        pb.secure_send(addr, b"heartbeat")
            .map_err(|e| anyhow!("heartbeat to 0x{id:08x}: {e:?}"))?;
        info!("secure heartbeat delivered to 0x{id:08x}");
    }

    let mut roster = [0u32; 32];
    let n = pb.get_provisioned_ids(&mut roster);
    info!("post-boot roster: {:08x?}", &roster[..n]);
    Ok(())
}
