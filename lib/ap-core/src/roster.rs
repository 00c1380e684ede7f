// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The persistent component roster.
//!
//! One fixed-size record on one flash page: magic, live-entry count, 32
//! ID slots, a keyed hash over the header and slots, and the CBC IV. The
//! record is written encrypted; the encrypted span covers the header, the
//! slots, and the first 24 bytes of the hash, while the IV stays clear so
//! decryption is deterministic across reboots.
//!
//! The hash is computed over plaintext and then partially encrypted with
//! it. That makes it a load-time integrity check against flash tampering,
//! not authenticated encryption. A record that fails the magic or hash
//! check is rebuilt from the provisioned defaults, which doubles as the
//! first-boot path on blank flash.
//!
//! `replace` deliberately keeps the existing IV when it rewrites the
//! record, for compatibility with records already in the field. With a
//! deterministic cipher that is a known weakening: two records encrypted
//! under the same IV leak where their plaintexts first diverge.

use ap_crypto::{decrypt_span, encrypt_span, keyed_hash, HASH_LEN, IV_LEN};
use drv_flash_api::{FlashDriver, FlashError};
use rand_core::RngCore;
use static_assertions::const_assert_eq;
use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};

use crate::config;

/// Roster slot capacity; the record always carries all 32 slots.
pub const MAX_COMPONENTS: usize = 32;

/// Length of the encrypted prefix of the record: header, slots, and the
/// first 24 bytes of the hash.
const ENC_SPAN_LEN: usize = 160;

/// The hash covers everything before it.
const MAC_SPAN_LEN: usize = ENC_SPAN_LEN - 24;

#[derive(Clone, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
struct RosterRecord {
    magic: u32,
    count: u32,
    ids: [u32; MAX_COMPONENTS],
    mac: [u8; HASH_LEN],
    iv: [u8; IV_LEN],
}

/// Size of the record as written to flash.
pub const RECORD_LEN: usize = core::mem::size_of::<RosterRecord>();

const_assert_eq!(RECORD_LEN, 184);
const_assert_eq!(MAC_SPAN_LEN, 4 + 4 + 4 * MAX_COMPONENTS);
const_assert_eq!(ENC_SPAN_LEN % 16, 0);

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LoadOutcome {
    /// The stored record decrypted and verified
    Valid,
    /// Magic or hash failed; the record was rebuilt from provisioned
    /// defaults (first boot, power loss mid-write, or tampering)
    Reinitialized,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ReplaceError {
    /// The incoming ID is already provisioned
    Duplicate,
    /// The outgoing ID is not in the roster
    NotProvisioned,
    Flash(FlashError),
}

impl From<FlashError> for ReplaceError {
    fn from(e: FlashError) -> Self {
        ReplaceError::Flash(e)
    }
}

pub struct Roster {
    record: RosterRecord,
}

impl Roster {
    /// Reads and verifies the on-flash record. On magic or hash failure
    /// the record is rebuilt from the provisioned defaults with a fresh
    /// IV, and the outcome says so; the caller owns reporting.
    pub fn load<F: FlashDriver>(
        flash: &mut F,
        rng: &mut impl RngCore,
    ) -> Result<(Self, LoadOutcome), FlashError> {
        let mut record = RosterRecord::new_zeroed();
        flash.read(record.as_mut_bytes())?;

        let iv = record.iv;
        let decrypted = decrypt_span(
            &config::AES_KEY,
            &iv,
            &mut record.as_mut_bytes()[..ENC_SPAN_LEN],
        )
        .is_ok();

        if decrypted && record_verifies(&record) {
            return Ok((Self { record }, LoadOutcome::Valid));
        }

        let roster = Self::provision(flash, rng, &config::COMPONENT_IDS)?;
        Ok((roster, LoadOutcome::Reinitialized))
    }

    /// Writes a fresh record holding `ids`, drawing a new IV. This is
    /// both the manufacturing entry point and the integrity-failure
    /// rebuild path.
    pub fn provision<F: FlashDriver>(
        flash: &mut F,
        rng: &mut impl RngCore,
        ids: &[u32],
    ) -> Result<Self, FlashError> {
        assert!(!ids.is_empty() && ids.len() <= MAX_COMPONENTS);

        let mut record = RosterRecord::new_zeroed();
        record.magic = config::FLASH_MAGIC;
        record.count = ids.len() as u32;
        record.ids[..ids.len()].copy_from_slice(ids);
        record.mac = record_mac(&record);

        // IV: two 64-bit CSPRNG draws, little-endian, concatenated.
        record.iv[..8].copy_from_slice(&rng.next_u64().to_le_bytes());
        record.iv[8..].copy_from_slice(&rng.next_u64().to_le_bytes());

        let roster = Self { record };
        roster.persist(flash)?;
        Ok(roster)
    }

    pub fn count(&self) -> usize {
        (self.record.count as usize).min(MAX_COMPONENTS)
    }

    pub fn ids(&self) -> &[u32] {
        &self.record.ids[..self.count()]
    }

    pub fn contains(&self, id: u32) -> bool {
        self.ids().contains(&id)
    }

    /// Swaps `id_out` for `id_in` and rewrites flash. The existing IV is
    /// kept (see the module docs for why that is deliberate).
    pub fn replace<F: FlashDriver>(
        &mut self,
        flash: &mut F,
        id_out: u32,
        id_in: u32,
    ) -> Result<(), ReplaceError> {
        if self.contains(id_in) {
            return Err(ReplaceError::Duplicate);
        }

        let slot = match self.ids().iter().position(|&id| id == id_out) {
            Some(slot) => slot,
            None => return Err(ReplaceError::NotProvisioned),
        };

        self.record.ids[slot] = id_in;
        self.record.mac = record_mac(&self.record);
        self.persist(flash)?;
        Ok(())
    }

    /// Encrypts a copy of the record and rewrites the page: erase, then
    /// one contiguous write. A power loss in between leaves a record the
    /// next load rejects and rebuilds.
    fn persist<F: FlashDriver>(&self, flash: &mut F) -> Result<(), FlashError> {
        let mut encrypted = self.record.clone();
        // The span length is statically a whole number of AES blocks.
        encrypt_span(
            &config::AES_KEY,
            &self.record.iv,
            &mut encrypted.as_mut_bytes()[..ENC_SPAN_LEN],
        )
        .unwrap();

        flash.erase_page()?;
        flash.write(encrypted.as_bytes())
    }
}

fn record_mac(record: &RosterRecord) -> [u8; HASH_LEN] {
    keyed_hash(&config::MAC_KEY, &record.as_bytes()[..MAC_SPAN_LEN])
}

fn record_verifies(record: &RosterRecord) -> bool {
    record.magic == config::FLASH_MAGIC
        && ap_crypto::ct_eq(&record.mac, &record_mac(record))
}
