// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Crypto primitives for the application processor core.
//!
//! This crate is the one place the core touches cipher and hash
//! implementations: AES-128-CBC for the roster's bulk span, HMAC-SHA-256
//! as the keyed integrity hash, a constant-time comparison for operator
//! secrets, and a ChaCha20 CSPRNG that periodically reseeds itself from
//! the board entropy source.
//!
//! None of this is authenticated encryption and nothing here claims to
//! be: the roster MAC is computed over plaintext and partially encrypted
//! along with it, which is a load-time integrity check and no more.

#![cfg_attr(not(test), no_std)]

mod bulk;
mod rng;

pub use bulk::{decrypt_span, encrypt_span, CipherError, AES_KEY_LEN, IV_LEN};
pub use rng::{Csprng, ReseedingRng, RESEED_THRESHOLD};

use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Length of the keyed hash output.
pub const HASH_LEN: usize = 32;

/// Length of the keyed-hash key.
pub const MAC_KEY_LEN: usize = 32;

type HmacSha256 = Hmac<Sha256>;

/// Computes the keyed integrity hash over `data`.
pub fn keyed_hash(key: &[u8; MAC_KEY_LEN], data: &[u8]) -> [u8; HASH_LEN] {
    // HMAC accepts any key length; this cannot fail.
    let mut mac = HmacSha256::new_from_slice(key).unwrap();
    mac.update(data);
    mac.finalize().into_bytes().into()
}

/// Compares two byte strings in constant time with respect to their
/// contents. Slices of unequal length compare unequal without inspecting
/// the bytes, which leaks only the lengths the caller already checked.
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    use subtle::ConstantTimeEq;
    bool::from(a.ct_eq(b))
}
