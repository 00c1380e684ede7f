// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CSPRNG for nonces and IVs.
//!
//! A ChaCha20 generator seeded from the board entropy source, reseeding
//! itself after a threshold of output bytes. The entropy source is only
//! touched at seed time, so per-message nonce draws stay cheap even when
//! the underlying TRNG is slow.

use rand_core::{impls, Error, RngCore, SeedableRng};

// low-budget rand::rngs::adapter::ReseedingRng w/o fork stuff
pub struct ReseedingRng<T: SeedableRng, R: RngCore> {
    inner: T,
    reseeder: R,
    threshold: usize,
    bytes_until_reseed: usize,
}

impl<T, R> ReseedingRng<T, R>
where
    T: SeedableRng,
    R: RngCore,
{
    pub fn new(mut reseeder: R, threshold: usize) -> Result<Self, Error> {
        let threshold = if threshold == 0 { usize::MAX } else { threshold };

        // try_trait_v2 is still experimental
        let inner = match T::from_rng(&mut reseeder) {
            Ok(rng) => rng,
            Err(err) => return Err(err),
        };
        Ok(ReseedingRng {
            inner,
            reseeder,
            threshold,
            bytes_until_reseed: threshold,
        })
    }
}

impl<T, R> RngCore for ReseedingRng<T, R>
where
    T: SeedableRng + RngCore,
    R: RngCore,
{
    fn next_u32(&mut self) -> u32 {
        impls::next_u32_via_fill(self)
    }

    fn next_u64(&mut self) -> u64 {
        impls::next_u64_via_fill(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.try_fill_bytes(dest)
            .expect("Failed to get entropy from RNG.")
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        let num_bytes = dest.len();
        if num_bytes >= self.bytes_until_reseed || num_bytes >= self.threshold {
            // try_trait_v2 is still experimental
            self.inner = match T::from_rng(&mut self.reseeder) {
                Ok(rng) => rng,
                Err(e) => return Err(e),
            };
            self.bytes_until_reseed = self.threshold;
        } else {
            self.bytes_until_reseed -= num_bytes;
        }
        self.inner.try_fill_bytes(dest)
    }
}

/// The generator the core instantiates: ChaCha20 over the board entropy
/// source, reseeded every 1 MiB of output.
pub type Csprng<R> = ReseedingRng<rand_chacha::ChaCha20Rng, R>;

/// Reseed threshold for [`Csprng`].
pub const RESEED_THRESHOLD: usize = 0x100000; // 1 MiB
