// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bulk span cipher: AES-128-CBC, no padding.
//!
//! The roster's encrypted span is a fixed multiple of the AES block size,
//! so padding never enters the picture; a span of any other length is a
//! caller bug and is reported, not padded over.

use aes::Aes128;
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

pub const AES_KEY_LEN: usize = 16;
pub const IV_LEN: usize = 16;

const BLOCK_LEN: usize = 16;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CipherError {
    /// The span is not a whole number of AES blocks
    BadSpanLength,
}

/// Encrypts `span` in place.
pub fn encrypt_span(
    key: &[u8; AES_KEY_LEN],
    iv: &[u8; IV_LEN],
    span: &mut [u8],
) -> Result<(), CipherError> {
    if span.len() % BLOCK_LEN != 0 {
        return Err(CipherError::BadSpanLength);
    }
    let len = span.len();
    Aes128CbcEnc::new(key.into(), iv.into())
        .encrypt_padded_mut::<NoPadding>(span, len)
        .map_err(|_| CipherError::BadSpanLength)?;
    Ok(())
}

/// Decrypts `span` in place.
pub fn decrypt_span(
    key: &[u8; AES_KEY_LEN],
    iv: &[u8; IV_LEN],
    span: &mut [u8],
) -> Result<(), CipherError> {
    if span.len() % BLOCK_LEN != 0 {
        return Err(CipherError::BadSpanLength);
    }
    Aes128CbcDec::new(key.into(), iv.into())
        .decrypt_padded_mut::<NoPadding>(span)
        .map_err(|_| CipherError::BadSpanLength)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; AES_KEY_LEN] = [0xA5; AES_KEY_LEN];
    const IV: [u8; IV_LEN] = [0x3C; IV_LEN];

    #[test]
    fn round_trip() {
        let plain: [u8; 160] = core::array::from_fn(|i| i as u8);
        let mut span = plain;

        encrypt_span(&KEY, &IV, &mut span).unwrap();
        assert_ne!(span, plain);
        decrypt_span(&KEY, &IV, &mut span).unwrap();
        assert_eq!(span, plain);
    }

    #[test]
    fn iv_matters() {
        let plain = [0u8; 32];
        let mut a = plain;
        let mut b = plain;

        encrypt_span(&KEY, &IV, &mut a).unwrap();
        encrypt_span(&KEY, &[0x3D; IV_LEN], &mut b).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn partial_block_is_refused() {
        let mut span = [0u8; 24];
        assert_eq!(
            encrypt_span(&KEY, &IV, &mut span),
            Err(CipherError::BadSpanLength)
        );
        assert_eq!(
            decrypt_span(&KEY, &IV, &mut span),
            Err(CipherError::BadSpanLength)
        );
    }
}
