// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Payload encryption at the trust boundary.
//!
//! Every record leaving the client is sealed with an authenticated cipher; the
//! sealed format is `nonce || ciphertext || tag`. The access engine treats
//! sealed records as opaque bytes and relies only on their length being a
//! function of the plaintext length, so that decoy records of the same length
//! are indistinguishable from real ones.

use crate::OramError;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm,
};
use generic_array::GenericArray;
use rand::{CryptoRng, RngCore};

/// Size of the AES-256 key in bytes.
pub const KEY_LEN: usize = 32;
/// Size of the AES-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;
/// Size of the AES-GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Bytes prepended to a payload to record its unpadded length.
pub(crate) const LENGTH_PREFIX_LEN: usize = 4;

/// A symmetric cipher sealing payload records.
///
/// Implementations must be length-stable: `seal` output length depends only on
/// the plaintext length, never on its content or on the key.
pub trait PayloadCipher {
    /// The sealed length of a plaintext of `plaintext_len` bytes.
    fn sealed_len(&self, plaintext_len: usize) -> usize;

    /// Seals `plaintext` under a fresh nonce drawn from `rng`.
    fn seal<R: RngCore + CryptoRng>(
        &self,
        plaintext: &[u8],
        rng: &mut R,
    ) -> Result<Vec<u8>, OramError>;

    /// Opens a sealed record. Fails with [`OramError::DecryptionFault`] on
    /// tampered, truncated, or otherwise malformed input.
    fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, OramError>;
}

/// AES-256-GCM payload cipher.
pub struct Aes256GcmCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for Aes256GcmCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        write!(f, "Aes256GcmCipher")
    }
}

impl Aes256GcmCipher {
    /// Instantiates the cipher from a 256-bit key.
    pub fn new(key: &[u8; KEY_LEN]) -> Self {
        Self {
            cipher: Aes256Gcm::new(GenericArray::from_slice(key)),
        }
    }

    /// Draws a fresh random key.
    pub fn generate_key<R: RngCore + CryptoRng>(rng: &mut R) -> [u8; KEY_LEN] {
        let mut key = [0u8; KEY_LEN];
        rng.fill_bytes(&mut key);
        key
    }
}

impl PayloadCipher for Aes256GcmCipher {
    fn sealed_len(&self, plaintext_len: usize) -> usize {
        NONCE_LEN + plaintext_len + TAG_LEN
    }

    fn seal<R: RngCore + CryptoRng>(
        &self,
        plaintext: &[u8],
        rng: &mut R,
    ) -> Result<Vec<u8>, OramError> {
        let mut nonce = [0u8; NONCE_LEN];
        rng.fill_bytes(&mut nonce);
        let ciphertext = self
            .cipher
            .encrypt(GenericArray::from_slice(&nonce), plaintext)
            .map_err(|_| OramError::DecryptionFault)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, OramError> {
        if sealed.len() < NONCE_LEN + TAG_LEN {
            return Err(OramError::DecryptionFault);
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        self.cipher
            .decrypt(GenericArray::from_slice(nonce), ciphertext)
            .map_err(|_| OramError::DecryptionFault)
    }
}

/// Frames `plaintext` as a fixed-length buffer: a 4-byte little-endian length
/// prefix, the payload bytes, and zero padding out to `max_payload_len`.
/// Sealing the framed buffer gives every record in the system one size.
pub(crate) fn pad_payload(plaintext: &[u8], max_payload_len: usize) -> Result<Vec<u8>, OramError> {
    if plaintext.len() > max_payload_len {
        return Err(OramError::PayloadSizeMismatch {
            expected: max_payload_len,
            actual: plaintext.len(),
        });
    }
    let length: u32 = plaintext.len().try_into()?;
    let mut padded = Vec::with_capacity(LENGTH_PREFIX_LEN + max_payload_len);
    padded.extend_from_slice(&length.to_le_bytes());
    padded.extend_from_slice(plaintext);
    padded.resize(LENGTH_PREFIX_LEN + max_payload_len, 0);
    Ok(padded)
}

/// Recovers the payload from a framed buffer produced by [`pad_payload`].
pub(crate) fn unpad_payload(padded: &[u8]) -> Result<Vec<u8>, OramError> {
    if padded.len() < LENGTH_PREFIX_LEN {
        return Err(OramError::DecryptionFault);
    }
    let (prefix, body) = padded.split_at(LENGTH_PREFIX_LEN);
    let length = u32::from_le_bytes(prefix.try_into().map_err(|_| OramError::DecryptionFault)?);
    let length: usize = length.try_into()?;
    if length > body.len() {
        return Err(OramError::DecryptionFault);
    }
    Ok(body[..length].to_vec())
}
