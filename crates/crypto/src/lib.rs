// SPDX-FileCopyrightText: Copyright © 2025-2026 Depot Tools Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Symmetric cipher engine shared by manifest filenames and content chunks.
//!
//! Every protected payload carries its IV up front, encrypted with
//! AES-256-ECB, followed by the body in AES-256-CBC under that IV with
//! PKCS#7 padding. Authenticated payloads additionally fold a partial
//! HMAC-SHA1 into the IV: the last [`NONCE_SIZE`] bytes are a random
//! nonce and the remainder must match the digest of `nonce || plaintext`.

use std::fmt;

use aes::cipher::block_padding::{NoPadding, Pkcs7};
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyInit, KeyIvInit};
use aes::Aes256;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use thiserror::Error;

type Aes256EcbEnc = ecb::Encryptor<Aes256>;
type Aes256EcbDec = ecb::Decryptor<Aes256>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type HmacSha1 = Hmac<Sha1>;

/// Length of the encrypted IV prefixed to every payload
pub const IV_SIZE: usize = 16;

/// Trailing IV bytes reserved for the nonce in authenticated payloads
pub const NONCE_SIZE: usize = 3;

/// A 256-bit symmetric depot key
#[derive(Clone, PartialEq, Eq)]
pub struct Key([u8; 32]);

impl Key {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse a key from its 64 character hex encoding
    pub fn from_hex(input: &str) -> Result<Self, Error> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(input.trim(), &mut bytes).map_err(|_| Error::MalformedKey)?;
        Ok(Self(bytes))
    }

    /// HMAC verification only uses the first half of the key
    fn hmac_key(&self) -> &[u8] {
        &self.0[..IV_SIZE]
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never echo key material into logs
        f.write_str("Key(..)")
    }
}

/// Decrypt `input` with `key`, optionally verifying the partial HMAC
/// embedded in the IV.
///
/// Pure transform; the same routine serves filename decryption (no HMAC)
/// and chunk decryption.
pub fn symmetric_decrypt(input: &[u8], key: &Key, verify_hmac: bool) -> Result<Vec<u8>, Error> {
    if input.len() < IV_SIZE {
        return Err(Error::UndersizedCiphertext(input.len()));
    }
    let (prefix, body) = input.split_at(IV_SIZE);

    let iv: [u8; IV_SIZE] = Aes256EcbDec::new((&key.0).into())
        .decrypt_padded_vec_mut::<NoPadding>(prefix)
        .map_err(|_| Error::BadPadding)?
        .try_into()
        .map_err(|_| Error::BadPadding)?;

    let plaintext = Aes256CbcDec::new((&key.0).into(), (&iv).into())
        .decrypt_padded_vec_mut::<Pkcs7>(body)
        .map_err(|_| Error::BadPadding)?;

    if verify_hmac {
        let (partial, nonce) = iv.split_at(IV_SIZE - NONCE_SIZE);
        let digest = hmac_digest(key, nonce, &plaintext);
        if digest[..partial.len()] != *partial {
            return Err(Error::HmacMismatch);
        }
    }

    Ok(plaintext)
}

/// Encrypt `plaintext` under `key` with an explicit IV
pub fn symmetric_encrypt(plaintext: &[u8], key: &Key, iv: &[u8; IV_SIZE]) -> Vec<u8> {
    let mut output = Aes256EcbEnc::new((&key.0).into()).encrypt_padded_vec_mut::<NoPadding>(iv);
    output.extend(
        Aes256CbcEnc::new((&key.0).into(), iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext),
    );
    output
}

/// Encrypt `plaintext` with an IV derived from its HMAC, so that
/// [`symmetric_decrypt`] can authenticate the payload.
pub fn symmetric_encrypt_with_hmac_iv(
    plaintext: &[u8],
    key: &Key,
    nonce: &[u8; NONCE_SIZE],
) -> Vec<u8> {
    let digest = hmac_digest(key, nonce, plaintext);

    let mut iv = [0u8; IV_SIZE];
    iv[..IV_SIZE - NONCE_SIZE].copy_from_slice(&digest[..IV_SIZE - NONCE_SIZE]);
    iv[IV_SIZE - NONCE_SIZE..].copy_from_slice(nonce);

    symmetric_encrypt(plaintext, key, &iv)
}

fn hmac_digest(key: &Key, nonce: &[u8], plaintext: &[u8]) -> [u8; 20] {
    let mut hmac = <HmacSha1 as Mac>::new_from_slice(key.hmac_key())
        .expect("hmac accepts any key length");
    hmac.update(nonce);
    hmac.update(plaintext);
    hmac.finalize().into_bytes().into()
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("ciphertext too short: {0} bytes")]
    UndersizedCiphertext(usize),
    #[error("block decryption failed: bad length or padding")]
    BadPadding,
    #[error("embedded HMAC does not authenticate the payload")]
    HmacMismatch,
    #[error("key is not 64 hex characters")]
    MalformedKey,
}
