//! Payload encryption
//!
//! Encrypts a codec-produced frame before it leaves the bridge:
//! - AES-256-CTR over the frame body
//! - Key derivation from per-device key material (SHA-256)
//! - Truncated HMAC-SHA256 written into the frame's 4-byte CMAC trailer
//!
//! Uplinks arrive as plaintext hex; nothing here decrypts.
//!
//! ## Nonce Construction
//!
//! The 16-byte nonce for AES-256-CTR is derived so that identical
//! plaintexts encrypted for different devices, or at different counter
//! values, never share a keystream:
//!
//! ```text
//! Bytes 0-7:   SHA256(device address)[0..8]
//! Bytes 8-11:  counter (little-endian)
//! Bytes 12-15: base pattern XOR index
//! ```
//!
//! Encryption is fully deterministic for a fixed `(address, frame, key,
//! counter)`, which keeps write retries byte-identical on the wire.

use std::fmt;

use aes::Aes256;
use ctr::cipher::{KeyIvInit, StreamCipher};
use ctr::Ctr128BE;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::codec::CMAC_LEN;

type HmacSha256 = Hmac<Sha256>;

/// Nonce tail pattern
const NONCE_BASE: [u8; 4] = [0xA5, 0x5A, 0xC3, 0x3C];

/// Crypto errors. Key parse failures are configuration errors surfaced to
/// the caller; a bad key is never silently substituted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Key material is not valid hex
    #[error("invalid key hex: {0}")]
    InvalidKeyHex(String),

    /// Key material decoded to zero bytes
    #[error("empty key material")]
    EmptyKey,

    /// Frame shorter than the CMAC trailer it must carry
    #[error("frame too short to carry a CMAC trailer ({0} bytes)")]
    FrameTooShort(usize),

    /// HMAC key setup failed
    #[error("invalid key length")]
    InvalidKeyLength,
}

/// A derived per-device encryption key
#[derive(Clone, PartialEq, Eq)]
pub struct DeviceKey {
    key: [u8; 32],
}

impl DeviceKey {
    /// Parse hex key material and derive the AES-256 key from it.
    ///
    /// Accepts key material of any non-zero length; the working key is
    /// `SHA256(material)`.
    pub fn from_hex(hex_key: &str) -> Result<Self, CryptoError> {
        let raw = hex::decode(hex_key.trim())
            .map_err(|e| CryptoError::InvalidKeyHex(e.to_string()))?;
        if raw.is_empty() {
            return Err(CryptoError::EmptyKey);
        }
        Ok(Self::from_material(&raw))
    }

    /// Derive a key from raw material
    pub fn from_material(material: &[u8]) -> Self {
        let digest = Sha256::digest(material);
        let mut key = [0u8; 32];
        key.copy_from_slice(&digest);
        Self { key }
    }

    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }
}

impl fmt::Debug for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceKey").field("key", &"[REDACTED]").finish()
    }
}

/// Resolve the key for a device: the device's own key material when it
/// has any, otherwise the module-wide default.
pub fn resolve_key(device_key_hex: Option<&str>, default_key_hex: &str) -> Result<DeviceKey, CryptoError> {
    match device_key_hex {
        Some(hex_key) if !hex_key.trim().is_empty() => DeviceKey::from_hex(hex_key),
        _ => DeviceKey::from_hex(default_key_hex),
    }
}

/// Encrypt a codec-produced frame for the device at `address`.
///
/// The body (everything before the 4-byte CMAC trailer) is encrypted with
/// AES-256-CTR; the trailer is replaced with the first 4 bytes of
/// `HMAC-SHA256(key, nonce || ciphertext)`. The output has the same
/// length as the input.
pub fn encrypt(
    address: &str,
    frame: &[u8],
    key: &DeviceKey,
    counter: u32,
) -> Result<Vec<u8>, CryptoError> {
    if frame.len() < CMAC_LEN {
        return Err(CryptoError::FrameTooShort(frame.len()));
    }
    let body_len = frame.len() - CMAC_LEN;
    let nonce = make_nonce(address, counter);

    let mut out = frame[..body_len].to_vec();
    let mut cipher = Ctr128BE::<Aes256>::new(key.as_bytes().into(), &nonce.into());
    cipher.apply_keystream(&mut out);

    let mic = compute_mic(key, &nonce, &out)?;
    out.extend_from_slice(&mic);
    Ok(out)
}

/// Construct the 16-byte nonce from the device address and counter
fn make_nonce(address: &str, counter: u32) -> [u8; 16] {
    let mut nonce = [0u8; 16];

    let digest = Sha256::digest(address.as_bytes());
    nonce[0..8].copy_from_slice(&digest[0..8]);

    nonce[8..12].copy_from_slice(&counter.to_le_bytes());

    for (i, &b) in NONCE_BASE.iter().enumerate() {
        nonce[12 + i] = b ^ (i as u8);
    }

    nonce
}

/// Compute the CMAC trailer (first 4 bytes of HMAC-SHA256)
fn compute_mic(key: &DeviceKey, nonce: &[u8; 16], ciphertext: &[u8]) -> Result<[u8; CMAC_LEN], CryptoError> {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .map_err(|_| CryptoError::InvalidKeyLength)?;
    mac.update(nonce);
    mac.update(ciphertext);

    let result = mac.finalize().into_bytes();
    let mut mic = [0u8; CMAC_LEN];
    mic.copy_from_slice(&result[..CMAC_LEN]);
    Ok(mic)
}
