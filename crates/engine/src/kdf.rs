//! Deterministic key derivation shared with the peer implementation.
//!
//! Both sides turn the same passphrase into the same key with no handshake,
//! so every constant here is part of the wire contract:
//!
//! | Mode         | PRF         | Salt                     | Iterations | Output |
//! |--------------|-------------|--------------------------|------------|--------|
//! | AES-GCM      | HMAC-SHA256 | `mitm-aes-gcm-salt`      | 10 000     | 32     |
//! | AES-CBC-HMAC | HMAC-SHA512 | `mitm-aes-cbc-hmac-salt` | 10 000     | 64     |
//!
//! The salts are public, so derivation strength rests entirely on the
//! iteration count and the entropy of the material. Low-entropy passphrases
//! are brute-forceable offline.

use std::fmt;

use common::protocol::KEY_LEN;
use common::{ProtocolError, Result};
use pbkdf2::pbkdf2_hmac;
use sha2::{Sha256, Sha512};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::random::RandomSource;

/// PBKDF2 salt for AES-GCM keys.
pub const GCM_SALT: &[u8] = b"mitm-aes-gcm-salt";

/// PBKDF2 salt for AES-CBC-HMAC key pairs.
pub const CBC_HMAC_SALT: &[u8] = b"mitm-aes-cbc-hmac-salt";

/// PBKDF2 iteration count for both modes.
pub const PBKDF2_ITERATIONS: u32 = 10_000;

/// Length of a CBC-HMAC derivation: encryption key then MAC key.
pub const CBC_HMAC_DERIVED_LEN: usize = 2 * KEY_LEN;

/// Caller-supplied secret.
///
/// The variant decides whether derivation runs:
/// - [`KeyMaterial::Passphrase`] is always derived, whatever its length.
/// - [`KeyMaterial::Raw`] is used as-is when its length equals the key length
///   it is resolved into, and derived otherwise.
#[derive(Clone, Copy)]
pub enum KeyMaterial<'a> {
    Raw(&'a [u8]),
    Passphrase(&'a str),
}

impl<'a> KeyMaterial<'a> {
    /// The material as bytes (UTF-8 for passphrases).
    pub fn as_bytes(&self) -> &'a [u8] {
        match *self {
            KeyMaterial::Raw(b) => b,
            KeyMaterial::Passphrase(s) => s.as_bytes(),
        }
    }

    fn non_empty(&self) -> Result<&'a [u8]> {
        let bytes = self.as_bytes();
        if bytes.is_empty() {
            return Err(ProtocolError::InvalidKeyMaterial(
                "key material must not be empty".into(),
            ));
        }
        Ok(bytes)
    }

    /// Returns the material as a ready-to-use key if it is raw and exactly `N` bytes.
    fn ready_key<const N: usize>(&self) -> Option<&'a [u8; N]> {
        match *self {
            KeyMaterial::Raw(b) => <&[u8; N]>::try_from(b).ok(),
            KeyMaterial::Passphrase(_) => None,
        }
    }
}

impl fmt::Debug for KeyMaterial<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyMaterial::Raw(b) => write!(f, "KeyMaterial::Raw([REDACTED; {}])", b.len()),
            KeyMaterial::Passphrase(_) => f.write_str("KeyMaterial::Passphrase([REDACTED])"),
        }
    }
}

/// Fixed-size secret buffer that overwrites itself with zeroes on drop.
pub struct KeyBytes<const N: usize>(Box<[u8; N]>);

/// Final AES-256-GCM key.
pub type GcmKey = KeyBytes<KEY_LEN>;

impl<const N: usize> KeyBytes<N> {
    fn zeroed() -> Self {
        Self(Box::new([0u8; N]))
    }

    /// Copy `src` into a new buffer.
    pub fn copy_from(src: &[u8; N]) -> Self {
        let mut key = Self::zeroed();
        key.0.copy_from_slice(src);
        key
    }

    /// Fill a new buffer straight from `rng`.
    pub(crate) fn random(rng: &dyn RandomSource) -> Self {
        let mut key = Self::zeroed();
        rng.fill(&mut key.0[..]);
        key
    }

    /// Handle with care: secret key material.
    pub fn as_bytes(&self) -> &[u8; N] {
        &self.0
    }
}

impl KeyBytes<CBC_HMAC_DERIVED_LEN> {
    /// Split a 64-byte derivation into `(enc_key, mac_key)`.
    pub fn split_halves(&self) -> (KeyBytes<KEY_LEN>, KeyBytes<KEY_LEN>) {
        let mut enc = KeyBytes::zeroed();
        let mut mac = KeyBytes::zeroed();
        enc.0.copy_from_slice(&self.0[..KEY_LEN]);
        mac.0.copy_from_slice(&self.0[KEY_LEN..]);
        (enc, mac)
    }
}

impl<const N: usize> Zeroize for KeyBytes<N> {
    fn zeroize(&mut self) {
        self.0.as_mut_slice().zeroize();
    }
}

impl<const N: usize> Drop for KeyBytes<N> {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl<const N: usize> ZeroizeOnDrop for KeyBytes<N> {}

impl<const N: usize> fmt::Debug for KeyBytes<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyBytes<{N}>([REDACTED])")
    }
}

/// PBKDF2-HMAC-SHA256 → 32-byte AES-GCM key.
pub fn derive_gcm_key(material: &[u8]) -> GcmKey {
    let mut key = GcmKey::zeroed();
    pbkdf2_hmac::<Sha256>(material, GCM_SALT, PBKDF2_ITERATIONS, &mut key.0[..]);
    key
}

/// PBKDF2-HMAC-SHA512 → 64 bytes: `[0,32)` encryption key, `[32,64)` MAC key.
pub fn derive_cbc_hmac_key(material: &[u8]) -> KeyBytes<CBC_HMAC_DERIVED_LEN> {
    let mut key = KeyBytes::zeroed();
    pbkdf2_hmac::<Sha512>(material, CBC_HMAC_SALT, PBKDF2_ITERATIONS, &mut key.0[..]);
    key
}

/// Turn material into an AES-GCM key: a raw 32-byte key is used directly,
/// anything else is derived.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidKeyMaterial`] if the material is empty.
pub fn resolve_gcm_key(material: &KeyMaterial<'_>) -> Result<GcmKey> {
    let bytes = material.non_empty()?;
    Ok(match material.ready_key::<KEY_LEN>() {
        Some(raw) => GcmKey::copy_from(raw),
        None => derive_gcm_key(bytes),
    })
}

/// AES-256-CBC encryption key and HMAC-SHA256 key.
#[derive(Debug)]
pub struct CbcHmacKeys {
    enc: KeyBytes<KEY_LEN>,
    mac: KeyBytes<KEY_LEN>,
}

impl CbcHmacKeys {
    /// Pair two ready keys without derivation.
    pub fn new(enc: KeyBytes<KEY_LEN>, mac: KeyBytes<KEY_LEN>) -> Self {
        Self { enc, mac }
    }

    /// Resolve both keys from one material.
    ///
    /// A raw 64-byte material is split directly; anything else is derived and
    /// the derivation split into halves.
    pub fn resolve(material: &KeyMaterial<'_>) -> Result<Self> {
        let bytes = material.non_empty()?;
        let (enc, mac) = match material.ready_key::<CBC_HMAC_DERIVED_LEN>() {
            Some(raw) => KeyBytes::copy_from(raw).split_halves(),
            None => derive_cbc_hmac_key(bytes).split_halves(),
        };
        Ok(Self { enc, mac })
    }

    /// Resolve the keys from two separate materials, the way the peer's
    /// command surface does: the encryption key is the first half of the
    /// derivation of `enc_material`, the MAC key the second half of the
    /// derivation of `mac_material`. Raw 32-byte materials are used directly.
    pub fn resolve_pair(
        enc_material: &KeyMaterial<'_>,
        mac_material: &KeyMaterial<'_>,
    ) -> Result<Self> {
        let enc_bytes = enc_material.non_empty()?;
        let mac_bytes = mac_material.non_empty()?;

        let enc = match enc_material.ready_key::<KEY_LEN>() {
            Some(raw) => KeyBytes::copy_from(raw),
            None => derive_cbc_hmac_key(enc_bytes).split_halves().0,
        };
        let mac = match mac_material.ready_key::<KEY_LEN>() {
            Some(raw) => KeyBytes::copy_from(raw),
            None => derive_cbc_hmac_key(mac_bytes).split_halves().1,
        };
        Ok(Self { enc, mac })
    }

    pub fn enc_key(&self) -> &[u8; KEY_LEN] {
        self.enc.as_bytes()
    }

    pub fn mac_key(&self) -> &[u8; KEY_LEN] {
        self.mac.as_bytes()
    }
}
