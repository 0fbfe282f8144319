//! AES-256-GCM with the authentication tag carried as its own field.
//!
//! The AEAD library produces `ciphertext ‖ tag`; the wire format transports
//! them separately, so [`encrypt`] splits the trailing 16 bytes off and
//! [`decrypt`] glues them back before verification.
//!
//! **Nonces must never repeat under one key.** GCM nonce reuse leaks the XOR
//! of plaintexts and lets an attacker forge tags.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use common::protocol::{NONCE_LEN, TAG_LEN};
use common::{ProtocolError, Result};
use tracing::warn;

use crate::kdf::GcmKey;

/// Encrypt `plaintext`, returning `(ciphertext, tag)`.
///
/// The ciphertext has the same length as the plaintext.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidEncoding`] if the AEAD rejects the input
/// (only possible for plaintexts beyond the GCM length limit).
pub fn encrypt(
    key: &GcmKey,
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<(Vec<u8>, [u8; TAG_LEN])> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());
    let mut combined = cipher
        .encrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|_| ProtocolError::encoding("aes-gcm rejected the plaintext"))?;

    let split = combined
        .len()
        .checked_sub(TAG_LEN)
        .ok_or_else(|| ProtocolError::encoding("aes-gcm output shorter than its tag"))?;
    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&combined[split..]);
    combined.truncate(split);

    Ok((combined, tag))
}

/// Verify and decrypt. No plaintext is returned unless the tag verifies.
///
/// # Errors
///
/// Returns [`ProtocolError::AuthenticationFailure`] if any bit of the key,
/// nonce, ciphertext, tag, or associated data differs from encryption time.
pub fn decrypt(
    key: &GcmKey,
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
    tag: &[u8; TAG_LEN],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let mut combined = Vec::with_capacity(ciphertext.len() + TAG_LEN);
    combined.extend_from_slice(ciphertext);
    combined.extend_from_slice(tag);

    let cipher = Aes256Gcm::new(key.as_bytes().into());
    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: &combined,
                aad,
            },
        )
        .map_err(|_| {
            warn!(mode = "aes-gcm", "tag verification failed");
            ProtocolError::AuthenticationFailure
        })
}
