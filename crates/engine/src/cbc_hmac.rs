//! AES-256-CBC with PKCS#7 padding and a detached HMAC-SHA256 (encrypt-then-MAC).
//!
//! The MAC covers `aad ‖ iv ‖ ciphertext`. Decryption is two strictly ordered
//! phases: the MAC is verified in constant time first, and the cipher is not
//! touched at all unless it matches.

use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use common::protocol::{IV_LEN, MAC_LEN};
use common::{ProtocolError, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

use crate::kdf::CbcHmacKeys;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// AES block size.
pub const BLOCK_LEN: usize = 16;

/// Pad, encrypt, then MAC. Returns `(ciphertext, mac)`.
///
/// # Errors
///
/// Only fails if the MAC cannot be keyed, which HMAC never refuses.
pub fn encrypt(
    keys: &CbcHmacKeys,
    iv: &[u8; IV_LEN],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<(Vec<u8>, [u8; MAC_LEN])> {
    let ciphertext = Aes256CbcEnc::new(keys.enc_key().into(), iv.into())
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut mac = [0u8; MAC_LEN];
    mac.copy_from_slice(&keyed_mac(keys, aad, iv, &ciphertext)?.finalize().into_bytes());

    Ok((ciphertext, mac))
}

/// Verify the MAC, then decrypt and strip padding.
pub fn decrypt(
    keys: &CbcHmacKeys,
    iv: &[u8; IV_LEN],
    ciphertext: &[u8],
    mac: &[u8; MAC_LEN],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    decrypt_into(keys, iv, ciphertext, mac, aad, &mut out)?;
    Ok(out)
}

/// Like [`decrypt`], appending the plaintext to `out`.
///
/// `out` is only written once the MAC has verified and the padding is valid;
/// on any error it is left exactly as it was.
///
/// # Errors
///
/// - [`ProtocolError::MacVerificationFailure`] if the MAC does not match. No
///   decryption is attempted.
/// - [`ProtocolError::PaddingError`] if the authenticated ciphertext is not a
///   whole number of blocks or its PKCS#7 padding is malformed.
pub fn decrypt_into(
    keys: &CbcHmacKeys,
    iv: &[u8; IV_LEN],
    ciphertext: &[u8],
    mac: &[u8; MAC_LEN],
    aad: &[u8],
    out: &mut Vec<u8>,
) -> Result<()> {
    // Phase 1: authenticate.
    keyed_mac(keys, aad, iv, ciphertext)?
        .verify_slice(mac)
        .map_err(|_| {
            warn!(mode = "aes-cbc-hmac", "mac verification failed");
            ProtocolError::MacVerificationFailure
        })?;

    // Phase 2: decrypt.
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
        warn!(
            mode = "aes-cbc-hmac",
            len = ciphertext.len(),
            "ciphertext not block aligned"
        );
        return Err(ProtocolError::PaddingError);
    }
    let plaintext = Aes256CbcDec::new(keys.enc_key().into(), iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| {
            warn!(mode = "aes-cbc-hmac", "invalid pkcs7 padding");
            ProtocolError::PaddingError
        })?;

    out.extend_from_slice(&plaintext);
    Ok(())
}

/// HMAC-SHA256 keyed with the MAC key and fed `aad ‖ iv ‖ ciphertext`.
fn keyed_mac(
    keys: &CbcHmacKeys,
    aad: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
) -> Result<HmacSha256> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(keys.mac_key())
        .map_err(|_| ProtocolError::InvalidKeyMaterial("unusable mac key".into()))?;
    mac.update(aad);
    mac.update(iv);
    mac.update(ciphertext);
    Ok(mac)
}
