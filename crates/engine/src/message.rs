//! Envelope-level operations: resolve keys, draw a nonce or IV, run the
//! matching engine, and package the result for the wire.
//!
//! The `*_with` variants take the randomness source explicitly; the plain
//! variants use [`OsRandom`].

use common::{CbcHmacEnvelope, EncMode, EncryptedMessage, GcmEnvelope, ProtocolError, Result};
use tracing::debug;

use crate::kdf::{resolve_gcm_key, CbcHmacKeys, KeyMaterial};
use crate::random::{iv_from, nonce_from, OsRandom, RandomSource};
use crate::{cbc_hmac, gcm};

// ---------------------------------------------------------------------------
// AES-GCM
// ---------------------------------------------------------------------------

/// Encrypt under a fresh random nonce.
pub fn encrypt_gcm(
    material: &KeyMaterial<'_>,
    plaintext: &[u8],
    aad: &[u8],
) -> Result<GcmEnvelope> {
    encrypt_gcm_with(&OsRandom, material, plaintext, aad)
}

pub fn encrypt_gcm_with(
    rng: &dyn RandomSource,
    material: &KeyMaterial<'_>,
    plaintext: &[u8],
    aad: &[u8],
) -> Result<GcmEnvelope> {
    let key = resolve_gcm_key(material)?;
    let nonce = nonce_from(rng);
    let (ciphertext, tag) = gcm::encrypt(&key, &nonce, plaintext, aad)?;
    debug!(mode = "aes-gcm", len = plaintext.len(), "encrypted");
    Ok(GcmEnvelope {
        nonce,
        ciphertext,
        tag,
    })
}

pub fn decrypt_gcm(
    material: &KeyMaterial<'_>,
    envelope: &GcmEnvelope,
    aad: &[u8],
) -> Result<Vec<u8>> {
    let key = resolve_gcm_key(material)?;
    let plaintext = gcm::decrypt(
        &key,
        &envelope.nonce,
        &envelope.ciphertext,
        &envelope.tag,
        aad,
    )?;
    debug!(mode = "aes-gcm", len = plaintext.len(), "decrypted");
    Ok(plaintext)
}

// ---------------------------------------------------------------------------
// AES-CBC-HMAC
// ---------------------------------------------------------------------------

/// Encrypt under a fresh random IV with keys resolved from two materials
/// (see [`CbcHmacKeys::resolve_pair`]).
pub fn encrypt_cbc_hmac(
    enc_material: &KeyMaterial<'_>,
    mac_material: &KeyMaterial<'_>,
    plaintext: &[u8],
    aad: &[u8],
) -> Result<CbcHmacEnvelope> {
    let keys = CbcHmacKeys::resolve_pair(enc_material, mac_material)?;
    seal_cbc_hmac(&OsRandom, &keys, plaintext, aad)
}

pub fn encrypt_cbc_hmac_with(
    rng: &dyn RandomSource,
    enc_material: &KeyMaterial<'_>,
    mac_material: &KeyMaterial<'_>,
    plaintext: &[u8],
    aad: &[u8],
) -> Result<CbcHmacEnvelope> {
    let keys = CbcHmacKeys::resolve_pair(enc_material, mac_material)?;
    seal_cbc_hmac(rng, &keys, plaintext, aad)
}

pub fn decrypt_cbc_hmac(
    enc_material: &KeyMaterial<'_>,
    mac_material: &KeyMaterial<'_>,
    envelope: &CbcHmacEnvelope,
    aad: &[u8],
) -> Result<Vec<u8>> {
    let keys = CbcHmacKeys::resolve_pair(enc_material, mac_material)?;
    open_cbc_hmac(&keys, envelope, aad)
}

fn seal_cbc_hmac(
    rng: &dyn RandomSource,
    keys: &CbcHmacKeys,
    plaintext: &[u8],
    aad: &[u8],
) -> Result<CbcHmacEnvelope> {
    let iv = iv_from(rng);
    let (ciphertext, mac) = cbc_hmac::encrypt(keys, &iv, plaintext, aad)?;
    debug!(mode = "aes-cbc-hmac", len = plaintext.len(), "encrypted");
    Ok(CbcHmacEnvelope { iv, ciphertext, mac })
}

fn open_cbc_hmac(
    keys: &CbcHmacKeys,
    envelope: &CbcHmacEnvelope,
    aad: &[u8],
) -> Result<Vec<u8>> {
    let plaintext = cbc_hmac::decrypt(
        keys,
        &envelope.iv,
        &envelope.ciphertext,
        &envelope.mac,
        aad,
    )?;
    debug!(mode = "aes-cbc-hmac", len = plaintext.len(), "decrypted");
    Ok(plaintext)
}

// ---------------------------------------------------------------------------
// Mode dispatch
// ---------------------------------------------------------------------------

/// Seal `text` in `mode` using a single key material.
///
/// For AES-CBC-HMAC the material yields both keys (see [`CbcHmacKeys::resolve`]).
///
/// # Errors
///
/// Returns [`ProtocolError::UnsupportedMode`] for Diffie-Hellman.
pub fn seal(
    mode: EncMode,
    material: &KeyMaterial<'_>,
    text: &str,
    aad: &[u8],
) -> Result<EncryptedMessage> {
    seal_with(&OsRandom, mode, material, text, aad)
}

pub fn seal_with(
    rng: &dyn RandomSource,
    mode: EncMode,
    material: &KeyMaterial<'_>,
    text: &str,
    aad: &[u8],
) -> Result<EncryptedMessage> {
    match mode.ensure_implemented()? {
        EncMode::Plaintext => Ok(EncryptedMessage::Plaintext { text: text.into() }),
        EncMode::AesGcm => Ok(EncryptedMessage::AesGcm(encrypt_gcm_with(
            rng,
            material,
            text.as_bytes(),
            aad,
        )?)),
        EncMode::AesCbcHmac => {
            let keys = CbcHmacKeys::resolve(material)?;
            Ok(EncryptedMessage::AesCbcHmac(seal_cbc_hmac(
                rng,
                &keys,
                text.as_bytes(),
                aad,
            )?))
        }
        EncMode::DiffieHellman => Err(ProtocolError::UnsupportedMode(mode.into())),
    }
}

/// Open a message sealed by [`seal`] (or the peer) and return its text.
///
/// # Errors
///
/// The engine's authentication or padding error, or
/// [`ProtocolError::InvalidEncoding`] if the plaintext is not UTF-8.
pub fn open(
    material: &KeyMaterial<'_>,
    message: &EncryptedMessage,
    aad: &[u8],
) -> Result<String> {
    match message {
        EncryptedMessage::Plaintext { text } => Ok(text.clone()),
        EncryptedMessage::AesGcm(env) => into_text(decrypt_gcm(material, env, aad)?),
        EncryptedMessage::AesCbcHmac(env) => {
            let keys = CbcHmacKeys::resolve(material)?;
            into_text(open_cbc_hmac(&keys, env, aad)?)
        }
    }
}

/// Interpret decrypted bytes as UTF-8 text.
pub fn into_text(plaintext: Vec<u8>) -> Result<String> {
    String::from_utf8(plaintext)
        .map_err(|_| ProtocolError::encoding("plaintext is not valid UTF-8"))
}
