//! Wire envelopes and the constants both peers must share bit-exact.
//!
//! Binary fields travel as padded standard base64 inside flat JSON objects:
//!
//! ```text
//! AES-GCM:      {"nonce": .., "ciphertext": .., "tag": ..}
//! AES-CBC-HMAC: {"iv": .., "ciphertext": .., "mac": ..}
//! ```
//!
//! [`EncryptedMessage`] adds an integer `mode` field to the same flat shape so
//! a receiver can dispatch without out-of-band knowledge.

use serde::{Deserialize, Serialize};

use crate::b64;
use crate::error::{ProtocolError, Result};
use crate::mode::EncMode;

// ---------------------------------------------------------------------------
// Field sizes
// ---------------------------------------------------------------------------

/// AES-256 key length.
pub const KEY_LEN: usize = 32;

/// AES-GCM nonce length.
pub const NONCE_LEN: usize = 12;

/// AES-CBC initialisation vector length (one AES block).
pub const IV_LEN: usize = 16;

/// AES-GCM authentication tag length.
pub const TAG_LEN: usize = 16;

/// HMAC-SHA256 output length.
pub const MAC_LEN: usize = 32;

// ---------------------------------------------------------------------------
// Associated data
// ---------------------------------------------------------------------------

/// Message-type tag at the front of every associated-data block.
pub const AAD_TAG: [u8; 4] = *b"DATA";

/// Associated-data length: tag followed by a big-endian `u64`.
pub const AAD_LEN: usize = 12;

/// Associated data used by every command: `"DATA"` followed by 8 zero bytes.
///
/// Constant across messages, so it gives domain separation only, no replay
/// protection.
pub const FIXED_AAD: [u8; AAD_LEN] = sequenced_aad(0);

/// `"DATA" ‖ seq` (big-endian), the framing used by sequenced transports.
pub const fn sequenced_aad(seq: u64) -> [u8; AAD_LEN] {
    let seq = seq.to_be_bytes();
    let mut out = [0u8; AAD_LEN];
    let mut i = 0;
    while i < AAD_TAG.len() {
        out[i] = AAD_TAG[i];
        i += 1;
    }
    while i < AAD_LEN {
        out[i] = seq[i - AAD_TAG.len()];
        i += 1;
    }
    out
}

// ---------------------------------------------------------------------------
// Per-mode envelopes
// ---------------------------------------------------------------------------

/// AES-256-GCM output with the tag carried separately from the ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GcmEnvelope {
    #[serde(with = "crate::b64::array")]
    pub nonce: [u8; NONCE_LEN],
    #[serde(with = "crate::b64::vec")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "crate::b64::array")]
    pub tag: [u8; TAG_LEN],
}

impl GcmEnvelope {
    /// Build an envelope from the three base64 fields as received on the wire.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidEncoding`] on bad base64 or if the nonce
    /// or tag does not decode to its fixed length.
    pub fn from_base64_parts(nonce: &str, ciphertext: &str, tag: &str) -> Result<Self> {
        Ok(Self {
            nonce: b64::decode_fixed("nonce", nonce)?,
            ciphertext: b64::decode("ciphertext", ciphertext)?,
            tag: b64::decode_fixed("tag", tag)?,
        })
    }

    /// Canonical JSON form.
    pub fn to_json(&self) -> Result<String> {
        to_json(self)
    }

    /// Parse the canonical JSON form.
    pub fn from_json(s: &str) -> Result<Self> {
        from_json(s)
    }
}

/// AES-256-CBC output with its detached HMAC-SHA256.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CbcHmacEnvelope {
    #[serde(with = "crate::b64::array")]
    pub iv: [u8; IV_LEN],
    #[serde(with = "crate::b64::vec")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "crate::b64::array")]
    pub mac: [u8; MAC_LEN],
}

impl CbcHmacEnvelope {
    /// Build an envelope from the three base64 fields as received on the wire.
    pub fn from_base64_parts(iv: &str, ciphertext: &str, mac: &str) -> Result<Self> {
        Ok(Self {
            iv: b64::decode_fixed("iv", iv)?,
            ciphertext: b64::decode("ciphertext", ciphertext)?,
            mac: b64::decode_fixed("mac", mac)?,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        to_json(self)
    }

    pub fn from_json(s: &str) -> Result<Self> {
        from_json(s)
    }
}

// ---------------------------------------------------------------------------
// Mode-tagged message
// ---------------------------------------------------------------------------

/// A self-describing message in one of the implemented modes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "WireMessage", try_from = "WireMessage")]
pub enum EncryptedMessage {
    /// Unencrypted text, sent as-is.
    Plaintext { text: String },
    AesGcm(GcmEnvelope),
    AesCbcHmac(CbcHmacEnvelope),
}

impl EncryptedMessage {
    /// The mode discriminator of this message.
    pub fn mode(&self) -> EncMode {
        match self {
            EncryptedMessage::Plaintext { .. } => EncMode::Plaintext,
            EncryptedMessage::AesGcm(_) => EncMode::AesGcm,
            EncryptedMessage::AesCbcHmac(_) => EncMode::AesCbcHmac,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        to_json(self)
    }

    /// Parse a mode-tagged message.
    ///
    /// Unlike going through `serde_json` directly, this keeps the precise
    /// [`ProtocolError`] variant (e.g. `UnsupportedMode`) instead of folding it
    /// into a JSON error.
    pub fn from_json(s: &str) -> Result<Self> {
        let wire: WireMessage = from_json(s)?;
        Self::try_from(wire)
    }
}

/// Flat JSON shape shared by every mode; only the fields of one mode may be set.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireMessage {
    mode: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nonce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ciphertext: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mac: Option<String>,
}

impl From<EncryptedMessage> for WireMessage {
    fn from(msg: EncryptedMessage) -> Self {
        let mode = msg.mode().into();
        match msg {
            EncryptedMessage::Plaintext { text } => WireMessage {
                mode,
                text: Some(text),
                ..Default::default()
            },
            EncryptedMessage::AesGcm(env) => WireMessage {
                mode,
                nonce: Some(b64::encode(env.nonce)),
                ciphertext: Some(b64::encode(&env.ciphertext)),
                tag: Some(b64::encode(env.tag)),
                ..Default::default()
            },
            EncryptedMessage::AesCbcHmac(env) => WireMessage {
                mode,
                iv: Some(b64::encode(env.iv)),
                ciphertext: Some(b64::encode(&env.ciphertext)),
                mac: Some(b64::encode(env.mac)),
                ..Default::default()
            },
        }
    }
}

impl TryFrom<WireMessage> for EncryptedMessage {
    type Error = ProtocolError;

    fn try_from(w: WireMessage) -> Result<Self> {
        let mode = EncMode::try_from(w.mode)?.ensure_implemented()?;
        match mode {
            EncMode::Plaintext => {
                forbid(mode, "nonce", &w.nonce)?;
                forbid(mode, "iv", &w.iv)?;
                forbid(mode, "ciphertext", &w.ciphertext)?;
                forbid(mode, "tag", &w.tag)?;
                forbid(mode, "mac", &w.mac)?;
                Ok(EncryptedMessage::Plaintext {
                    text: require("text", w.text)?,
                })
            }
            EncMode::AesGcm => {
                forbid(mode, "text", &w.text)?;
                forbid(mode, "iv", &w.iv)?;
                forbid(mode, "mac", &w.mac)?;
                Ok(EncryptedMessage::AesGcm(GcmEnvelope::from_base64_parts(
                    &require("nonce", w.nonce)?,
                    &require("ciphertext", w.ciphertext)?,
                    &require("tag", w.tag)?,
                )?))
            }
            EncMode::AesCbcHmac => {
                forbid(mode, "text", &w.text)?;
                forbid(mode, "nonce", &w.nonce)?;
                forbid(mode, "tag", &w.tag)?;
                Ok(EncryptedMessage::AesCbcHmac(CbcHmacEnvelope::from_base64_parts(
                    &require("iv", w.iv)?,
                    &require("ciphertext", w.ciphertext)?,
                    &require("mac", w.mac)?,
                )?))
            }
            EncMode::DiffieHellman => Err(ProtocolError::UnsupportedMode(mode.into())),
        }
    }
}

fn require(field: &str, value: Option<String>) -> Result<String> {
    value.ok_or_else(|| ProtocolError::encoding(format!("missing field `{field}`")))
}

fn forbid(mode: EncMode, field: &str, value: &Option<String>) -> Result<()> {
    if value.is_some() {
        return Err(ProtocolError::encoding(format!(
            "field `{field}` is not allowed in {} messages",
            mode.name()
        )));
    }
    Ok(())
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| ProtocolError::encoding(e.to_string()))
}

fn from_json<T: serde::de::DeserializeOwned>(s: &str) -> Result<T> {
    serde_json::from_str(s).map_err(|e| ProtocolError::encoding(e.to_string()))
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Error body written by callers that surface a [`ProtocolError`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"mac_verification_failure"`).
    pub code: String,
    /// Human-readable description; never contains secrets.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&ProtocolError> for ErrorResponse {
    fn from(e: &ProtocolError) -> Self {
        ErrorResponse::new(e.code(), e.to_string())
    }
}
