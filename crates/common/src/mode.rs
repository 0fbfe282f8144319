//! Mode registry: the discriminator carried by every [`EncryptedMessage`].
//!
//! [`EncryptedMessage`]: crate::protocol::EncryptedMessage

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};

/// Encryption mode of a message, serialised as its integer discriminator.
///
/// `DiffieHellman` is part of the registry so that peers agree on the number,
/// but key negotiation lives outside this crate: every seal or open on it
/// fails with [`ProtocolError::UnsupportedMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum EncMode {
    Plaintext = 0,
    AesGcm = 1,
    AesCbcHmac = 2,
    DiffieHellman = 3,
}

impl EncMode {
    /// All registered modes, in discriminator order.
    pub const ALL: [EncMode; 4] = [
        EncMode::Plaintext,
        EncMode::AesGcm,
        EncMode::AesCbcHmac,
        EncMode::DiffieHellman,
    ];

    /// Stable lowercase name, used in log fields.
    pub fn name(self) -> &'static str {
        match self {
            EncMode::Plaintext => "plaintext",
            EncMode::AesGcm => "aes-gcm",
            EncMode::AesCbcHmac => "aes-cbc-hmac",
            EncMode::DiffieHellman => "diffie-hellman",
        }
    }

    /// Whether messages in this mode can be sealed and opened here.
    pub fn is_implemented(self) -> bool {
        !matches!(self, EncMode::DiffieHellman)
    }

    /// Fail fast with [`ProtocolError::UnsupportedMode`] for unimplemented modes.
    pub fn ensure_implemented(self) -> Result<Self> {
        if self.is_implemented() {
            Ok(self)
        } else {
            Err(ProtocolError::UnsupportedMode(self.into()))
        }
    }
}

impl From<EncMode> for u8 {
    fn from(mode: EncMode) -> u8 {
        mode as u8
    }
}

impl TryFrom<u8> for EncMode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self> {
        EncMode::ALL
            .into_iter()
            .find(|m| u8::from(*m) == value)
            .ok_or(ProtocolError::UnsupportedMode(value))
    }
}
