//! Error kinds shared by the codec, the cipher engines, and the CLI.

use thiserror::Error;

/// Result alias used throughout the protocol crates.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Every way a protocol operation can fail.
///
/// No variant ever carries key material or plaintext. Each maps to a stable
/// machine-readable [`ProtocolError::code`] for callers that render errors:
/// - [`ProtocolError::InvalidEncoding`] → `invalid_encoding`
/// - [`ProtocolError::AuthenticationFailure`] → `authentication_failure`
/// - [`ProtocolError::MacVerificationFailure`] → `mac_verification_failure`
/// - [`ProtocolError::PaddingError`] → `padding_error`
/// - [`ProtocolError::UnsupportedMode`] → `unsupported_mode`
/// - [`ProtocolError::InvalidKeyMaterial`] → `invalid_key_material`
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Malformed base64, JSON, or UTF-8 input, or a field of the wrong length.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    /// The AES-GCM tag did not verify.
    #[error("authentication failed")]
    AuthenticationFailure,

    /// The CBC-HMAC mac did not verify. Raised before any decryption happens.
    #[error("mac verification failed")]
    MacVerificationFailure,

    /// PKCS#7 padding was malformed after a successful MAC check.
    #[error("invalid padding")]
    PaddingError,

    /// The mode discriminator is unknown or not implemented here.
    #[error("unsupported mode: {0}")]
    UnsupportedMode(u8),

    /// Key material is unusable (e.g. empty).
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),
}

impl ProtocolError {
    /// Shorthand for [`ProtocolError::InvalidEncoding`].
    pub fn encoding(msg: impl Into<String>) -> Self {
        ProtocolError::InvalidEncoding(msg.into())
    }

    /// Short machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            ProtocolError::InvalidEncoding(_) => "invalid_encoding",
            ProtocolError::AuthenticationFailure => "authentication_failure",
            ProtocolError::MacVerificationFailure => "mac_verification_failure",
            ProtocolError::PaddingError => "padding_error",
            ProtocolError::UnsupportedMode(_) => "unsupported_mode",
            ProtocolError::InvalidKeyMaterial(_) => "invalid_key_material",
        }
    }

    /// Returns `true` for failures of an integrity check (tag or mac).
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            ProtocolError::AuthenticationFailure | ProtocolError::MacVerificationFailure
        )
    }
}
