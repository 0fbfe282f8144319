//! Standard (padded) base64 transport encoding for binary wire fields.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::{ProtocolError, Result};

/// Encode bytes as padded standard base64.
pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    STANDARD.encode(bytes)
}

/// Decode a base64 field of any length.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidEncoding`] naming `field` if `value` is not
/// valid padded base64.
pub fn decode(field: &str, value: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(value)
        .map_err(|_| ProtocolError::encoding(format!("{field} is not valid base64")))
}

/// Decode a base64 field that must hold exactly `N` bytes.
pub fn decode_fixed<const N: usize>(field: &str, value: &str) -> Result<[u8; N]> {
    let bytes = decode(field, value)?;
    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| {
        ProtocolError::encoding(format!(
            "{field} must be {N} bytes, got {}",
            bytes.len()
        ))
    })
}

/// `#[serde(with = "crate::b64::vec")]` for variable-length fields.
pub mod vec {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        super::decode("field", &s).map_err(serde::de::Error::custom)
    }
}

/// `#[serde(with = "crate::b64::array")]` for fixed-length fields.
pub mod array {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(
        bytes: &[u8; N],
        s: S,
    ) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        d: D,
    ) -> Result<[u8; N], D::Error> {
        let s = String::deserialize(d)?;
        super::decode_fixed::<N>("field", &s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_with_padding() {
        assert_eq!(encode(b"hello world"), "aGVsbG8gd29ybGQ=");
        assert_eq!(encode([0u8; 0]), "");
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = decode("nonce", "!!!").unwrap_err();
        assert_eq!(err.code(), "invalid_encoding");
        assert!(err.to_string().contains("nonce"));
    }

    #[test]
    fn decode_fixed_checks_length() {
        let ok: [u8; 12] = decode_fixed("nonce", "AAECAwQFBgcICQoL").unwrap();
        assert_eq!(ok[11], 11);

        let err = decode_fixed::<16>("iv", "AAECAwQFBgcICQoL").unwrap_err();
        assert!(err.to_string().contains("iv must be 16 bytes, got 12"));
    }
}
