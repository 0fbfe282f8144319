//! Common types, wire envelopes, and errors shared across `peercrypt` crates.

pub mod b64;
pub mod error;
pub mod mode;
pub mod protocol;

pub use error::{ProtocolError, Result};
pub use mode::EncMode;
pub use protocol::{CbcHmacEnvelope, EncryptedMessage, ErrorResponse, GcmEnvelope, FIXED_AAD};
