//! AES-256-GCM and AES-256-CBC-HMAC-SHA256 engines interoperable with the
//! peer implementation.
//!
//! This crate is intentionally free of I/O and process concerns. It provides:
//! - deterministic PBKDF2 key derivation ([`kdf`])
//! - the two cipher engines ([`gcm`], [`cbc_hmac`])
//! - nonce, IV and random key generation ([`random`])
//! - envelope-level encrypt/decrypt and mode dispatch ([`message`])
//!
//! Every operation is a stateless single-shot call, safe to run concurrently
//! from any number of threads. The only shared resource is the OS CSPRNG.
//!
//! # Security invariants
//!
//! - Key material, derived keys, and plaintext are never logged.
//! - No plaintext byte is released when a tag or MAC fails to verify.
//! - CBC-HMAC verifies the MAC before the cipher runs.

pub mod cbc_hmac;
pub mod gcm;
pub mod kdf;
pub mod message;
pub mod random;

pub use common::{ProtocolError, Result};
pub use kdf::{CbcHmacKeys, GcmKey, KeyMaterial};
pub use message::{
    decrypt_cbc_hmac, decrypt_gcm, encrypt_cbc_hmac, encrypt_gcm, open, seal,
};
pub use random::{
    generate_cbc_hmac_keys, generate_gcm_key, generate_iv, generate_nonce, OsRandom, RandomSource,
};
