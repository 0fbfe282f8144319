//! Nonce, IV and key generation from the OS CSPRNG.
//!
//! There is no counter and no duplicate tracking: callers must never reuse a
//! nonce under the same AES-GCM key. A 96-bit random nonce keeps collisions
//! negligible for any realistic number of messages per key.

use aes_gcm::aead::{rand_core::RngCore, OsRng};
use common::protocol::{IV_LEN, NONCE_LEN};

use crate::kdf::{CbcHmacKeys, GcmKey, KeyBytes};

/// Source of cryptographically secure random bytes.
///
/// Implementations must be safe to call from any thread without extra
/// coordination.
#[cfg_attr(test, mockall::automock)]
pub trait RandomSource {
    /// Fill `dest` with random bytes.
    fn fill(&self, dest: &mut [u8]);
}

/// The process-wide OS entropy source.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&self, dest: &mut [u8]) {
        OsRng.fill_bytes(dest);
    }
}

/// 12 fresh bytes for AES-GCM.
pub fn generate_nonce() -> [u8; NONCE_LEN] {
    nonce_from(&OsRandom)
}

/// 16 fresh bytes for AES-CBC.
pub fn generate_iv() -> [u8; IV_LEN] {
    iv_from(&OsRandom)
}

pub fn nonce_from(rng: &dyn RandomSource) -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    rng.fill(&mut nonce);
    nonce
}

pub fn iv_from(rng: &dyn RandomSource) -> [u8; IV_LEN] {
    let mut iv = [0u8; IV_LEN];
    rng.fill(&mut iv);
    iv
}

/// A fresh random AES-256-GCM key. No derivation is involved; share it as
/// [`KeyMaterial::Raw`](crate::KeyMaterial::Raw).
pub fn generate_gcm_key() -> GcmKey {
    gcm_key_from(&OsRandom)
}

/// Independent random encryption and MAC keys.
pub fn generate_cbc_hmac_keys() -> CbcHmacKeys {
    cbc_hmac_keys_from(&OsRandom)
}

pub fn gcm_key_from(rng: &dyn RandomSource) -> GcmKey {
    KeyBytes::random(rng)
}

pub fn cbc_hmac_keys_from(rng: &dyn RandomSource) -> CbcHmacKeys {
    let enc = KeyBytes::random(rng);
    let mac = KeyBytes::random(rng);
    CbcHmacKeys::new(enc, mac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{decrypt_cbc_hmac, encrypt_cbc_hmac, encrypt_gcm};
    use crate::{cbc_hmac, gcm, KeyMaterial};
    use common::protocol::KEY_LEN;
    use common::FIXED_AAD;
    use std::collections::HashSet;

    #[test]
    fn sizes() {
        assert_eq!(generate_nonce().len(), 12);
        assert_eq!(generate_iv().len(), 16);
    }

    #[test]
    fn no_duplicates_over_many_draws() {
        let nonces: HashSet<_> = (0..10_000).map(|_| generate_nonce()).collect();
        assert_eq!(nonces.len(), 10_000);

        let ivs: HashSet<_> = (0..10_000).map(|_| generate_iv()).collect();
        assert_eq!(ivs.len(), 10_000);
    }

    #[test]
    fn bits_are_roughly_balanced() {
        let draws = 10_000;
        let ones: u64 = (0..draws)
            .map(|_| {
                generate_nonce()
                    .iter()
                    .map(|b| u64::from(b.count_ones()))
                    .sum::<u64>()
            })
            .sum();
        let total = (draws * NONCE_LEN * 8) as f64;
        let ratio = ones as f64 / total;
        // Expected 0.5 with a standard deviation of about 0.0005.
        assert!((ratio - 0.5).abs() < 0.01, "bit ratio {ratio}");
    }

    #[test]
    fn every_byte_value_appears() {
        let mut seen = [false; 256];
        for _ in 0..1_000 {
            for b in generate_iv() {
                seen[usize::from(b)] = true;
            }
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn draws_go_through_the_source() {
        let mut rng = MockRandomSource::new();
        rng.expect_fill()
            .times(2)
            .returning(|dest| dest.fill(0x5a));

        assert_eq!(nonce_from(&rng), [0x5a; NONCE_LEN]);
        assert_eq!(iv_from(&rng), [0x5a; IV_LEN]);
    }

    #[test]
    fn keys_are_drawn_from_the_source() {
        let mut rng = MockRandomSource::new();
        let mut seq = mockall::Sequence::new();
        rng.expect_fill()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|dest| dest.fill(0x11));
        rng.expect_fill()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|dest| dest.fill(0x22));
        rng.expect_fill()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|dest| dest.fill(0x33));

        let gcm = gcm_key_from(&rng);
        assert_eq!(gcm.as_bytes(), &[0x11; KEY_LEN]);

        let cbc = cbc_hmac_keys_from(&rng);
        assert_eq!(cbc.enc_key(), &[0x22; KEY_LEN]);
        assert_eq!(cbc.mac_key(), &[0x33; KEY_LEN]);
    }

    #[test]
    fn generated_keys_are_fresh_and_independent() {
        assert_ne!(generate_gcm_key().as_bytes(), generate_gcm_key().as_bytes());
        let keys = generate_cbc_hmac_keys();
        assert_ne!(keys.enc_key(), keys.mac_key());
    }

    #[test]
    fn round_trip_under_generated_keys() {
        let key = generate_gcm_key();
        let nonce = generate_nonce();
        let (ct, tag) = gcm::encrypt(&key, &nonce, b"hello world", &FIXED_AAD).unwrap();
        assert_eq!(
            gcm::decrypt(&key, &nonce, &ct, &tag, &FIXED_AAD).unwrap(),
            b"hello world"
        );

        let keys = generate_cbc_hmac_keys();
        let iv = generate_iv();
        let (ct, mac) = cbc_hmac::encrypt(&keys, &iv, b"", &FIXED_AAD).unwrap();
        assert_eq!(cbc_hmac::decrypt(&keys, &iv, &ct, &mac, &FIXED_AAD).unwrap(), b"");
    }

    #[test]
    fn generated_keys_travel_as_raw_material() {
        let key = generate_gcm_key();
        let material = KeyMaterial::Raw(key.as_bytes());
        let env = encrypt_gcm(&material, b"shared", &FIXED_AAD).unwrap();
        assert_eq!(
            gcm::decrypt(&key, &env.nonce, &env.ciphertext, &env.tag, &FIXED_AAD).unwrap(),
            b"shared"
        );

        let keys = generate_cbc_hmac_keys();
        let enc = KeyMaterial::Raw(keys.enc_key());
        let mac = KeyMaterial::Raw(keys.mac_key());
        let env = encrypt_cbc_hmac(&enc, &mac, b"shared", &FIXED_AAD).unwrap();
        assert_eq!(decrypt_cbc_hmac(&enc, &mac, &env, &FIXED_AAD).unwrap(), b"shared");
    }
}
