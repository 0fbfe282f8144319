//! The four subcommands and their execution.
//!
//! Key arguments are always treated as passphrases and run through PBKDF2,
//! and every command binds the fixed associated data.

use clap::{Parser, Subcommand};
use common::{CbcHmacEnvelope, GcmEnvelope, Result, FIXED_AAD};
use engine::message::into_text;
use engine::KeyMaterial;

#[derive(Debug, Parser)]
#[command(name = "peercrypt", version, about = "Encrypt and decrypt messages for the peer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Every positional accepts leading hyphens and the subcommands have no
/// `-h`/`--help` flag, so any passphrase or plaintext the peer accepts is taken
/// as a value. Help stays available as `peercrypt help <command>`.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Encrypt with AES-256-GCM under a fresh nonce; prints {nonce, ciphertext, tag}
    #[command(disable_help_flag = true)]
    EncryptGcm {
        #[arg(allow_hyphen_values = true)]
        key: String,
        #[arg(allow_hyphen_values = true)]
        plaintext: String,
    },
    /// Verify the tag and decrypt; prints the plaintext
    #[command(disable_help_flag = true)]
    DecryptGcm {
        #[arg(allow_hyphen_values = true)]
        key: String,
        #[arg(allow_hyphen_values = true)]
        nonce: String,
        #[arg(allow_hyphen_values = true)]
        ciphertext: String,
        #[arg(allow_hyphen_values = true)]
        tag: String,
    },
    /// Encrypt with AES-256-CBC and MAC with HMAC-SHA256; prints {iv, ciphertext, mac}
    #[command(disable_help_flag = true)]
    EncryptCbcHmac {
        #[arg(allow_hyphen_values = true)]
        enc_key: String,
        #[arg(allow_hyphen_values = true)]
        mac_key: String,
        #[arg(allow_hyphen_values = true)]
        plaintext: String,
    },
    /// Verify the MAC, then decrypt; prints the plaintext
    #[command(disable_help_flag = true)]
    DecryptCbcHmac {
        #[arg(allow_hyphen_values = true)]
        enc_key: String,
        #[arg(allow_hyphen_values = true)]
        mac_key: String,
        #[arg(allow_hyphen_values = true)]
        iv: String,
        #[arg(allow_hyphen_values = true)]
        ciphertext: String,
        #[arg(allow_hyphen_values = true)]
        mac: String,
    },
}

impl Command {
    /// Subcommand name as typed on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Command::EncryptGcm { .. } => "encrypt-gcm",
            Command::DecryptGcm { .. } => "decrypt-gcm",
            Command::EncryptCbcHmac { .. } => "encrypt-cbc-hmac",
            Command::DecryptCbcHmac { .. } => "decrypt-cbc-hmac",
        }
    }
}

/// Execute `command` and return what should be printed on stdout.
///
/// # Errors
///
/// Any [`common::ProtocolError`] from decoding, key resolution or the
/// ciphers. Nothing is returned for printing unless the whole command
/// succeeded.
pub fn run(command: &Command) -> Result<String> {
    match command {
        Command::EncryptGcm { key, plaintext } => engine::encrypt_gcm(
            &KeyMaterial::Passphrase(key.as_str()),
            plaintext.as_bytes(),
            &FIXED_AAD,
        )?
        .to_json(),
        Command::DecryptGcm {
            key,
            nonce,
            ciphertext,
            tag,
        } => {
            let envelope = GcmEnvelope::from_base64_parts(nonce, ciphertext, tag)?;
            let material = KeyMaterial::Passphrase(key.as_str());
            let plaintext = engine::decrypt_gcm(&material, &envelope, &FIXED_AAD)?;
            into_text(plaintext)
        }
        Command::EncryptCbcHmac {
            enc_key,
            mac_key,
            plaintext,
        } => engine::encrypt_cbc_hmac(
            &KeyMaterial::Passphrase(enc_key.as_str()),
            &KeyMaterial::Passphrase(mac_key.as_str()),
            plaintext.as_bytes(),
            &FIXED_AAD,
        )?
        .to_json(),
        Command::DecryptCbcHmac {
            enc_key,
            mac_key,
            iv,
            ciphertext,
            mac,
        } => {
            let envelope = CbcHmacEnvelope::from_base64_parts(iv, ciphertext, mac)?;
            let plaintext = engine::decrypt_cbc_hmac(
                &KeyMaterial::Passphrase(enc_key.as_str()),
                &KeyMaterial::Passphrase(mac_key.as_str()),
                &envelope,
                &FIXED_AAD,
            )?;
            into_text(plaintext)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use common::ProtocolError;

    fn parse(args: &[&str]) -> Command {
        let mut argv = vec!["peercrypt"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().command
    }

    fn field(json: &str, name: &str) -> String {
        let v: serde_json::Value = serde_json::from_str(json).unwrap();
        v[name].as_str().unwrap().to_owned()
    }

    #[test]
    fn gcm_round_trip_through_the_command_line() {
        let out = run(&parse(&["encrypt-gcm", "k", "hello world"])).unwrap();
        let decrypt = parse(&[
            "decrypt-gcm",
            "k",
            &field(&out, "nonce"),
            &field(&out, "ciphertext"),
            &field(&out, "tag"),
        ]);
        assert_eq!(run(&decrypt).unwrap(), "hello world");
    }

    #[test]
    fn cbc_hmac_round_trip_through_the_command_line() {
        let out = run(&parse(&["encrypt-cbc-hmac", "e", "m", ""])).unwrap();
        let decrypt = parse(&[
            "decrypt-cbc-hmac",
            "e",
            "m",
            &field(&out, "iv"),
            &field(&out, "ciphertext"),
            &field(&out, "mac"),
        ]);
        assert_eq!(run(&decrypt).unwrap(), "");
    }

    #[test]
    fn decrypts_peer_gcm_vector() {
        let cmd = parse(&[
            "decrypt-gcm",
            "test-key-123",
            "AAECAwQFBgcICQoL",
            "g4muPEjvj/zE60c=",
            "tc5EjxWSpE8pa/FaT0iLSA==",
        ]);
        assert_eq!(run(&cmd).unwrap(), "hello world");
    }

    #[test]
    fn decrypts_peer_cbc_hmac_vector() {
        let cmd = parse(&[
            "decrypt-cbc-hmac",
            "enc1",
            "mac1",
            "AAECAwQFBgcICQoLDA0ODw==",
            "PscYlKs8K3U/d1mqL0xvrQ==",
            "Nh/19d3WRAc5K+nNExQ4sJIiZhSVnF6W1c8VOCram2c=",
        ]);
        assert_eq!(run(&cmd).unwrap(), "hello world");
    }

    #[test]
    fn tampered_inputs_are_errors_not_empty_output() {
        let bad_tag = parse(&[
            "decrypt-gcm",
            "test-key-123",
            "AAECAwQFBgcICQoL",
            "g4muPEjvj/zE60c=",
            "uc5EjxWSpE8pa/FaT0iLSA==",
        ]);
        assert_eq!(run(&bad_tag), Err(ProtocolError::AuthenticationFailure));

        let wrong_mac_key = parse(&[
            "decrypt-cbc-hmac",
            "enc1",
            "mac2",
            "AAECAwQFBgcICQoLDA0ODw==",
            "PscYlKs8K3U/d1mqL0xvrQ==",
            "Nh/19d3WRAc5K+nNExQ4sJIiZhSVnF6W1c8VOCram2c=",
        ]);
        assert_eq!(run(&wrong_mac_key), Err(ProtocolError::MacVerificationFailure));

        let bad_base64 = parse(&["decrypt-gcm", "k", "not base64!", "AA==", "AA=="]);
        assert_eq!(run(&bad_base64).unwrap_err().code(), "invalid_encoding");
    }

    #[test]
    fn hyphenated_keys_and_plaintexts_are_values() {
        let out = run(&parse(&["encrypt-gcm", "-secret", "--help"])).unwrap();
        let decrypt = parse(&[
            "decrypt-gcm",
            "-secret",
            &field(&out, "nonce"),
            &field(&out, "ciphertext"),
            &field(&out, "tag"),
        ]);
        assert_eq!(run(&decrypt).unwrap(), "--help");

        let out = run(&parse(&["encrypt-cbc-hmac", "-e", "--mac", "-h"])).unwrap();
        let decrypt = parse(&[
            "decrypt-cbc-hmac",
            "-e",
            "--mac",
            &field(&out, "iv"),
            &field(&out, "ciphertext"),
            &field(&out, "mac"),
        ]);
        assert_eq!(run(&decrypt).unwrap(), "-h");
    }

    #[test]
    fn plaintext_may_look_like_a_flag() {
        for text in ["-not-a-flag", "-h", "--help", "-V", "--version"] {
            let cmd = parse(&["encrypt-gcm", "k", text]);
            assert!(matches!(
                cmd,
                Command::EncryptGcm { ref plaintext, .. } if plaintext == text
            ));
        }
    }

    #[test]
    fn help_is_still_reachable_from_the_top_level() {
        let err = Cli::try_parse_from(["peercrypt", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        let err = Cli::try_parse_from(["peercrypt", "help", "encrypt-gcm"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn missing_arguments_are_usage_errors() {
        let err = Cli::try_parse_from(["peercrypt", "decrypt-gcm", "k", "n"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert_eq!(err.exit_code(), 2);

        let err = Cli::try_parse_from(["peercrypt"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        let err = Cli::try_parse_from(["peercrypt", "encrypt-dh", "k", "x"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        assert_ne!(err.exit_code(), 0);
    }

    #[test]
    fn names_match_the_command_line() {
        for (args, name) in [
            (vec!["encrypt-gcm", "k", "p"], "encrypt-gcm"),
            (vec!["encrypt-cbc-hmac", "e", "m", "p"], "encrypt-cbc-hmac"),
        ] {
            assert_eq!(parse(&args).name(), name);
        }
    }
}
