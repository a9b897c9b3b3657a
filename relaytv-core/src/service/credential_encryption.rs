//! Edge server credential encryption.
//!
//! Credentials for registered edge servers are stored with AES-256-GCM
//! authenticated encryption, keyed by an operator-provided master secret.
//! Without the secret the remote execution channel refuses to operate.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};

use crate::{Error, Result};

/// AES-256-GCM nonce size (96 bits / 12 bytes)
const NONCE_SIZE: usize = 12;

/// Prefix distinguishing encrypted blobs from legacy plaintext JSON.
const ENCRYPTED_PREFIX: &str = "enc:";

/// Key version byte prepended to payloads so keys can be rotated later.
const KEY_VERSION: u8 = 0x01;

#[derive(Clone)]
pub struct CredentialVault {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for CredentialVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVault")
            .field("cipher", &"[REDACTED]")
            .finish()
    }
}

impl CredentialVault {
    /// Build a vault from a 32-byte master key.
    pub fn new(key_bytes: &[u8]) -> Result<Self> {
        if key_bytes.len() != 32 {
            return Err(Error::Configuration(format!(
                "credential master key must be exactly 32 bytes, got {}",
                key_bytes.len()
            )));
        }
        let key = Key::<Aes256Gcm>::from_slice(key_bytes);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    /// Build a vault from the 64-character hex master secret in config.
    pub fn from_hex_key(hex_key: &str) -> Result<Self> {
        let key_bytes = hex::decode(hex_key)
            .map_err(|e| Error::Configuration(format!("invalid hex master key: {e}")))?;
        Self::new(&key_bytes)
    }

    /// Encrypt a credential document for storage.
    ///
    /// Output format: `enc:<base64(version || nonce || ciphertext)>`.
    pub fn encrypt(&self, plaintext: &serde_json::Value) -> Result<String> {
        let plaintext_bytes = serde_json::to_vec(plaintext)?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext_bytes.as_ref())
            .map_err(|e| Error::Internal(format!("credential encryption failed: {e}")))?;

        let mut combined = Vec::with_capacity(1 + NONCE_SIZE + ciphertext.len());
        combined.push(KEY_VERSION);
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);

        let encoded = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, &combined);
        Ok(format!("{ENCRYPTED_PREFIX}{encoded}"))
    }

    /// Decrypt a stored credential document.
    ///
    /// Accepts the `enc:` format, or plaintext JSON for rows predating
    /// encryption (migration compatibility).
    pub fn decrypt(&self, stored: &str) -> Result<serde_json::Value> {
        let Some(encoded) = stored.strip_prefix(ENCRYPTED_PREFIX) else {
            return serde_json::from_str(stored)
                .map_err(|e| Error::Internal(format!("stored credential is not valid JSON: {e}")));
        };

        let combined = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, encoded)
            .map_err(|e| Error::Internal(format!("invalid base64 in stored credential: {e}")))?;

        if combined.len() < 1 + NONCE_SIZE {
            return Err(Error::Internal(
                "stored credential blob too short".to_string(),
            ));
        }

        let version = combined[0];
        if version != KEY_VERSION {
            return Err(Error::Internal(format!(
                "unsupported credential key version: {version}"
            )));
        }

        let (nonce_bytes, ciphertext) = combined[1..].split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self.cipher.decrypt(nonce, ciphertext).map_err(|_| {
            Error::Internal("credential decryption failed (wrong key or corrupted data)".to_string())
        })?;

        serde_json::from_slice(&plaintext)
            .map_err(|e| Error::Internal(format!("decrypted credential is not valid JSON: {e}")))
    }

    /// Whether a stored value is in the encrypted format.
    #[must_use]
    pub fn is_encrypted(stored: &str) -> bool {
        stored.starts_with(ENCRYPTED_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vault() -> CredentialVault {
        CredentialVault::from_hex_key(
            "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f",
        )
        .unwrap()
    }

    #[test]
    fn test_round_trip() {
        let creds = json!({"username": "root", "password": "edge-secret", "port": 22});
        let stored = vault().encrypt(&creds).unwrap();
        assert!(stored.starts_with("enc:"));
        assert_eq!(vault().decrypt(&stored).unwrap(), creds);
    }

    #[test]
    fn test_plaintext_rows_still_readable() {
        let decrypted = vault()
            .decrypt(r#"{"username":"legacy","password":"pw"}"#)
            .unwrap();
        assert_eq!(decrypted["username"], "legacy");
    }

    #[test]
    fn test_wrong_key_fails_authentication() {
        let stored = vault().encrypt(&json!({"k": "v"})).unwrap();
        let other = CredentialVault::new(&[0xabu8; 32]).unwrap();
        assert!(other.decrypt(&stored).is_err());
    }

    #[test]
    fn test_nonces_differ_per_encryption() {
        let creds = json!({"same": "input"});
        let a = vault().encrypt(&creds).unwrap();
        let b = vault().encrypt(&creds).unwrap();
        assert_ne!(a, b);
        assert_eq!(vault().decrypt(&a).unwrap(), vault().decrypt(&b).unwrap());
    }

    #[test]
    fn test_key_length_enforced() {
        assert!(matches!(
            CredentialVault::new(&[0u8; 16]),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_is_encrypted() {
        assert!(CredentialVault::is_encrypted("enc:AAAA"));
        assert!(!CredentialVault::is_encrypted(r#"{"plain":true}"#));
    }
}
