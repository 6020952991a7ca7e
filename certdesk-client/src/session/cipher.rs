//! Passphrase encryption for persisted sessions
//!
//! Format: base64(salt_16bytes || iv_12bytes || ciphertext || tag_16bytes)
//!
//! The AES-256-GCM key is derived per blob with PBKDF2-HMAC-SHA256 from the
//! application passphrase and the blob's salt.

use std::num::NonZeroU32;

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::Engine;
use ring::pbkdf2;
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// PBKDF2 iteration count for persisted blobs
pub const DEFAULT_ITERATIONS: NonZeroU32 = match NonZeroU32::new(100_000) {
    Some(n) => n,
    None => unreachable!(),
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("Invalid base64")]
    Encoding,

    #[error("Ciphertext too short")]
    Truncated,

    #[error("Invalid key")]
    Key,

    #[error("Encryption failed")]
    Encrypt,

    #[error("Decryption failed (wrong key or tampered data)")]
    Decrypt,

    #[error("Decrypted data is not valid UTF-8")]
    Utf8,
}

/// Passphrase-keyed AES-256-GCM cipher
#[derive(Clone)]
pub struct SessionCipher {
    passphrase: Zeroizing<String>,
    iterations: NonZeroU32,
}

impl std::fmt::Debug for SessionCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCipher")
            .field("iterations", &self.iterations)
            .finish_non_exhaustive()
    }
}

impl SessionCipher {
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self::with_iterations(passphrase, DEFAULT_ITERATIONS)
    }

    /// Cipher with a custom PBKDF2 work factor
    ///
    /// Blobs only decrypt with the iteration count they were written with.
    pub fn with_iterations(passphrase: impl Into<String>, iterations: NonZeroU32) -> Self {
        Self {
            passphrase: Zeroizing::new(passphrase.into()),
            iterations,
        }
    }

    fn derive_key(&self, salt: &[u8]) -> [u8; KEY_LEN] {
        let mut key = [0u8; KEY_LEN];
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            self.iterations,
            salt,
            self.passphrase.as_bytes(),
            &mut key,
        );
        key
    }

    /// Encrypt plaintext → base64(salt || iv || ciphertext || tag)
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let mut salt = [0u8; SALT_LEN];
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut salt);
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut nonce_bytes);

        let mut key = self.derive_key(&salt);
        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| CipherError::Key);
        key.zeroize();
        let cipher = cipher?;

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|_| CipherError::Encrypt)?;

        let mut combined = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
        combined.extend_from_slice(&salt);
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);

        Ok(base64::engine::general_purpose::STANDARD.encode(&combined))
    }

    /// Decrypt base64(salt || iv || ciphertext || tag) → plaintext
    pub fn decrypt(&self, encoded: &str) -> Result<String, CipherError> {
        let data = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|_| CipherError::Encoding)?;

        if data.len() < SALT_LEN + NONCE_LEN + TAG_LEN {
            return Err(CipherError::Truncated);
        }

        let (salt, rest) = data.split_at(SALT_LEN);
        let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);

        let mut key = self.derive_key(salt);
        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| CipherError::Key);
        key.zeroize();

        let plaintext = cipher?
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CipherError::Decrypt)?;

        String::from_utf8(plaintext).map_err(|_| CipherError::Utf8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast(passphrase: &str) -> SessionCipher {
        SessionCipher::with_iterations(passphrase, NonZeroU32::new(1_000).unwrap())
    }

    #[test]
    fn test_round_trip() {
        let cipher = fast("app-secret");
        let blob = cipher.encrypt(r#"{"token":"abc"}"#).unwrap();
        assert_eq!(cipher.decrypt(&blob).unwrap(), r#"{"token":"abc"}"#);
    }

    #[test]
    fn test_fresh_salt_and_iv_per_blob() {
        let cipher = fast("app-secret");
        let a = cipher.encrypt("same").unwrap();
        let b = cipher.encrypt("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_layout() {
        let cipher = fast("app-secret");
        let blob = cipher.encrypt("hello").unwrap();
        let raw = base64::engine::general_purpose::STANDARD.decode(blob).unwrap();
        assert_eq!(raw.len(), SALT_LEN + NONCE_LEN + "hello".len() + TAG_LEN);
    }

    #[test]
    fn test_wrong_passphrase_fails() {
        let blob = fast("one").encrypt("secret").unwrap();
        assert_eq!(fast("two").decrypt(&blob), Err(CipherError::Decrypt));
    }

    #[test]
    fn test_garbage_input() {
        let cipher = fast("app-secret");
        assert_eq!(cipher.decrypt("not base64 !!"), Err(CipherError::Encoding));
        assert_eq!(cipher.decrypt("AAAA"), Err(CipherError::Truncated));
    }

    #[test]
    fn test_default_work_factor() {
        let cipher = SessionCipher::new("app-secret");
        assert_eq!(cipher.iterations.get(), 100_000);
        let blob = cipher.encrypt("x").unwrap();
        assert_eq!(cipher.decrypt(&blob).unwrap(), "x");
    }
}
