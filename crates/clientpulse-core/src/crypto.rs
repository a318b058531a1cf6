//! Symmetric encryption for stored OAuth tokens.
//!
//! Tokens are sealed with AES-256-GCM under a server-side key. The stored
//! form is `base64(nonce || ciphertext)` with a fresh 96-bit nonce per call.

use std::fmt;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption key must be base64 for 32 bytes: {0}")]
    InvalidKey(String),

    #[error("token encryption failed")]
    Encryption,

    /// The ciphertext is malformed or was sealed under a different key.
    /// Callers treat this as "re-authorization required".
    #[error("token decryption failed: {0}")]
    Decryption(&'static str),
}

/// Encrypts and decrypts connection tokens.
#[derive(Clone)]
pub struct TokenCipher {
    cipher: Aes256Gcm,
}

impl fmt::Debug for TokenCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCipher").finish_non_exhaustive()
    }
}

impl TokenCipher {
    /// Builds a cipher from a base64-encoded 32-byte key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKey`] if the key is not valid base64 or
    /// does not decode to exactly 32 bytes.
    pub fn from_base64_key(key: &str) -> Result<Self, CryptoError> {
        let bytes = STANDARD
            .decode(key.trim())
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        if bytes.len() != KEY_LEN {
            return Err(CryptoError::InvalidKey(format!(
                "decoded key is {} bytes",
                bytes.len()
            )));
        }
        Ok(Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&bytes)),
        })
    }

    #[must_use]
    pub fn from_key_bytes(key: &[u8; KEY_LEN]) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)),
        }
    }

    /// # Errors
    ///
    /// Returns [`CryptoError::Encryption`] if the AEAD seal fails.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::Encryption)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(nonce.as_slice());
        sealed.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(sealed))
    }

    /// # Errors
    ///
    /// Returns [`CryptoError::Decryption`] if the input is not base64, is too
    /// short to hold a nonce and tag, fails authentication, or is not UTF-8.
    pub fn decrypt(&self, sealed: &str) -> Result<String, CryptoError> {
        let raw = STANDARD
            .decode(sealed.trim())
            .map_err(|_| CryptoError::Decryption("ciphertext is not valid base64"))?;
        if raw.len() <= NONCE_LEN {
            return Err(CryptoError::Decryption("ciphertext is truncated"));
        }

        let (nonce, ciphertext) = raw.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::Decryption("authentication failed"))?;

        String::from_utf8(plaintext)
            .map_err(|_| CryptoError::Decryption("plaintext is not valid UTF-8"))
    }
}
