//! At-rest payload encryption
//!
//! The [`Encrypter`] capability is what an encrypted session store needs
//! from its crypto layer: two string transforms. The default
//! implementation is AES-256-GCM with a key derived from the configured
//! secret; callers can inject their own to interoperate with an existing
//! scheme.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use sha2::{Digest, Sha256};

use crate::error::SessionError;

/// Nonce length for AES-GCM, prepended to the ciphertext.
const NONCE_LEN: usize = 12;

/// Symmetric string encryption capability.
pub trait Encrypter: Send + Sync {
    /// Encrypt a plaintext string into an opaque transport string.
    fn encrypt(&self, plaintext: &str) -> Result<String, SessionError>;

    /// Decrypt a transport string produced by [`Encrypter::encrypt`].
    fn decrypt(&self, ciphertext: &str) -> Result<String, SessionError>;
}

/// AES-256-GCM encrypter keyed by SHA-256 of the configured secret.
///
/// Output format: base64(nonce || ciphertext), with a fresh random nonce
/// per encryption.
pub struct AesGcmEncrypter {
    cipher: Aes256Gcm,
}

impl AesGcmEncrypter {
    /// Build an encrypter from an arbitrary-length secret.
    pub fn new(secret: &str) -> Self {
        let digest = Sha256::digest(secret.as_bytes());
        let key = Key::<Aes256Gcm>::from_slice(&digest);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }
}

impl Encrypter for AesGcmEncrypter {
    fn encrypt(&self, plaintext: &str) -> Result<String, SessionError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| SessionError::Crypto("encryption failed".to_string()))?;

        let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(payload))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, SessionError> {
        let payload = STANDARD
            .decode(ciphertext)
            .map_err(|e| SessionError::Crypto(format!("invalid payload encoding: {}", e)))?;
        if payload.len() < NONCE_LEN {
            return Err(SessionError::Crypto("payload too short".to_string()));
        }

        let (nonce, ciphertext) = payload.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| SessionError::Crypto("decryption failed".to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|e| SessionError::Crypto(format!("invalid plaintext: {}", e)))
    }
}
