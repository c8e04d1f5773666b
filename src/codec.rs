//! Payload codecs between the attribute bag and handler storage
//!
//! A [`Store`](crate::Store) serializes its attributes to JSON and then
//! runs the result through a codec before it reaches the handler. The
//! plain codec is the identity; the encrypted codec wraps an
//! [`Encrypter`] so ciphertext is the only thing a handler ever sees.

use std::sync::Arc;

use crate::encrypter::Encrypter;
use crate::error::SessionError;

/// Transform applied to the serialized session payload at the storage
/// boundary.
pub trait PayloadCodec: Send + Sync {
    /// Encode a JSON payload for storage.
    fn encode(&self, payload: String) -> Result<String, SessionError>;

    /// Decode raw storage data back into a JSON payload.
    fn decode(&self, raw: &str) -> Result<String, SessionError>;
}

/// Identity codec: payloads are stored as plain JSON.
pub struct PlainCodec;

impl PayloadCodec for PlainCodec {
    fn encode(&self, payload: String) -> Result<String, SessionError> {
        Ok(payload)
    }

    fn decode(&self, raw: &str) -> Result<String, SessionError> {
        Ok(raw.to_string())
    }
}

/// Codec that encrypts payloads at rest.
pub struct EncryptedCodec {
    encrypter: Arc<dyn Encrypter>,
}

impl EncryptedCodec {
    pub fn new(encrypter: Arc<dyn Encrypter>) -> Self {
        Self { encrypter }
    }
}

impl PayloadCodec for EncryptedCodec {
    fn encode(&self, payload: String) -> Result<String, SessionError> {
        self.encrypter.encrypt(&payload)
    }

    fn decode(&self, raw: &str) -> Result<String, SessionError> {
        self.encrypter.decrypt(raw)
    }
}
