//! Session error types

use std::fmt;

/// Errors that can occur during session operations
#[derive(Debug)]
pub enum SessionError {
    /// Invalid or incomplete configuration (missing secret, bad lottery odds, ...)
    Config(String),
    /// The requested driver name has no built-in or registered factory
    DriverNotSupported(String),
    /// Error from the storage handler
    Store(String),
    /// Error during serialization/deserialization of the attribute bag
    Serialization(String),
    /// Error while encrypting or decrypting a session payload
    Crypto(String),
    /// Redis error (when the redis-handler feature is enabled)
    #[cfg(feature = "redis-handler")]
    Redis(redis::RedisError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Config(msg) => write!(f, "Session configuration error: {}", msg),
            SessionError::DriverNotSupported(name) => {
                write!(f, "Driver {} not supported", name)
            }
            SessionError::Store(msg) => write!(f, "Session store error: {}", msg),
            SessionError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            SessionError::Crypto(msg) => write!(f, "Session crypto error: {}", msg),
            #[cfg(feature = "redis-handler")]
            SessionError::Redis(e) => write!(f, "Redis error: {}", e),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::Store(err.to_string())
    }
}

#[cfg(feature = "redis-handler")]
impl From<redis::RedisError> for SessionError {
    fn from(err: redis::RedisError) -> Self {
        SessionError::Redis(err)
    }
}
