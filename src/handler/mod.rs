//! Storage handlers
//!
//! A handler persists one opaque string per session id. The contract is
//! deliberately small so any storage medium fits behind it: read, write,
//! destroy, plus optional garbage collection and existence tracking.

use async_trait::async_trait;

use crate::error::SessionError;

mod database;
mod file;
mod memory;

pub use database::{DatabaseSessionHandler, SessionModel, SessionRecord};
pub use file::FileSessionHandler;
pub use memory::{MemorySessionHandler, SharedSessions};

#[cfg(feature = "redis-handler")]
mod redis_handler;

#[cfg(feature = "redis-handler")]
pub use redis_handler::RedisSessionHandler;

/// Persistence contract a storage backend must satisfy.
///
/// `read` never surfaces a hard error: a missing record, an unreadable
/// record and a backend failure all degrade to an empty string, which the
/// store treats as "no session". Write and destroy failures propagate so
/// the caller can decide what to do with them.
#[async_trait]
pub trait SessionHandler: Send + Sync + 'static {
    /// Read the payload previously written for `session_id`, or an empty
    /// string when absent or on failure.
    async fn read(&self, session_id: &str) -> String;

    /// Persist the opaque payload under `session_id`.
    async fn write(&self, session_id: &str, payload: &str) -> Result<(), SessionError>;

    /// Delete the record for `session_id`.
    async fn destroy(&self, session_id: &str) -> Result<(), SessionError>;

    /// Remove sessions idle for longer than `max_age_ms`.
    ///
    /// Optional; backends with native expiry leave the default no-op.
    async fn gc(&self, _max_age_ms: u64) {}

    /// Inform the backend whether the next write targets an existing
    /// record. Optional; only backends that distinguish insert from
    /// update (relational tables) care.
    fn set_exists(&self, _value: bool) {}
}
