//! Redis session handler (feature `redis-handler`)
//!
//! Stores the opaque payload at `sess:<id>` with a TTL, so expiry is
//! native to the backend and the optional `gc` hook stays a no-op.

use std::sync::Arc;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::SessionHandler;
use crate::error::SessionError;

const DEFAULT_PREFIX: &str = "sess:";

/// Session handler backed by Redis with per-key TTL.
pub struct RedisSessionHandler {
    conn: Arc<ConnectionManager>,
    prefix: String,
    ttl_secs: u64,
}

impl RedisSessionHandler {
    /// Connect to Redis and derive the key TTL from the session lifetime.
    pub async fn connect(url: &str, lifetime_ms: u64) -> Result<Self, SessionError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn: Arc::new(conn),
            prefix: DEFAULT_PREFIX.to_string(),
            ttl_secs: (lifetime_ms / 1000).max(1),
        })
    }

    /// Override the key prefix (default `sess:`).
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn key(&self, session_id: &str) -> String {
        format!("{}{}", self.prefix, session_id)
    }
}

#[async_trait]
impl SessionHandler for RedisSessionHandler {
    async fn read(&self, session_id: &str) -> String {
        let mut conn = (*self.conn).clone();
        match conn.get::<_, Option<String>>(self.key(session_id)).await {
            Ok(value) => value.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("redis session read failed: {}", e);
                String::new()
            }
        }
    }

    async fn write(&self, session_id: &str, payload: &str) -> Result<(), SessionError> {
        let mut conn = (*self.conn).clone();
        conn.set_ex::<_, _, ()>(self.key(session_id), payload, self.ttl_secs)
            .await?;
        Ok(())
    }

    async fn destroy(&self, session_id: &str) -> Result<(), SessionError> {
        let mut conn = (*self.conn).clone();
        conn.del::<_, ()>(self.key(session_id)).await?;
        Ok(())
    }

    // gc: intentionally the default no-op; Redis TTLs expire keys.
}
