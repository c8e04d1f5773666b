//! In-memory session handler
//!
//! Backed by a map shared by reference with the manager that built it:
//! every handler the manager hands out sees the same sessions for the
//! lifetime of the process. For development and testing; sessions are
//! lost on restart and never shared across processes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::SessionHandler;
use crate::error::SessionError;

/// Process-lifetime session table, owned by a manager and shared with
/// every memory handler it builds.
pub type SharedSessions = Arc<RwLock<HashMap<String, String>>>;

/// Map-backed session handler.
pub struct MemorySessionHandler {
    sessions: SharedSessions,
}

impl MemorySessionHandler {
    /// Wrap a shared session table.
    pub fn new(sessions: SharedSessions) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl SessionHandler for MemorySessionHandler {
    async fn read(&self, session_id: &str) -> String {
        self.sessions
            .read()
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    async fn write(&self, session_id: &str, payload: &str) -> Result<(), SessionError> {
        self.sessions
            .write()
            .insert(session_id.to_string(), payload.to_string());
        Ok(())
    }

    async fn destroy(&self, session_id: &str) -> Result<(), SessionError> {
        self.sessions.write().remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> (MemorySessionHandler, SharedSessions) {
        let sessions: SharedSessions = Arc::new(RwLock::new(HashMap::new()));
        (MemorySessionHandler::new(sessions.clone()), sessions)
    }

    #[tokio::test]
    async fn read_write_destroy() {
        let (handler, _) = handler();

        assert_eq!(handler.read("sid").await, "");

        handler.write("sid", r#"{"user":"alice"}"#).await.unwrap();
        assert_eq!(handler.read("sid").await, r#"{"user":"alice"}"#);

        handler.destroy("sid").await.unwrap();
        assert_eq!(handler.read("sid").await, "");
    }

    #[tokio::test]
    async fn handlers_share_the_backing_table() {
        let (first, sessions) = handler();
        let second = MemorySessionHandler::new(sessions);

        first.write("sid", "payload").await.unwrap();
        assert_eq!(second.read("sid").await, "payload");
    }
}
