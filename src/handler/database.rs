//! Table-backed session handler
//!
//! The relational backend itself stays outside the crate; this module
//! defines the row-level [`SessionModel`] contract it must satisfy and
//! the handler that drives it. The handler tracks whether the session
//! row already exists so a save turns into an insert or an update, and
//! keeps a `last_activity` timestamp per row for garbage collection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use super::SessionHandler;
use crate::error::SessionError;

/// One row of the sessions table.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionRecord {
    /// Session id, unique per row
    pub id: String,
    /// Opaque serialized session payload
    pub payload: String,
    /// Unix timestamp in milliseconds of the last write
    pub last_activity: i64,
}

/// Row-level access to a sessions table, implemented by the external
/// database layer.
#[async_trait]
pub trait SessionModel: Send + Sync + 'static {
    /// Fetch the row with the given id, if any.
    async fn find_one(&self, id: &str) -> Result<Option<SessionRecord>, SessionError>;

    /// Insert a new row.
    async fn create(&self, record: SessionRecord) -> Result<(), SessionError>;

    /// Update payload and last activity of an existing row.
    async fn update(&self, id: &str, payload: &str, last_activity: i64)
        -> Result<(), SessionError>;

    /// Delete the row with the given id.
    async fn destroy(&self, id: &str) -> Result<(), SessionError>;

    /// Delete every row whose `last_activity` is before `cutoff` (unix
    /// milliseconds).
    async fn destroy_older_than(&self, cutoff: i64) -> Result<(), SessionError>;
}

/// Session handler backed by a [`SessionModel`].
pub struct DatabaseSessionHandler {
    model: Arc<dyn SessionModel>,
    exists: AtomicBool,
}

impl DatabaseSessionHandler {
    pub fn new(model: Arc<dyn SessionModel>) -> Self {
        Self {
            model,
            exists: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl SessionHandler for DatabaseSessionHandler {
    async fn read(&self, session_id: &str) -> String {
        match self.model.find_one(session_id).await {
            Ok(Some(record)) => {
                self.exists.store(true, Ordering::SeqCst);
                record.payload
            }
            Ok(None) => String::new(),
            Err(e) => {
                tracing::warn!("session row lookup failed: {}", e);
                String::new()
            }
        }
    }

    async fn write(&self, session_id: &str, payload: &str) -> Result<(), SessionError> {
        let now = Utc::now().timestamp_millis();

        if self.exists.load(Ordering::SeqCst) {
            self.model.update(session_id, payload, now).await?;
        } else {
            self.model
                .create(SessionRecord {
                    id: session_id.to_string(),
                    payload: payload.to_string(),
                    last_activity: now,
                })
                .await?;
        }

        self.exists.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn destroy(&self, session_id: &str) -> Result<(), SessionError> {
        self.model.destroy(session_id).await
    }

    async fn gc(&self, max_age_ms: u64) {
        let cutoff = Utc::now().timestamp_millis() - max_age_ms as i64;
        if let Err(e) = self.model.destroy_older_than(cutoff).await {
            tracing::warn!("session table gc failed: {}", e);
        }
    }

    fn set_exists(&self, value: bool) {
        self.exists.store(value, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Minimal in-memory stand-in for a sessions table.
    #[derive(Default)]
    struct FakeModel {
        rows: Mutex<HashMap<String, SessionRecord>>,
        creates: Mutex<u32>,
        updates: Mutex<u32>,
    }

    #[async_trait]
    impl SessionModel for FakeModel {
        async fn find_one(&self, id: &str) -> Result<Option<SessionRecord>, SessionError> {
            Ok(self.rows.lock().get(id).cloned())
        }

        async fn create(&self, record: SessionRecord) -> Result<(), SessionError> {
            *self.creates.lock() += 1;
            self.rows.lock().insert(record.id.clone(), record);
            Ok(())
        }

        async fn update(
            &self,
            id: &str,
            payload: &str,
            last_activity: i64,
        ) -> Result<(), SessionError> {
            *self.updates.lock() += 1;
            if let Some(row) = self.rows.lock().get_mut(id) {
                row.payload = payload.to_string();
                row.last_activity = last_activity;
            }
            Ok(())
        }

        async fn destroy(&self, id: &str) -> Result<(), SessionError> {
            self.rows.lock().remove(id);
            Ok(())
        }

        async fn destroy_older_than(&self, cutoff: i64) -> Result<(), SessionError> {
            self.rows.lock().retain(|_, row| row.last_activity >= cutoff);
            Ok(())
        }
    }

    #[tokio::test]
    async fn first_write_inserts_following_writes_update() {
        let model = Arc::new(FakeModel::default());
        let handler = DatabaseSessionHandler::new(model.clone());

        handler.write("sid", "one").await.unwrap();
        handler.write("sid", "two").await.unwrap();

        assert_eq!(*model.creates.lock(), 1);
        assert_eq!(*model.updates.lock(), 1);
        assert_eq!(handler.read("sid").await, "two");
    }

    #[tokio::test]
    async fn read_marks_row_as_existing() {
        let model = Arc::new(FakeModel::default());
        model
            .create(SessionRecord {
                id: "sid".to_string(),
                payload: "stored".to_string(),
                last_activity: 0,
            })
            .await
            .unwrap();

        let handler = DatabaseSessionHandler::new(model.clone());
        assert_eq!(handler.read("sid").await, "stored");

        handler.write("sid", "updated").await.unwrap();
        assert_eq!(*model.creates.lock(), 1); // only the seeded row
        assert_eq!(*model.updates.lock(), 1);
    }

    #[tokio::test]
    async fn set_exists_false_forces_insert() {
        let model = Arc::new(FakeModel::default());
        let handler = DatabaseSessionHandler::new(model.clone());

        handler.write("sid", "one").await.unwrap();
        handler.set_exists(false);
        handler.write("new-sid", "fresh").await.unwrap();

        assert_eq!(*model.creates.lock(), 2);
    }

    #[tokio::test]
    async fn gc_removes_idle_rows() {
        let model = Arc::new(FakeModel::default());
        let now = Utc::now().timestamp_millis();
        for (id, age_ms) in [("old", 120_000), ("young", 1_000)] {
            model
                .create(SessionRecord {
                    id: id.to_string(),
                    payload: String::new(),
                    last_activity: now - age_ms,
                })
                .await
                .unwrap();
        }

        let handler = DatabaseSessionHandler::new(model.clone());
        handler.gc(60_000).await;

        let rows = model.rows.lock();
        assert!(!rows.contains_key("old"));
        assert!(rows.contains_key("young"));
    }
}
