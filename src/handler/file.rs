//! Filesystem session handler
//!
//! One file per session id under a configured directory. The payload is
//! the file's entire contents; freshness for garbage collection comes
//! from the file's modification time. Dotfiles in the directory are left
//! alone.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tokio::fs;

use super::SessionHandler;
use crate::error::SessionError;

/// Session handler storing each session as a file named by its id.
pub struct FileSessionHandler {
    path: PathBuf,
}

impl FileSessionHandler {
    /// Create a handler rooted at `path`. The directory is created on
    /// first write, not here.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn session_path(&self, session_id: &str) -> PathBuf {
        self.path.join(session_id)
    }

    /// Storage directory for this handler.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionHandler for FileSessionHandler {
    async fn read(&self, session_id: &str) -> String {
        fs::read_to_string(self.session_path(session_id))
            .await
            .unwrap_or_default()
    }

    async fn write(&self, session_id: &str, payload: &str) -> Result<(), SessionError> {
        fs::create_dir_all(&self.path).await?;
        fs::write(self.session_path(session_id), payload).await?;
        Ok(())
    }

    async fn destroy(&self, session_id: &str) -> Result<(), SessionError> {
        match fs::remove_file(self.session_path(session_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn gc(&self, max_age_ms: u64) {
        let mut entries = match fs::read_dir(&self.path).await {
            Ok(entries) => entries,
            Err(_) => return,
        };
        let cutoff = SystemTime::now() - Duration::from_millis(max_age_ms);

        while let Ok(Some(entry)) = entries.next_entry().await {
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }

            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }

            let stale = metadata.modified().map(|m| m < cutoff).unwrap_or(false);
            if stale {
                if let Err(e) = fs::remove_file(entry.path()).await {
                    tracing::warn!("failed to remove expired session file: {}", e);
                }
            }
        }
    }
}
