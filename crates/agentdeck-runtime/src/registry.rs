//! In-memory registry of live sessions.
//!
//! Process-local and never persisted: after a restart the registry is empty,
//! which matches reality because the runtime processes are gone too.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use agentdeck_core::QueryControl;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

/// Lifecycle state of a session record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// The runtime is running.
    Active,
    /// Interruption was requested.
    Aborted,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// One live runtime invocation.
#[derive(Clone)]
pub struct SessionRecord {
    /// Session id.
    pub session_id: String,
    /// Interrupt handle of the runtime.
    pub handle: Arc<dyn QueryControl>,
    /// When the record was created.
    pub start_time: DateTime<Utc>,
    /// Current status.
    pub status: SessionStatus,
    /// Staged image files owned by the session.
    pub temp_image_paths: Vec<PathBuf>,
    /// Directory holding the staged images.
    pub temp_dir: Option<PathBuf>,
}

impl fmt::Debug for SessionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRecord")
            .field("session_id", &self.session_id)
            .field("start_time", &self.start_time)
            .field("status", &self.status)
            .field("temp_image_paths", &self.temp_image_paths)
            .field("temp_dir", &self.temp_dir)
            .finish_non_exhaustive()
    }
}

/// Keyed store of live sessions.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an active session, replacing any record with the same id.
    pub async fn add(
        &self,
        session_id: impl Into<String>,
        handle: Arc<dyn QueryControl>,
        temp_image_paths: Vec<PathBuf>,
        temp_dir: Option<PathBuf>,
    ) {
        let session_id = session_id.into();
        let record = SessionRecord {
            session_id: session_id.clone(),
            handle,
            start_time: Utc::now(),
            status: SessionStatus::Active,
            temp_image_paths,
            temp_dir,
        };
        debug!(session_id = %session_id, "Registered session");
        self.sessions.write().await.insert(session_id, record);
    }

    /// Remove a session, returning its record.
    pub async fn remove(&self, session_id: &str) -> Option<SessionRecord> {
        let removed = self.sessions.write().await.remove(session_id);
        if removed.is_some() {
            debug!(session_id = %session_id, "Removed session");
        }
        removed
    }

    /// Remove a session without waiting for the lock.
    ///
    /// Returns `false` only when the lock is held elsewhere; an unknown id
    /// counts as removed.
    pub(crate) fn try_remove(&self, session_id: &str) -> bool {
        match self.sessions.try_write() {
            Ok(mut sessions) => {
                if sessions.remove(session_id).is_some() {
                    debug!(session_id = %session_id, "Removed session");
                }
                true
            },
            Err(_) => false,
        }
    }

    /// Snapshot of a session record.
    pub async fn get(&self, session_id: &str) -> Option<SessionRecord> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Ids of all registered sessions.
    pub async fn list_ids(&self) -> Vec<String> {
        self.sessions.read().await.keys().cloned().collect()
    }

    /// Whether `session_id` is registered and active.
    pub async fn is_active(&self, session_id: &str) -> bool {
        self.sessions
            .read()
            .await
            .get(session_id)
            .is_some_and(|r| r.status == SessionStatus::Active)
    }

    /// Flip a session to aborted. Returns `false` if it is unknown.
    pub async fn mark_aborted(&self, session_id: &str) -> bool {
        match self.sessions.write().await.get_mut(session_id) {
            Some(record) => {
                record.status = SessionStatus::Aborted;
                true
            },
            None => false,
        }
    }

    /// Number of registered sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no sessions are registered.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentdeck_core::AgentError;
    use async_trait::async_trait;

    struct NoopControl;

    #[async_trait]
    impl QueryControl for NoopControl {
        async fn interrupt(&self) -> Result<(), AgentError> {
            Ok(())
        }
    }

    fn handle() -> Arc<dyn QueryControl> {
        Arc::new(NoopControl)
    }

    #[tokio::test]
    async fn test_add_get_remove() {
        let registry = SessionRegistry::new();
        registry
            .add("s1", handle(), vec![PathBuf::from("/tmp/a.png")], None)
            .await;

        let record = registry.get("s1").await.unwrap();
        assert_eq!(record.session_id, "s1");
        assert_eq!(record.status, SessionStatus::Active);
        assert_eq!(record.temp_image_paths.len(), 1);
        assert!(registry.is_active("s1").await);
        assert_eq!(registry.list_ids().await, vec!["s1".to_string()]);

        assert!(registry.remove("s1").await.is_some());
        assert!(registry.remove("s1").await.is_none());
        assert!(registry.get("s1").await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_mark_aborted() {
        let registry = SessionRegistry::new();
        registry.add("s1", handle(), vec![], None).await;

        assert!(registry.mark_aborted("s1").await);
        assert!(!registry.is_active("s1").await);
        assert_eq!(
            registry.get("s1").await.unwrap().status,
            SessionStatus::Aborted
        );
        assert!(!registry.mark_aborted("missing").await);
    }

    #[tokio::test]
    async fn test_unknown_is_inactive() {
        let registry = SessionRegistry::new();
        assert!(!registry.is_active("nope").await);
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn test_list_many() {
        let registry = SessionRegistry::new();
        registry.add("a", handle(), vec![], None).await;
        registry.add("b", handle(), vec![], None).await;
        let mut ids = registry.list_ids().await;
        ids.sort();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_try_remove() {
        let registry = SessionRegistry::new();
        registry.add("s1", handle(), vec![], None).await;
        assert!(registry.try_remove("s1"));
        assert!(registry.is_empty().await);
        assert!(registry.try_remove("s1"));

        registry.add("s2", handle(), vec![], None).await;
        let held = registry.sessions.read().await;
        assert!(!registry.try_remove("s2"));
        drop(held);
        assert!(registry.is_active("s2").await);
    }
}
