//! Session registry — the single owner of the connection-to-context mapping.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use browserlink_core::error::SessionCreateError;
use browserlink_engine::{BrowserContext, BrowserEngine};

/// One connection's server-side state: the browser context it owns.
pub struct Session {
    pub conn_id: String,
    pub created_at: DateTime<Utc>,
    pub context: Box<dyn BrowserContext>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("conn_id", &self.conn_id)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

struct Entry {
    created_at: DateTime<Utc>,
    session: Arc<Mutex<Session>>,
}

/// Maps connection identity to an owned browser context.
///
/// Insert, lookup, and removal are atomic with respect to each other; the
/// map lock is never held across engine work. The per-session mutex inside
/// each entry serializes command execution for that session.
pub struct SessionRegistry {
    engine: Arc<dyn BrowserEngine>,
    sessions: RwLock<HashMap<String, Entry>>,
}

impl SessionRegistry {
    pub fn new(engine: Arc<dyn BrowserEngine>) -> Self {
        Self {
            engine,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Create a browser context for `conn_id` and register the session.
    /// Failure aborts the connection handshake before the command loop.
    pub async fn open(&self, conn_id: &str) -> Result<Arc<Mutex<Session>>, SessionCreateError> {
        let context = self
            .engine
            .new_context()
            .await
            .map_err(|e| SessionCreateError(e.to_string()))?;

        let created_at = Utc::now();
        let session = Arc::new(Mutex::new(Session {
            conn_id: conn_id.to_string(),
            created_at,
            context,
        }));

        let displaced = {
            let mut sessions = self.sessions.write().await;
            sessions.insert(
                conn_id.to_string(),
                Entry {
                    created_at,
                    session: session.clone(),
                },
            )
        };
        if let Some(old) = displaced {
            warn!(conn_id, "Connection id reused, releasing displaced context");
            let mut old_session = old.session.lock().await;
            if let Err(e) = old_session.context.close().await {
                warn!(conn_id, %e, "Displaced context close failed");
            }
        }

        debug!(conn_id, "Session opened");
        Ok(session)
    }

    pub async fn get(&self, conn_id: &str) -> Option<Arc<Mutex<Session>>> {
        self.sessions
            .read()
            .await
            .get(conn_id)
            .map(|entry| entry.session.clone())
    }

    /// Release `conn_id`'s browser context. Idempotent: closing twice or
    /// closing an unknown id is a no-op.
    pub async fn close(&self, conn_id: &str) {
        let entry = self.sessions.write().await.remove(conn_id);
        let Some(entry) = entry else {
            return;
        };

        // An in-flight command holds the session mutex; the context is
        // released only after it finishes.
        let mut session = entry.session.lock().await;
        if let Err(e) = session.context.close().await {
            warn!(conn_id, %e, "Browser context close failed");
        }
        debug!(conn_id, "Session closed");
    }

    pub async fn contains(&self, conn_id: &str) -> bool {
        self.sessions.read().await.contains_key(conn_id)
    }

    pub async fn connected_since(&self, conn_id: &str) -> Option<DateTime<Utc>> {
        self.sessions
            .read()
            .await
            .get(conn_id)
            .map(|entry| entry.created_at)
    }

    pub async fn session_ids(&self) -> Vec<String> {
        self.sessions.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
