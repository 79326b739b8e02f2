use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, warn};

use crate::errors::CoreError;
use crate::storage::gateway::PersistenceGateway;
use crate::TradeLedger;

/// Shared handle to one user's ledger. Holding the lock is the per-user queue.
pub type SessionHandle = Arc<Mutex<TradeLedger>>;

/// Slot for one user; filled by the first successful load.
type Slot = Arc<OnceCell<SessionHandle>>;

/// Per-user sessions for hosts that serve more than one user.
///
/// Every user key gets its own `TradeLedger`, loaded lazily from the gateway
/// on first use. Users never share state, and operations for one user run one
/// at a time through that user's mutex. The registry map is only locked to
/// find a user's slot; a slow load blocks callers for that user alone.
pub struct SessionRegistry {
    gateway: Arc<dyn PersistenceGateway>,
    sessions: Mutex<HashMap<String, Slot>>,
}

impl SessionRegistry {
    pub fn new(gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self {
            gateway,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Session for `user_key`, loading it (or starting a new ledger) on first use.
    ///
    /// Concurrent first calls for the same user share one load. A failed
    /// load leaves the slot empty, so the next call tries again.
    pub async fn session(&self, user_key: &str) -> Result<SessionHandle, CoreError> {
        let key = Self::check_key(user_key)?;
        let slot = Arc::clone(
            self.sessions
                .lock()
                .await
                .entry(key.to_string())
                .or_default(),
        );

        let handle = slot
            .get_or_try_init(|| async {
                let ledger = TradeLedger::load(self.gateway.as_ref(), key).await?;
                debug!(user = key, "session opened");
                Ok::<_, CoreError>(Arc::new(Mutex::new(ledger)))
            })
            .await?;
        Ok(Arc::clone(handle))
    }

    /// Session for `user_key` only if it is already open.
    pub async fn existing(&self, user_key: &str) -> Result<SessionHandle, CoreError> {
        self.sessions
            .lock()
            .await
            .get(user_key)
            .and_then(|slot| slot.get().cloned())
            .ok_or_else(|| CoreError::SessionUnavailable(user_key.to_string()))
    }

    /// Save an open session through the gateway.
    pub async fn persist(&self, user_key: &str) -> Result<(), CoreError> {
        let handle = self.existing(user_key).await?;
        let mut ledger = handle.lock().await;
        ledger.persist(self.gateway.as_ref(), user_key).await
    }

    /// Save every open session with unsaved changes. Returns the users whose
    /// save failed; their sessions stay open and dirty.
    pub async fn persist_all(&self) -> Vec<(String, CoreError)> {
        let mut failures = Vec::new();
        for (key, handle) in self.open_handles().await {
            let mut ledger = handle.lock().await;
            if !ledger.has_unsaved_changes() {
                continue;
            }
            if let Err(e) = ledger.persist(self.gateway.as_ref(), &key).await {
                failures.push((key, e));
            }
        }
        failures
    }

    /// Save (if needed) and drop a session. A session whose save fails stays
    /// open so nothing is lost.
    pub async fn close(&self, user_key: &str) -> Result<(), CoreError> {
        let Ok(handle) = self.existing(user_key).await else {
            return Ok(());
        };

        // The user's lock is held until the slot is gone, so no write can
        // slip in between the save and the removal.
        let mut ledger = handle.lock().await;
        if ledger.has_unsaved_changes() {
            if let Err(e) = ledger.persist(self.gateway.as_ref(), user_key).await {
                warn!(user = user_key, error = %e, "keeping session open after failed save");
                return Err(e);
            }
        }

        let mut sessions = self.sessions.lock().await;
        let same_session = sessions
            .get(user_key)
            .and_then(|slot| slot.get())
            .is_some_and(|open| Arc::ptr_eq(open, &handle));
        if same_session {
            sessions.remove(user_key);
            debug!(user = user_key, "session closed");
        }
        Ok(())
    }

    /// Number of users with a loaded session.
    pub async fn open_sessions(&self) -> usize {
        self.sessions
            .lock()
            .await
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    async fn open_handles(&self) -> Vec<(String, SessionHandle)> {
        self.sessions
            .lock()
            .await
            .iter()
            .filter_map(|(key, slot)| slot.get().map(|h| (key.clone(), Arc::clone(h))))
            .collect()
    }

    fn check_key(user_key: &str) -> Result<&str, CoreError> {
        if user_key.trim().is_empty() {
            return Err(CoreError::ValidationError("User key must not be empty".into()));
        }
        Ok(user_key)
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry").finish_non_exhaustive()
    }
}
