//! Authenticated session shared by every API call.
//!
//! The token lives in memory behind a lock and is mirrored to a
//! [`TokenStore`] so it survives restarts of the CLI.

use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{DashboardError, Result};

const TOKEN_KEY: &str = "token";

pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, token: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Token persisted in a sled tree
pub struct SledTokenStore {
    db: sled::Db,
}

impl SledTokenStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Opening session store at {}", path.display());
        Ok(Self {
            db: sled::open(path)?,
        })
    }

    pub fn from_db(db: sled::Db) -> Self {
        Self { db }
    }
}

impl TokenStore for SledTokenStore {
    fn load(&self) -> Result<Option<String>> {
        match self.db.get(TOKEN_KEY)? {
            Some(bytes) => String::from_utf8(bytes.to_vec())
                .map(Some)
                .map_err(|e| DashboardError::Session(e.to_string())),
            None => Ok(None),
        }
    }

    fn save(&self, token: &str) -> Result<()> {
        self.db.insert(TOKEN_KEY, token.as_bytes())?;
        self.db.flush()?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.db.remove(TOKEN_KEY)?;
        self.db.flush()?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.token.lock().map_err(|e| DashboardError::Session(e.to_string()))?.clone())
    }

    fn save(&self, token: &str) -> Result<()> {
        *self.token.lock().map_err(|e| DashboardError::Session(e.to_string()))? = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.token.lock().map_err(|e| DashboardError::Session(e.to_string()))? = None;
        Ok(())
    }
}

/// Process-wide session context, cloned into every component that calls the API
#[derive(Clone)]
pub struct SessionContext {
    token: Arc<RwLock<Option<String>>>,
    store: Arc<dyn TokenStore>,
}

impl SessionContext {
    /// Restores a previously persisted token, if any
    pub fn restore(store: Arc<dyn TokenStore>) -> Result<Self> {
        let token = store.load()?;
        if token.is_some() {
            debug!("Restored persisted session");
        }
        Ok(Self {
            token: Arc::new(RwLock::new(token)),
            store,
        })
    }

    pub fn in_memory() -> Self {
        Self {
            token: Arc::new(RwLock::new(None)),
            store: Arc::new(MemoryTokenStore::default()),
        }
    }

    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }

    /// Persists first so a failed write never leaves a half-set session
    pub async fn set(&self, token: String) -> Result<()> {
        self.store.save(&token)?;
        *self.token.write().await = Some(token);
        info!("Session established");
        Ok(())
    }

    /// Forgets the token in memory first; the store is cleared without
    /// holding the lock.
    pub async fn clear(&self) -> Result<()> {
        let previous = self.token.write().await.take();
        if previous.is_some() {
            info!("Session cleared");
        }
        self.store.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingStore;

    impl TokenStore for FailingStore {
        fn load(&self) -> Result<Option<String>> {
            Ok(None)
        }
        fn save(&self, _token: &str) -> Result<()> {
            Err(DashboardError::Session("disk full".to_string()))
        }
        fn clear(&self) -> Result<()> {
            Ok(())
        }
    }

    /// Records whether the session lock was free while the store was cleared
    struct LockCheckingStore {
        token: Arc<RwLock<Option<String>>>,
        unlocked_during_clear: Mutex<Option<bool>>,
    }

    impl TokenStore for LockCheckingStore {
        fn load(&self) -> Result<Option<String>> {
            Ok(None)
        }
        fn save(&self, _token: &str) -> Result<()> {
            Ok(())
        }
        fn clear(&self) -> Result<()> {
            let free = self.token.try_write().is_ok();
            *self.unlocked_during_clear.lock().unwrap() = Some(free);
            Ok(())
        }
    }

    fn temp_db() -> sled::Db {
        sled::Config::new().temporary(true).open().unwrap()
    }

    #[tokio::test]
    async fn test_set_and_clear() {
        let session = SessionContext::in_memory();
        assert!(!session.is_authenticated().await);

        session.set("abc".to_string()).await.unwrap();
        assert_eq!(session.token().await.as_deref(), Some("abc"));

        session.clear().await.unwrap();
        assert_eq!(session.token().await, None);
    }

    #[tokio::test]
    async fn test_clear_releases_lock_before_store() {
        let token = Arc::new(RwLock::new(Some("abc".to_string())));
        let store = Arc::new(LockCheckingStore {
            token: Arc::clone(&token),
            unlocked_during_clear: Mutex::new(None),
        });
        let session = SessionContext {
            token,
            store: store.clone(),
        };

        session.clear().await.unwrap();
        assert_eq!(*store.unlocked_during_clear.lock().unwrap(), Some(true));
        assert!(!session.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_token_survives_restore() {
        let db = temp_db();
        let store: Arc<dyn TokenStore> = Arc::new(SledTokenStore::from_db(db.clone()));

        let session = SessionContext::restore(Arc::clone(&store)).unwrap();
        session.set("persisted".to_string()).await.unwrap();

        let restored = SessionContext::restore(Arc::new(SledTokenStore::from_db(db))).unwrap();
        assert_eq!(restored.token().await.as_deref(), Some("persisted"));
    }

    #[tokio::test]
    async fn test_failed_persist_leaves_session_empty() {
        let session = SessionContext::restore(Arc::new(FailingStore)).unwrap();

        let result = session.set("abc".to_string()).await;
        assert!(matches!(result, Err(DashboardError::Session(_))));
        assert!(!session.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let session = SessionContext::in_memory();
        let other = session.clone();

        session.set("shared".to_string()).await.unwrap();
        assert_eq!(other.token().await.as_deref(), Some("shared"));
    }
}
