//! The session store contract and its implementations.

use async_trait::async_trait;
use cadence_identity_core::{IdentityError, IdentityResult};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub const OIDC_STATE_KEY: &str = "oidc_state";
pub const OIDC_VERIFIER_KEY: &str = "oidc_verifier";
pub const USER_ID_KEY: &str = "user_id";

/// Cookie-addressed key/value view of one browser session.
///
/// Writes must be visible to subsequent reads through the same session
/// (read-your-writes). `destroy` removes every key and invalidates the
/// session id.
#[async_trait]
pub trait AuthSession: Send + Sync {
    async fn get(&self, key: &str) -> IdentityResult<Option<Value>>;

    async fn set(&self, key: &str, value: Value) -> IdentityResult<()>;

    async fn delete(&self, key: &str) -> IdentityResult<()>;

    async fn destroy(&self) -> IdentityResult<()>;

    /// Issues a new session id while keeping the data. Called when the
    /// session becomes authenticated.
    async fn renew_id(&self) -> IdentityResult<()>;

    async fn save(&self) -> IdentityResult<()>;
}

fn session_error(err: tower_sessions::session::Error) -> IdentityError {
    IdentityError::SessionError(err.to_string())
}

#[async_trait]
impl AuthSession for tower_sessions::Session {
    async fn get(&self, key: &str) -> IdentityResult<Option<Value>> {
        self.get_value(key).await.map_err(session_error)
    }

    async fn set(&self, key: &str, value: Value) -> IdentityResult<()> {
        self.insert_value(key, value).await.map_err(session_error)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> IdentityResult<()> {
        self.remove_value(key).await.map_err(session_error)?;
        Ok(())
    }

    async fn destroy(&self) -> IdentityResult<()> {
        self.flush().await.map_err(session_error)
    }

    async fn renew_id(&self) -> IdentityResult<()> {
        self.cycle_id().await.map_err(session_error)
    }

    async fn save(&self) -> IdentityResult<()> {
        tower_sessions::Session::save(self).await.map_err(session_error)
    }
}

#[derive(Debug, Default)]
struct SessionData {
    id: u64,
    values: HashMap<String, Value>,
    saves: usize,
    destroyed: bool,
}

/// Session kept in process memory, for tests and tooling. Clones share the
/// same data.
#[derive(Debug, Clone, Default)]
pub struct InMemorySession {
    data: Arc<RwLock<SessionData>>,
}

impl InMemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn id(&self) -> u64 {
        self.data.read().await.id
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.data.read().await.values.contains_key(key)
    }

    pub async fn is_empty(&self) -> bool {
        self.data.read().await.values.is_empty()
    }

    pub async fn save_count(&self) -> usize {
        self.data.read().await.saves
    }

    /// Whether `destroy` has been called at least once.
    pub async fn was_destroyed(&self) -> bool {
        self.data.read().await.destroyed
    }
}

#[async_trait]
impl AuthSession for InMemorySession {
    async fn get(&self, key: &str) -> IdentityResult<Option<Value>> {
        Ok(self.data.read().await.values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> IdentityResult<()> {
        self.data.write().await.values.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> IdentityResult<()> {
        self.data.write().await.values.remove(key);
        Ok(())
    }

    async fn destroy(&self) -> IdentityResult<()> {
        let mut data = self.data.write().await;
        data.values.clear();
        data.id += 1;
        data.destroyed = true;
        Ok(())
    }

    async fn renew_id(&self) -> IdentityResult<()> {
        self.data.write().await.id += 1;
        Ok(())
    }

    async fn save(&self) -> IdentityResult<()> {
        self.data.write().await.saves += 1;
        Ok(())
    }
}
