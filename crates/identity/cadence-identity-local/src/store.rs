//! In-memory user store.

use async_trait::async_trait;
use cadence_identity_core::{
    LocalUser, NewLocalUser, UserId, UserStore, UserStoreError, UserStoreResult,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Rows {
    by_id: HashMap<UserId, LocalUser>,
    by_subject: HashMap<String, UserId>,
    last_id: UserId,
}

/// User store kept in process memory. Subject uniqueness is checked and the
/// row inserted under a single write lock.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserStore {
    rows: Arc<RwLock<Rows>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of rows carrying the given external subject.
    pub async fn count_by_external_subject(&self, subject: &str) -> usize {
        self.rows
            .read()
            .await
            .by_id
            .values()
            .filter(|user| user.external_subject == subject)
            .count()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: UserId) -> UserStoreResult<Option<LocalUser>> {
        Ok(self.rows.read().await.by_id.get(&id).cloned())
    }

    async fn find_by_external_subject(&self, subject: &str) -> UserStoreResult<Option<LocalUser>> {
        let rows = self.rows.read().await;
        Ok(rows
            .by_subject
            .get(subject)
            .and_then(|id| rows.by_id.get(id))
            .cloned())
    }

    async fn create(&self, user: NewLocalUser) -> UserStoreResult<LocalUser> {
        let mut rows = self.rows.write().await;
        if rows.by_subject.contains_key(&user.external_subject) {
            return Err(UserStoreError::Conflict(user.external_subject));
        }

        rows.last_id += 1;
        let row = LocalUser {
            id: rows.last_id,
            external_subject: user.external_subject,
            email: user.email,
            display_name: user.display_name,
            last_login: user.last_login,
            created_at: Utc::now(),
        };
        rows.by_subject.insert(row.external_subject.clone(), row.id);
        rows.by_id.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update(&self, user: &LocalUser) -> UserStoreResult<()> {
        let mut rows = self.rows.write().await;
        let previous_subject = match rows.by_id.get(&user.id) {
            Some(existing) => existing.external_subject.clone(),
            None => return Err(UserStoreError::NotFound(user.id)),
        };

        if previous_subject != user.external_subject {
            if rows.by_subject.contains_key(&user.external_subject) {
                return Err(UserStoreError::Conflict(user.external_subject.clone()));
            }
            rows.by_subject.remove(&previous_subject);
            rows.by_subject.insert(user.external_subject.clone(), user.id);
        }

        rows.by_id.insert(user.id, user.clone());
        Ok(())
    }
}
