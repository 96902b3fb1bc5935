//! Local user records and the store contract the provisioner relies on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type UserId = u64;

/// A user row owned by this application.
///
/// `external_subject` is the sole identity key; `email` is informational and
/// may repeat across rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalUser {
    pub id: UserId,
    pub external_subject: String,
    pub email: String,
    pub display_name: String,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when creating a user; the store assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLocalUser {
    pub external_subject: String,
    pub email: String,
    pub display_name: String,
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UserStoreError {
    /// Another row already owns this external subject.
    #[error("User with subject {0} already exists")]
    Conflict(String),

    #[error("User {0} not found")]
    NotFound(UserId),
}

pub type UserStoreResult<T> = Result<T, UserStoreError>;

/// Persistence for [`LocalUser`] rows.
///
/// Implementations must enforce uniqueness of `external_subject` atomically:
/// of two concurrent `create` calls for the same subject exactly one succeeds
/// and the other returns [`UserStoreError::Conflict`].
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> UserStoreResult<Option<LocalUser>>;

    async fn find_by_external_subject(&self, subject: &str) -> UserStoreResult<Option<LocalUser>>;

    async fn create(&self, user: NewLocalUser) -> UserStoreResult<LocalUser>;

    async fn update(&self, user: &LocalUser) -> UserStoreResult<()>;
}
