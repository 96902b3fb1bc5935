//! Resolves the authenticated user of a session.

use crate::flow::read_user_id;
use crate::session::AuthSession;
use cadence_identity_core::{IdentityError, IdentityResult, LocalUser, UserId, UserStore};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct SessionAuthenticator {
    store: Arc<dyn UserStore>,
}

impl SessionAuthenticator {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// User id bound to the session, if any. A missing, malformed or
    /// unreadable value is treated as unauthenticated.
    pub async fn current_user_id(&self, session: &dyn AuthSession) -> Option<UserId> {
        match read_user_id(session).await {
            Ok(user_id) => user_id,
            Err(err) => {
                warn!("Failed to read session user id: {}", err);
                None
            }
        }
    }

    /// Loads the authenticated user. A session pointing at a user that no
    /// longer exists is unauthenticated.
    pub async fn current_user(&self, session: &dyn AuthSession) -> IdentityResult<LocalUser> {
        let user_id = self
            .current_user_id(session)
            .await
            .ok_or(IdentityError::UnauthenticatedAccess)?;

        match self.store.find_by_id(user_id).await? {
            Some(user) => Ok(user),
            None => {
                debug!("Session references unknown user {}", user_id);
                Err(IdentityError::UnauthenticatedAccess)
            }
        }
    }
}
