//! Maps verified identities onto local user rows.

use cadence_identity_core::{
    IdentityError, IdentityResult, LocalUser, NewLocalUser, UserStore, UserStoreError,
    VerifiedIdentity,
};
use chrono::{TimeDelta, Utc};
use std::sync::Arc;
use tracing::{debug, info};

/// Resolves a verified identity to exactly one local user, creating the row
/// the first time a subject is seen.
///
/// The external subject is the only matching key. On repeat logins only
/// `last_login` changes; the stored email and display name are kept as they
/// were at creation.
#[derive(Clone)]
pub struct UserProvisioner {
    store: Arc<dyn UserStore>,
}

impl UserProvisioner {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    pub async fn provision(&self, identity: &VerifiedIdentity) -> IdentityResult<LocalUser> {
        if let Some(existing) = self.store.find_by_external_subject(&identity.subject).await? {
            return self.record_login(existing).await;
        }

        let new_user = NewLocalUser {
            external_subject: identity.subject.clone(),
            email: identity.email.clone(),
            display_name: identity.display_name.clone(),
            last_login: Some(Utc::now()),
        };

        match self.store.create(new_user).await {
            Ok(user) => {
                info!("Provisioned local user {} for a new subject", user.id);
                Ok(user)
            }
            Err(UserStoreError::Conflict(_)) => {
                // A concurrent callback created the row first.
                debug!("Lost user creation race, retrying as lookup");
                match self.store.find_by_external_subject(&identity.subject).await? {
                    Some(existing) => self.record_login(existing).await,
                    None => Err(IdentityError::ProvisioningConflict(identity.subject.clone())),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn record_login(&self, mut user: LocalUser) -> IdentityResult<LocalUser> {
        let now = Utc::now();
        // last_login must move forward even when the clock has not.
        user.last_login = Some(match user.last_login {
            Some(previous) if previous >= now => previous + TimeDelta::microseconds(1),
            _ => now,
        });

        self.store.update(&user).await?;
        debug!("Recorded login for local user {}", user.id);
        Ok(user)
    }
}
