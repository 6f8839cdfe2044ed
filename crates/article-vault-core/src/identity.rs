//! Identity repository: external identity → internal [`User`].
//!
//! Also defines the [`IdentityProvider`] seam. The core trusts whatever
//! tuple a provider returns; verification itself happens in the app crate.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::VaultResult;
use crate::ids;
use crate::limits::CacheTtls;
use crate::models::{Identity, User};
use crate::store::{get_json, keys, set_json, RecordStore};

/// Verifies a client-supplied access token with the external identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange `access_token` for a verified identity tuple.
    ///
    /// Rejected tokens are [`VaultError::Unauthorized`](crate::VaultError::Unauthorized);
    /// provider outages are [`VaultError::UpstreamUnavailable`](crate::VaultError::UpstreamUnavailable).
    async fn verify(&self, access_token: &str) -> VaultResult<Identity>;
}

pub struct IdentityRepository {
    store: Arc<dyn RecordStore>,
    ttls: CacheTtls,
}

impl IdentityRepository {
    pub fn new(store: Arc<dyn RecordStore>, ttls: CacheTtls) -> Self {
        Self { store, ttls }
    }

    /// Look up the user bound to an external identity.
    pub async fn resolve(&self, external_id: &str) -> VaultResult<Option<User>> {
        Ok(get_json(self.store.as_ref(), &keys::user(external_id)).await?)
    }

    /// Internal user id registered for an email address, if any.
    pub async fn resolve_user_id_by_email(&self, email: &str) -> VaultResult<Option<String>> {
        Ok(get_json(self.store.as_ref(), &keys::user_email(email)).await?)
    }

    /// Create the user on first sight of `identity`, otherwise refresh the
    /// mutable profile fields. The id and `created_at` never change.
    pub async fn create_or_update(&self, identity: &Identity) -> VaultResult<User> {
        let now = Utc::now();
        let user = match self.resolve(&identity.external_id).await? {
            Some(existing) => User {
                email: identity.email.clone(),
                name: identity.name.clone(),
                picture: identity.picture.clone(),
                updated_at: now,
                ..existing
            },
            None => {
                let user = User {
                    id: ids::generate("user"),
                    external_id: identity.external_id.clone(),
                    email: identity.email.clone(),
                    name: identity.name.clone(),
                    picture: identity.picture.clone(),
                    article_count: 0,
                    created_at: now,
                    updated_at: now,
                };
                tracing::info!(user_id = %user.id, "created user");
                user
            }
        };

        let store = self.store.as_ref();
        set_json(store, &keys::user(&user.external_id), &user, self.ttls.user).await?;
        set_json(store, &keys::user_email(&user.email), &user.id, self.ttls.user).await?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;

    fn identity(name: &str, email: &str) -> Identity {
        Identity {
            external_id: "g-42".into(),
            email: email.into(),
            name: name.into(),
            picture: None,
        }
    }

    #[tokio::test]
    async fn test_create_then_update_keeps_id() {
        let repo = IdentityRepository::new(Arc::new(InMemoryStore::new()), CacheTtls::default());
        assert!(repo.resolve("g-42").await.unwrap().is_none());

        let first = repo
            .create_or_update(&identity("Ada", "ada@example.com"))
            .await
            .unwrap();
        assert_eq!(first.article_count, 0);

        let mut renamed = identity("Ada L.", "ada@lovelace.example");
        renamed.picture = Some("https://img.example/ada.png".into());
        let second = repo.create_or_update(&renamed).await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.name, "Ada L.");
        assert_eq!(second.picture.as_deref(), Some("https://img.example/ada.png"));
        assert!(second.updated_at >= first.updated_at);

        let resolved = repo.resolve("g-42").await.unwrap().unwrap();
        assert_eq!(resolved, second);
        assert_eq!(
            repo.resolve_user_id_by_email("ada@lovelace.example")
                .await
                .unwrap()
                .as_deref(),
            Some(first.id.as_str())
        );
    }
}
