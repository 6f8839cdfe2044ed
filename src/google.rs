//! Google OAuth identity provider.
//!
//! Verifies an access token by calling the OAuth2 userinfo endpoint with it.
//! A non-success response means the token is not valid for this user.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use article_vault_core::identity::IdentityProvider;
use article_vault_core::models::Identity;
use article_vault_core::{VaultError, VaultResult};

/// Shape of the userinfo response (only the fields we keep).
#[derive(Debug, Deserialize)]
struct UserInfo {
    id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    picture: Option<String>,
}

pub struct GoogleIdentityProvider {
    client: reqwest::Client,
    userinfo_url: String,
}

impl GoogleIdentityProvider {
    pub fn new(userinfo_url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            userinfo_url: userinfo_url.into(),
        })
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    async fn verify(&self, access_token: &str) -> VaultResult<Identity> {
        let response = self
            .client
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| VaultError::UpstreamUnavailable(format!("identity provider: {}", e)))?;

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "access token verification failed");
            return Err(VaultError::Unauthorized(
                "Invalid Google access token".to_string(),
            ));
        }

        let info: UserInfo = response
            .json()
            .await
            .map_err(|e| VaultError::UpstreamUnavailable(format!("identity provider: {}", e)))?;

        Ok(Identity {
            external_id: info.id,
            email: info.email,
            name: info.name,
            picture: info.picture,
        })
    }
}
