//! Bearer token issuance and verification.
//!
//! Tokens are `base64url(claims JSON) "." hex(HMAC-SHA256(secret, payload))`.
//! They carry the caller's external identity id; each request re-resolves
//! the user record through the [`IdentityRepository`], so a token for a user
//! whose record has gone away is rejected with "User not found".

use std::time::Duration;

use anyhow::Result;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use article_vault_core::identity::IdentityRepository;
use article_vault_core::models::User;
use article_vault_core::{VaultError, VaultResult};

type HmacSha256 = Hmac<Sha256>;

pub const INVALID_TOKEN: &str = "Invalid or expired authentication token";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user_id: String,
    pub external_id: String,
    pub email: String,
    pub name: String,
    /// Expiry, unix seconds.
    pub exp: i64,
}

pub struct TokenService {
    secret: Vec<u8>,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: impl Into<Vec<u8>>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| anyhow::anyhow!("invalid token secret: {}", e))
    }

    /// Issue a signed token for `user`.
    pub fn issue(&self, user: &User) -> Result<String> {
        let claims = TokenClaims {
            user_id: user.id.clone(),
            external_id: user.external_id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            exp: Utc::now().timestamp() + self.ttl.as_secs() as i64,
        };
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        Ok(format!("{}.{}", payload, signature))
    }

    /// Check signature and expiry, returning the embedded claims.
    pub fn verify(&self, token: &str) -> VaultResult<TokenClaims> {
        let invalid = || VaultError::Unauthorized(INVALID_TOKEN.to_string());

        let (payload, signature) = token.split_once('.').ok_or_else(invalid)?;
        let signature = hex::decode(signature).map_err(|_| invalid())?;

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature).map_err(|_| invalid())?;

        let bytes = URL_SAFE_NO_PAD.decode(payload).map_err(|_| invalid())?;
        let claims: TokenClaims = serde_json::from_slice(&bytes).map_err(|_| invalid())?;
        if claims.exp <= Utc::now().timestamp() {
            return Err(invalid());
        }
        Ok(claims)
    }

    /// Resolve an `Authorization` header value to the calling user.
    pub async fn authenticate(
        &self,
        identities: &IdentityRepository,
        authorization: Option<&str>,
    ) -> VaultResult<User> {
        let token = authorization
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| VaultError::Unauthorized(INVALID_TOKEN.to_string()))?;

        let claims = self.verify(token)?;
        identities
            .resolve(&claims.external_id)
            .await?
            .ok_or_else(|| VaultError::NotFound("User not found".to_string()))
    }
}
