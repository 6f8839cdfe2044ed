//! The assembled service: repositories, engine, rate limiter, and the
//! external collaborators, wired to one record store.
//!
//! [`Vault`] exposes the caller-facing operations independent of transport;
//! the HTTP layer in [`crate::server`] only parses requests and shapes
//! responses around these calls.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use article_vault_core::articles::ArticleRepository;
use article_vault_core::identity::{IdentityProvider, IdentityRepository};
use article_vault_core::models::{
    ArticleDraft, ArticleIndexEntry, ListedArticle, SaveOutcome, SyncReport, User,
};
use article_vault_core::ratelimit::RateLimiter;
use article_vault_core::reconcile::Reconciler;
use article_vault_core::store::RecordStore;
use article_vault_core::summary::Summarizer;
use article_vault_core::validation::validate_identity;
use article_vault_core::{VaultError, VaultResult};

use crate::auth::TokenService;
use crate::config::Config;
use crate::db;
use crate::google::GoogleIdentityProvider;
use crate::migrate;
use crate::sqlite_store::SqliteRecordStore;
use crate::summarizer::create_summarizer;

pub struct Vault {
    identities: IdentityRepository,
    reconciler: Reconciler,
    rate_limiter: RateLimiter,
    tokens: TokenService,
    identity_provider: Arc<dyn IdentityProvider>,
}

/// Result of a successful sign-in.
#[derive(Debug, Clone)]
pub struct SignIn {
    pub token: String,
    pub user: User,
}

impl Vault {
    /// Wire every component to `store`.
    pub fn new(
        config: &Config,
        store: Arc<dyn RecordStore>,
        tokens: TokenService,
        identity_provider: Arc<dyn IdentityProvider>,
        summarizer: Option<Arc<dyn Summarizer>>,
    ) -> Self {
        let ttls = config.cache.to_ttls();
        let articles = Arc::new(ArticleRepository::new(
            store.clone(),
            config.limits.to_limits(),
            ttls,
        ));
        let mut reconciler = Reconciler::new(articles);
        if let Some(summarizer) = summarizer {
            tracing::info!(model = summarizer.model_name(), "summary enrichment enabled");
            reconciler = reconciler.with_summarizer(summarizer);
        }

        Self {
            identities: IdentityRepository::new(store.clone(), ttls),
            reconciler,
            rate_limiter: RateLimiter::new(
                store,
                config.rate_limit.max_requests_per_minute,
                Duration::from_secs(config.rate_limit.window_secs),
            ),
            tokens,
            identity_provider,
        }
    }

    /// Open the configured SQLite database (applying migrations) and build
    /// the production collaborators.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply(&pool).await?;
        let store = Arc::new(SqliteRecordStore::new(pool));

        let tokens = TokenService::new(
            config.auth.secret()?,
            Duration::from_secs(config.auth.token_ttl_secs),
        );
        let provider = Arc::new(GoogleIdentityProvider::new(&config.auth.userinfo_url)?);
        let summarizer = create_summarizer(&config.summary)?;

        Ok(Self::new(config, store, tokens, provider, summarizer))
    }

    pub fn max_articles(&self) -> usize {
        self.reconciler.articles().limits().max_articles_per_user
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn identities(&self) -> &IdentityRepository {
        &self.identities
    }

    /// Gate a write-path call from `address`.
    pub async fn admit(&self, address: &str) -> VaultResult<()> {
        if self.rate_limiter.admit(address).await? {
            Ok(())
        } else {
            Err(VaultError::RateLimited)
        }
    }

    /// Verify an access token with the identity provider, then create or
    /// refresh the user and issue a bearer token.
    ///
    /// `claimed_email` is what the client says the token belongs to; a
    /// mismatch with the verified identity is rejected.
    pub async fn sign_in(&self, access_token: &str, claimed_email: &str) -> VaultResult<SignIn> {
        let identity = self.identity_provider.verify(access_token).await?;
        if identity.email != claimed_email {
            return Err(VaultError::Unauthorized(
                "Token does not match user information".to_string(),
            ));
        }
        validate_identity(&identity).map_err(VaultError::InvalidInput)?;

        let user = self.identities.create_or_update(&identity).await?;
        let token = self.tokens.issue(&user)?;
        tracing::info!(user_id = %user.id, "signed in");
        Ok(SignIn { token, user })
    }

    /// Resolve an `Authorization` header to the calling user.
    pub async fn authenticate(&self, authorization: Option<&str>) -> VaultResult<User> {
        self.tokens
            .authenticate(&self.identities, authorization)
            .await
    }

    pub async fn list_index(&self, user: &User) -> VaultResult<Vec<ArticleIndexEntry>> {
        self.reconciler.articles().list_index(&user.id).await
    }

    pub async fn list_detailed(&self, user: &User) -> VaultResult<Vec<ListedArticle>> {
        self.reconciler.articles().list_detailed(&user.id).await
    }

    pub async fn save(&self, user: &User, draft: ArticleDraft) -> VaultResult<SaveOutcome> {
        self.reconciler.save(&user.id, draft).await
    }

    /// Delete one of the caller's articles. A missing or foreign article is
    /// reported the same way: `NotFound`.
    pub async fn delete(&self, user: &User, article_id: &str) -> VaultResult<()> {
        if self.reconciler.articles().delete(&user.id, article_id).await? {
            Ok(())
        } else {
            Err(VaultError::NotFound("Article not found".to_string()))
        }
    }

    pub async fn sync(&self, user: &User, drafts: Vec<ArticleDraft>) -> VaultResult<SyncReport> {
        self.reconciler.sync(&user.id, drafts).await
    }
}
