//! HTTP server for browser-extension clients.
//!
//! Thin layer over [`Vault`]: each handler authenticates, parses the body,
//! calls one vault operation, and shapes the JSON response.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/health` | Health check (returns version) |
//! | `POST`   | `/auth/google` | Exchange a Google access token for a bearer token |
//! | `GET`    | `/articles` | List saved articles (`?detailed=true` for full records) |
//! | `POST`   | `/articles` | Save an article, or merge into the saved copy of the same URL |
//! | `DELETE` | `/articles/{id}` | Delete one of the caller's articles |
//! | `POST`   | `/articles/sync` | Upload a batch of locally stored articles |
//!
//! `POST /auth/google` and `POST /articles` are rate limited per caller
//! address (first `X-Forwarded-For` entry, else the peer address).
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "invalid_input", "message": "...", "details": ["Title is required"] } }
//! ```
//!
//! Codes: `bad_request`/`invalid_input` (400), `unauthorized` (401),
//! `not_found` (404), `quota_exceeded`/`duplicate_url` (409),
//! `rate_limited` (429), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted; the clients are browser
//! extensions with per-install origins.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use article_vault_core::models::{
    ArticleDraft, ArticleIndexEntry, ArticleReceipt, ListedArticle, SaveAction, SyncItemResult,
    User,
};
use article_vault_core::VaultError;

use crate::app::Vault;
use crate::config::Config;

#[derive(Clone)]
struct AppState {
    vault: Arc<Vault>,
}

/// Opens the configured database and serves until the process is terminated.
///
/// This is the entry point used by `vault serve`.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let vault = Vault::open(config).await?;
    run_server_with_vault(config, Arc::new(vault)).await
}

/// Serves an already assembled [`Vault`] on `[server].bind`.
///
/// Lets callers substitute the store or the identity provider.
pub async fn run_server_with_vault(config: &Config, vault: Arc<Vault>) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = router(vault);

    tracing::info!("article vault listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// The full route table with CORS applied.
pub fn router(vault: Arc<Vault>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/auth/google", post(handle_google_auth))
        .route("/articles", get(handle_list).post(handle_save))
        .route("/articles/sync", post(handle_sync))
        .route("/articles/{id}", delete(handle_delete))
        .layer(cors)
        .with_state(AppState { vault })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<String>>,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
    details: Option<Vec<String>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
                details: self.details,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
        details: None,
    }
}

impl From<VaultError> for AppError {
    fn from(err: VaultError) -> Self {
        let status = match &err {
            VaultError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            VaultError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            VaultError::NotFound(_) => StatusCode::NOT_FOUND,
            VaultError::QuotaExceeded { .. } | VaultError::DuplicateUrl(_) => StatusCode::CONFLICT,
            VaultError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            VaultError::UpstreamUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        match err {
            VaultError::InvalidInput(violations) => AppError {
                status,
                code: "invalid_input".to_string(),
                message: "Invalid input provided".to_string(),
                details: Some(violations),
            },
            VaultError::UpstreamUnavailable(reason) => {
                tracing::error!(%reason, "request failed");
                AppError {
                    status,
                    code: "internal".to_string(),
                    message: "Internal server error".to_string(),
                    details: None,
                }
            }
            other => AppError {
                status,
                code: other.code().to_string(),
                message: other.to_string(),
                details: None,
            },
        }
    }
}

/// Unwraps a JSON body, reporting malformed input in the error contract
/// instead of axum's plain-text rejection.
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| bad_request(rejection.body_text()))
}

// ============ Request context ============

/// Address used as the rate limiting key.
fn caller_address(headers: &HeaderMap, peer: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| peer.ip().to_string())
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    Ok(state.vault.authenticate(authorization).await?)
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    timestamp: DateTime<Utc>,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /auth/google ============

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleAuthRequest {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    user_info: ClaimedUserInfo,
}

#[derive(Deserialize, Default)]
struct ClaimedUserInfo {
    #[serde(default)]
    email: String,
}

#[derive(Serialize)]
struct PublicUser {
    id: String,
    email: String,
    name: String,
    picture: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            picture: user.picture,
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize)]
struct AuthResponse {
    success: bool,
    message: String,
    token: String,
    user: PublicUser,
}

async fn handle_google_auth(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Json<GoogleAuthRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError> {
    state.vault.admit(&caller_address(&headers, peer)).await?;
    let req = json_body(body)?;

    if req.access_token.trim().is_empty() || req.user_info.email.trim().is_empty() {
        return Err(bad_request("Access token and user info are required"));
    }

    let signed_in = state
        .vault
        .sign_in(req.access_token.trim(), &req.user_info.email)
        .await?;

    Ok(Json(AuthResponse {
        success: true,
        message: "Authentication successful".to_string(),
        token: signed_in.token,
        user: signed_in.user.into(),
    }))
}

// ============ GET /articles ============

#[derive(Deserialize, Default)]
struct ListQuery {
    #[serde(default)]
    detailed: Option<String>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Listing {
    Index(Vec<ArticleIndexEntry>),
    Detailed(Vec<ListedArticle>),
}

impl Listing {
    fn len(&self) -> usize {
        match self {
            Listing::Index(entries) => entries.len(),
            Listing::Detailed(articles) => articles.len(),
        }
    }
}

#[derive(Serialize)]
struct ListResponse {
    success: bool,
    articles: Listing,
    count: usize,
    max_articles: usize,
}

async fn handle_list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, AppError> {
    let user = authenticate(&state, &headers).await?;

    let articles = if query.detailed.as_deref() == Some("true") {
        Listing::Detailed(state.vault.list_detailed(&user).await?)
    } else {
        Listing::Index(state.vault.list_index(&user).await?)
    };

    Ok(Json(ListResponse {
        success: true,
        count: articles.len(),
        articles,
        max_articles: state.vault.max_articles(),
    }))
}

// ============ POST /articles ============

#[derive(Serialize)]
struct SaveResponse {
    success: bool,
    message: String,
    action: SaveAction,
    article: ArticleReceipt,
}

async fn handle_save(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Json<ArticleDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<SaveResponse>), AppError> {
    state.vault.admit(&caller_address(&headers, peer)).await?;
    let user = authenticate(&state, &headers).await?;
    let draft = json_body(body)?;

    let outcome = state.vault.save(&user, draft).await?;
    let (status, message) = match outcome.action {
        SaveAction::Created => (StatusCode::CREATED, "Article saved successfully"),
        SaveAction::Updated => (StatusCode::OK, "Article updated successfully"),
    };

    Ok((
        status,
        Json(SaveResponse {
            success: true,
            message: message.to_string(),
            action: outcome.action,
            article: outcome.article,
        }),
    ))
}

// ============ DELETE /articles/{id} ============

#[derive(Serialize)]
struct DeleteResponse {
    success: bool,
    message: String,
}

async fn handle_delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let user = authenticate(&state, &headers).await?;
    state.vault.delete(&user, &id).await?;

    Ok(Json(DeleteResponse {
        success: true,
        message: "Article deleted successfully".to_string(),
    }))
}

// ============ POST /articles/sync ============

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyncRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    local_articles: Vec<ArticleDraft>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<ArticleDraft>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<ArticleDraft>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Serialize)]
struct SyncResponse {
    success: bool,
    message: String,
    cloud_articles: Vec<ArticleIndexEntry>,
    sync_results: Vec<SyncItemResult>,
    skipped_count: usize,
}

async fn handle_sync(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<SyncRequest>, JsonRejection>,
) -> Result<Json<SyncResponse>, AppError> {
    let user = authenticate(&state, &headers).await?;
    let req = json_body(body)?;

    let report = state.vault.sync(&user, req.local_articles).await?;

    Ok(Json(SyncResponse {
        success: true,
        message: "Sync completed".to_string(),
        cloud_articles: report.server_index,
        sync_results: report.results,
        skipped_count: report.skipped_count,
    }))
}
