//! # Article Vault Core
//!
//! Runtime-agnostic logic for Article Vault: data models, the record store
//! abstraction, the identity and article repositories, the save/sync
//! reconciliation engine, and the per-address rate limiter.
//!
//! This crate contains no tokio, sqlx, HTTP, or filesystem dependencies.
//! Concrete store backends (SQLite) and external collaborators (identity
//! provider, summarizer, token service) live in the `article-vault` app crate.

pub mod articles;
pub mod error;
pub mod ids;
pub mod identity;
pub mod limits;
pub mod models;
pub mod ratelimit;
pub mod reconcile;
pub mod store;
pub mod summary;
pub mod validation;

pub use error::{VaultError, VaultResult};
