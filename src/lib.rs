//! # Article Vault
//!
//! A per-user archive of saved web articles for browser-extension clients.
//!
//! Users sign in with a Google access token and receive a bearer token. Each
//! user may keep a bounded number of articles; saving a URL that is already
//! archived merges the new content and highlights into the saved copy, and a
//! batch sync uploads locally stored articles into whatever slots remain.
//!
//! The storage-agnostic engine lives in the `article-vault-core` crate; this
//! crate supplies configuration, the SQLite-backed record store, the external
//! collaborators (Google identity, OpenAI summaries), and the HTTP server.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  HTTP (axum) │──▶│    Vault     │──▶│ RecordStore  │
//! │   /articles  │   │ repos+engine │   │ SQLite / mem │
//! └──────────────┘   └──────┬───────┘   └──────────────┘
//!                           │
//!                 ┌─────────┴─────────┐
//!                 ▼                   ▼
//!          ┌────────────┐      ┌────────────┐
//!          │   Google   │      │   OpenAI   │
//!          │  userinfo  │      │  summaries │
//!          └────────────┘      └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export VAULT_TOKEN_SECRET=$(openssl rand -hex 32)
//! vault init                    # create database
//! vault serve                   # start HTTP server
//! vault purge                   # drop expired records
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`app`] | Service assembly and caller-facing operations |
//! | [`auth`] | Bearer token issuance and verification |
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`google`] | Google OAuth identity provider |
//! | [`migrate`] | Schema migrations |
//! | [`server`] | HTTP server |
//! | [`sqlite_store`] | SQLite record store |
//! | [`summarizer`] | Summary providers |

pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod google;
pub mod migrate;
pub mod server;
pub mod sqlite_store;
pub mod summarizer;

pub use article_vault_core::{VaultError, VaultResult};
