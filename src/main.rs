//! # Article Vault CLI (`vault`)
//!
//! ## Usage
//!
//! ```bash
//! vault --config ./config/vault.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `vault init` | Create the SQLite database and run schema migrations |
//! | `vault serve` | Start the HTTP server |
//! | `vault purge` | Delete expired records |
//! | `vault token <external-id>` | Issue a bearer token for an existing user |

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use article_vault::auth::TokenService;
use article_vault::config;
use article_vault::db;
use article_vault::migrate;
use article_vault::server;
use article_vault::sqlite_store::SqliteRecordStore;
use article_vault_core::identity::IdentityRepository;

/// Article Vault: a per-user archive of saved web articles.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/vault.example.toml` for a full example.
#[derive(Parser)]
#[command(name = "vault", about = "Article Vault: a per-user archive of saved web articles", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/vault.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Start the HTTP server on `[server].bind`.
    Serve,

    /// Delete records whose time-to-live has elapsed.
    Purge,

    /// Issue a bearer token for an existing user.
    ///
    /// Operator tooling for testing against a running server.
    Token {
        /// External identity id (Google account id) of the user.
        external_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Purge => {
            let pool = db::connect(&cfg).await?;
            let store = SqliteRecordStore::new(pool);
            let removed = store.purge_expired().await?;
            println!("Purged {} expired records.", removed);
            store.pool().close().await;
        }
        Commands::Token { external_id } => {
            let pool = db::connect(&cfg).await?;
            let store = Arc::new(SqliteRecordStore::new(pool));
            let identities = IdentityRepository::new(store.clone(), cfg.cache.to_ttls());
            let user = identities
                .resolve(&external_id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("No user with external id {}", external_id))?;
            let tokens = TokenService::new(
                cfg.auth.secret()?,
                Duration::from_secs(cfg.auth.token_ttl_secs),
            );
            println!("{}", tokens.issue(&user)?);
            store.pool().close().await;
        }
    }

    Ok(())
}
