//! Credential store: the persistent player table.
//!
//! The masterserver only needs two operations, so the store is a small
//! async trait:
//! - `get_player`: fetch a record by username.
//! - `add_player`: insert a new record; `None` means the name is taken.
//!
//! Two backings:
//! - [`MemoryStore`]: in-process map. The default, and the test double.
//! - `PgStore` (feature `postgres`): PostgreSQL via `tokio-postgres`, using
//!   the `[database]` config table.
//!
//! Store errors never crash the server; the session layer maps them to an
//! authentication failure.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

/// One row of the player table.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRecord {
    pub username: String,
    pub password_hash: String,
}

/// Why a store operation failed.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached during connection setup.
    #[error("credential store unavailable: {0}")]
    Unavailable(String),

    /// A query against an established connection failed.
    #[cfg(feature = "postgres")]
    #[error("database error: {0}")]
    Postgres(#[from] tokio_postgres::Error),
}

/// Persistent player table.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fetch a player record by username.
    async fn get_player(&self, name: &str) -> Result<Option<PlayerRecord>, StoreError>;

    /// Insert a new record. Returns `None` when the username is taken.
    async fn add_player(
        &self,
        name: &str,
        password_hash: &str,
    ) -> Result<Option<PlayerRecord>, StoreError>;
}

/// In-process credential store.
#[derive(Default)]
pub struct MemoryStore {
    players: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn get_player(&self, name: &str) -> Result<Option<PlayerRecord>, StoreError> {
        let players = self.players.read().await;
        Ok(players.get(name).map(|hash| PlayerRecord {
            username: name.to_string(),
            password_hash: hash.clone(),
        }))
    }

    async fn add_player(
        &self,
        name: &str,
        password_hash: &str,
    ) -> Result<Option<PlayerRecord>, StoreError> {
        let mut players = self.players.write().await;
        if players.contains_key(name) {
            return Ok(None);
        }
        players.insert(name.to_string(), password_hash.to_string());
        Ok(Some(PlayerRecord {
            username: name.to_string(),
            password_hash: password_hash.to_string(),
        }))
    }
}

#[cfg(feature = "postgres")]
pub use pg::PgStore;

#[cfg(feature = "postgres")]
mod pg {
    use super::{CredentialStore, PlayerRecord, StoreError};
    use crate::config::DatabaseConfig;

    use async_trait::async_trait;
    use tokio_postgres::NoTls;
    use tracing::error;

    /// PostgreSQL-backed credential store.
    pub struct PgStore {
        client: tokio_postgres::Client,
    }

    impl PgStore {
        /// Connect and make sure the player table exists.
        ///
        /// A refused or unreachable database surfaces as
        /// [`StoreError::Unavailable`]; later query failures on the live
        /// connection are [`StoreError::Postgres`].
        pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
            let conn = format!(
                "host={} port={} dbname={} user={} password={}",
                config.host, config.port, config.dbname, config.user, config.password
            );
            let (client, connection) = tokio_postgres::connect(&conn, NoTls)
                .await
                .map_err(|err| StoreError::Unavailable(err.to_string()))?;
            tokio::spawn(async move {
                if let Err(err) = connection.await {
                    error!("credential store connection lost: {err}");
                }
            });
            client
                .execute(
                    "CREATE TABLE IF NOT EXISTS players (
                         username TEXT PRIMARY KEY,
                         password_hash TEXT NOT NULL
                     )",
                    &[],
                )
                .await?;
            Ok(PgStore { client })
        }
    }

    #[async_trait]
    impl CredentialStore for PgStore {
        async fn get_player(&self, name: &str) -> Result<Option<PlayerRecord>, StoreError> {
            let row = self
                .client
                .query_opt(
                    "SELECT username, password_hash FROM players WHERE username = $1",
                    &[&name],
                )
                .await?;
            Ok(row.map(|row| PlayerRecord {
                username: row.get(0),
                password_hash: row.get(1),
            }))
        }

        async fn add_player(
            &self,
            name: &str,
            password_hash: &str,
        ) -> Result<Option<PlayerRecord>, StoreError> {
            let inserted = self
                .client
                .execute(
                    "INSERT INTO players (username, password_hash) VALUES ($1, $2)
                     ON CONFLICT (username) DO NOTHING",
                    &[&name, &password_hash],
                )
                .await?;
            if inserted == 0 {
                return Ok(None);
            }
            Ok(Some(PlayerRecord {
                username: name.to_string(),
                password_hash: password_hash.to_string(),
            }))
        }
    }
}
