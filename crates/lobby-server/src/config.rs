//! Configuration for the masterserver.
//!
//! Loaded from a TOML file (default `masterserver.toml`):
//!
//! ```toml
//! port = 30500
//! acceptedVersion = [0, 3, 1]
//!
//! [database]
//! host = "localhost"
//! dbname = "masterserver"
//! user = "masterserver"
//! password = ""
//! port = 5432
//! ```
//!
//! Every key is optional; missing keys fall back to the defaults above. The
//! file is hot-reloaded: a watcher task re-reads it on change and swaps the
//! shared value, so the accepted protocol version can be rolled without a
//! restart. The listen port is only read at startup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use lobby_protocol::PROTOCOL_VERSION;

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// TCP port to listen on.
    pub port: u16,

    /// Protocol version accepted during the handshake, compared element-wise.
    #[serde(rename = "acceptedVersion")]
    pub accepted_version: Vec<u32>,

    /// Credential store connection parameters.
    pub database: DatabaseConfig,
}

/// PostgreSQL connection parameters for the credential store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub dbname: String,
    pub user: String,
    pub password: String,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 30500,
            accepted_version: PROTOCOL_VERSION.to_vec(),
            database: DatabaseConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            host: "localhost".to_string(),
            dbname: "masterserver".to_string(),
            user: "masterserver".to_string(),
            password: String::new(),
            port: 5432,
        }
    }
}

/// Handle to the live configuration, shared with the watcher task.
pub type SharedConfig = Arc<RwLock<Config>>;

impl Config {
    /// Parse the file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Parse the file at `path`, falling back to defaults when it is absent
    /// or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                warn!("{:#}; using default configuration", err);
                Config::default()
            }
        }
    }
}

/// Watch the config file and swap the shared value when it changes.
///
/// The watcher runs on a blocking task because `notify` delivers events over
/// a std channel. Failing to set up the watch (e.g. the file does not exist
/// yet) only disables hot reload; the server keeps running.
pub fn spawn_watcher(path: PathBuf, shared: SharedConfig) {
    use notify::{RecursiveMode, Watcher};

    let (tx, rx) = std::sync::mpsc::channel();
    let mut watcher = match notify::recommended_watcher(move |res| {
        let _ = tx.send(res);
    }) {
        Ok(w) => w,
        Err(err) => {
            warn!("config watcher unavailable: {err}");
            return;
        }
    };
    if let Err(err) = watcher.watch(&path, RecursiveMode::NonRecursive) {
        warn!("not watching {} for changes: {err}", path.display());
        return;
    }

    tokio::task::spawn_blocking(move || {
        // Keep the watcher alive for the lifetime of the loop.
        let _watcher = watcher;
        while let Ok(event) = rx.recv() {
            let relevant = match event {
                Ok(ev) => ev.kind.is_modify() || ev.kind.is_create(),
                Err(err) => {
                    warn!("config watch error: {err}");
                    false
                }
            };
            if !relevant {
                continue;
            }
            match Config::load(&path) {
                Ok(new_config) => {
                    let mut guard = shared.blocking_write();
                    if new_config.port != guard.port {
                        warn!(
                            "config port changed {} -> {}; takes effect after restart",
                            guard.port, new_config.port
                        );
                    }
                    if *guard != new_config {
                        info!("configuration reloaded from {}", path.display());
                    }
                    *guard = new_config;
                }
                Err(err) => warn!("keeping previous configuration: {err:#}"),
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_version() {
        let config = Config::default();
        assert_eq!(config.port, 30500);
        assert_eq!(config.accepted_version, PROTOCOL_VERSION.to_vec());
        assert_eq!(config.database.port, 5432);
    }

    #[test]
    fn parses_full_file() {
        let config: Config = toml::from_str(
            r#"
            port = 4242
            acceptedVersion = [1, 0]

            [database]
            host = "db.example"
            dbname = "lobby"
            user = "svc"
            password = "hunter2"
            port = 5433
            "#,
        )
        .unwrap();
        assert_eq!(config.port, 4242);
        assert_eq!(config.accepted_version, vec![1, 0]);
        assert_eq!(config.database.host, "db.example");
        assert_eq!(config.database.password, "hunter2");
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config: Config = toml::from_str("port = 9999").unwrap();
        assert_eq!(config.port, 9999);
        assert_eq!(config.accepted_version, PROTOCOL_VERSION.to_vec());
        assert_eq!(config.database, DatabaseConfig::default());
    }

    #[test]
    fn load_reads_a_file_and_survives_a_missing_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("masterserver.toml");

        assert_eq!(Config::load_or_default(&path), Config::default());

        std::fs::write(&path, "port = 4242\nacceptedVersion = [9]\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.port, 4242);
        assert_eq!(config.accepted_version, vec![9]);
    }
}
