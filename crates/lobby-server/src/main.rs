//! Masterserver binary: config, credential store, listener.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::RwLock;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lobby_core::Registry;
use lobby_server::config::{Config, SharedConfig};
use lobby_server::server::{self, ServerCtx};
use lobby_server::store::{CredentialStore, MemoryStore};

#[derive(Debug, Parser)]
#[command(name = "masterserver", about = "RTS master/lobby server")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "masterserver.toml")]
    config: PathBuf,

    /// Override the configured listen port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = Config::load_or_default(&args.config);
    if let Some(port) = args.port {
        config.port = port;
    }

    let store = build_store(&config).await;
    let shared: SharedConfig = Arc::new(RwLock::new(config.clone()));
    lobby_server::config::spawn_watcher(args.config, shared.clone());

    let listener = server::bind(config.port)?;
    let ctx = Arc::new(ServerCtx {
        registry: Arc::new(Registry::new()),
        store,
        config: shared,
    });
    server::run(listener, ctx).await
}

#[cfg(feature = "postgres")]
async fn build_store(config: &Config) -> Arc<dyn CredentialStore> {
    use lobby_server::store::PgStore;
    use tracing::warn;

    match PgStore::connect(&config.database).await {
        Ok(store) => {
            info!(
                "credential store: postgres at {}:{}/{}",
                config.database.host, config.database.port, config.database.dbname
            );
            Arc::new(store)
        }
        Err(err) => {
            warn!("postgres unavailable ({err}), falling back to in-memory credential store");
            Arc::new(MemoryStore::new())
        }
    }
}

#[cfg(not(feature = "postgres"))]
async fn build_store(_config: &Config) -> Arc<dyn CredentialStore> {
    info!("credential store: in-memory (build with --features postgres to persist accounts)");
    Arc::new(MemoryStore::new())
}
