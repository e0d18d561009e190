//! TCP listener and top-level server wiring.
//!
//! This module:
//! - Binds the listen socket (IPv4 any-address, `SO_REUSEADDR`, backlog 1024).
//! - Accepts connections and spawns one session task per connection.
//! - Bundles the shared collaborators every session needs into [`ServerCtx`].

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpSocket};
use tracing::{debug, info};

use lobby_core::Registry;

use crate::config::SharedConfig;
use crate::session;
use crate::store::CredentialStore;

/// Listen backlog for the accept queue.
const LISTEN_BACKLOG: u32 = 1024;

/// Shared collaborators handed to every session.
pub struct ServerCtx {
    pub registry: Arc<Registry>,
    pub store: Arc<dyn CredentialStore>,
    pub config: SharedConfig,
}

/// Bind the listen socket on `0.0.0.0:port`. Port 0 asks the OS for a free
/// port (used by the tests); the bound address is available on the returned
/// listener.
pub fn bind(port: u16) -> std::io::Result<TcpListener> {
    let addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port));
    let socket = TcpSocket::new_v4()?;
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(LISTEN_BACKLOG)
}

/// Accept loop: one session task per connection, forever.
pub async fn run(listener: TcpListener, ctx: Arc<ServerCtx>) -> anyhow::Result<()> {
    let port = listener.local_addr()?.port();
    info!("Listening on port {port}");

    loop {
        let (stream, peer) = listener.accept().await?;
        info!("Accepted connection from {}", peer.ip());

        let ctx = ctx.clone();
        tokio::spawn(async move {
            if let Err(err) = session::run(stream, peer, ctx).await {
                // Session errors are per-connection; the server keeps going.
                debug!(%peer, "session ended with error: {err:#}");
            }
        });
    }
}
