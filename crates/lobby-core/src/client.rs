//! Connected-client record and the channel aliases around it.
//!
//! A `Client` is created after a successful login and lives in the registry
//! until its session ends. It carries the `inbox` sender: the state
//! machine's sole input, which the session's socket reader and broadcasting
//! peers both push `ClientMessage`s onto. The outbound queue stays with the
//! owning session, whose writer task is the only task that touches the
//! socket's write half; the registry never writes to a socket.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;

use crate::messages::{ClientMessage, ServerMessage};

/// Process-unique identifier for a login session.
///
/// Usernames are the registry key, but a username can be taken over by a
/// newer login (displacement). The id lets cleanup distinguish "my entry"
/// from "my replacement's entry".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub u64);

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

fn next_client_id() -> ClientId {
    ClientId(NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed))
}

/// Inbox of `ClientMessage`s consumed by the state machine.
pub type InboxTx = mpsc::UnboundedSender<ClientMessage>;
pub type InboxRx = mpsc::UnboundedReceiver<ClientMessage>;

/// Outbound queue of `ServerMessage`s drained by the session's writer task.
pub type OutboundTx = mpsc::UnboundedSender<ServerMessage>;
pub type OutboundRx = mpsc::UnboundedReceiver<ServerMessage>;

/// An authenticated session participant.
#[derive(Debug, Clone)]
pub struct Client {
    pub id: ClientId,
    /// Unique username; the registry key.
    pub name: String,
    /// Printable peer address (informational, reported in `GameStartAnswer`).
    pub host: String,
    pub inbox: InboxTx,
}

impl Client {
    /// Create a record with a fresh session id.
    pub fn new(name: impl Into<String>, host: impl Into<String>, inbox: InboxTx) -> Self {
        Client {
            id: next_client_id(),
            name: name.into(),
            host: host.into(),
            inbox,
        }
    }

    /// Push a message onto this client's inbox. Best-effort: a closed
    /// channel means the session is already shutting down.
    pub fn push_inbox(&self, msg: ClientMessage) {
        let _ = self.inbox.send(msg);
    }
}
