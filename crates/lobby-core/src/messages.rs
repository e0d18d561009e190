//! Message types spoken between game clients and the masterserver.
//!
//! These are **transport-agnostic** logical messages:
//! - [`ClientMessage`]: what a session's state machine consumes. Most
//!   variants arrive over the wire; a few (`ChatFromThread`, `Broadcast`,
//!   and peer-originated `Logout` / `GameClosedByHost` / `GameStartedByHost`)
//!   are placed on a client's inbox by the registry or a broadcasting peer.
//! - [`ServerMessage`]: what the server writes back on a client's socket.
//!
//! Note: the JSON line encoder/decoder lives in the `lobby-protocol` crate;
//! this module is purely logical. Field renames pin the wire names, which are
//! part of the protocol and cannot change without breaking clients.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::game::PlayerSlot;

/// A message consumed by a session's state machine.
///
/// Every variant carries the `tag` discriminator on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag")]
pub enum ClientMessage {
    /// Handshake only: the peer announces its protocol version.
    VersionMessage {
        #[serde(rename = "peerProtocolVersion")]
        peer_protocol_version: Vec<u32>,
    },

    /// Authenticate with an existing account.
    Login {
        #[serde(rename = "loginName")]
        login_name: String,
        #[serde(rename = "loginPassword")]
        login_password: String,
    },

    /// Register a new account.
    AddPlayer { name: String, pw: String },

    /// Ask for the current list of open games.
    GameQuery,

    /// Create a new game lobby.
    GameInit {
        #[serde(rename = "gameInitName")]
        game_init_name: String,
        #[serde(rename = "gameMap")]
        game_map: String,
        #[serde(rename = "gameMode")]
        game_mode: String,
        #[serde(rename = "numPlayers")]
        num_players: u32,
    },

    /// Join an existing game lobby by name.
    GameJoin {
        #[serde(rename = "gameId")]
        game_id: String,
    },

    /// Leave the current game.
    GameLeave,

    /// Ask for the full state of the current game.
    GameInfo,

    /// The host closed the game (pushed onto members' inboxes).
    GameClosedByHost,

    /// Host-only: reconfigure the current game.
    GameConfig {
        #[serde(rename = "gameConfMap")]
        game_conf_map: String,
        #[serde(rename = "gameConfMode")]
        game_conf_mode: String,
        #[serde(rename = "gameConfPlayerNum")]
        game_conf_player_num: u32,
    },

    /// Update the sender's own player slot.
    PlayerConfig {
        #[serde(rename = "playerCiv")]
        player_civ: String,
        #[serde(rename = "playerTeam")]
        player_team: i32,
        #[serde(rename = "playerReady")]
        player_ready: bool,
    },

    /// Host-only: request the game start.
    GameStart,

    /// The host started the game (pushed onto members' inboxes).
    GameStartedByHost,

    /// Host-only: declare the running game finished.
    GameOver,

    /// End the session. Also pushed onto a displaced client's inbox.
    Logout,

    /// Request to broadcast a chat line to the current game.
    ChatFromClient {
        #[serde(rename = "chatFromCContent")]
        content: String,
    },

    /// A chat line relayed from a peer (pushed onto inboxes).
    ChatFromThread {
        #[serde(rename = "chatFromTOrign")]
        origin: String,
        #[serde(rename = "chatFromTContent")]
        content: String,
    },

    /// An opaque text broadcast from a peer (pushed onto inboxes).
    Broadcast { content: String },
}

/// A message written by the server on a client's socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag")]
pub enum ServerMessage {
    /// Generic acknowledgement text.
    Message { content: String },

    /// Protocol or domain error text.
    Error { content: String },

    /// Reply to `GameQuery`.
    GameQueryAnswer { games: Vec<GameSummary> },

    /// Reply to `GameInfo`.
    GameInfoAnswer { game: GameSnapshot },

    /// Sent to the host after a successful `GameStart`: maps each member's
    /// username to that member's peer address (informational).
    GameStartAnswer {
        #[serde(rename = "hostMap")]
        host_map: HashMap<String, String>,
    },

    /// A chat line delivered to this client.
    ChatOut { origin: String, content: String },
}

/// One row of the game list: enough for a client to render a lobby browser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub name: String,
    pub host: String,
    pub map: String,
    pub mode: String,
    /// Current number of joined players.
    pub num_players: u32,
    pub max_players: u32,
}

/// Full state of one game, as sent in `GameInfoAnswer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub name: String,
    pub host: String,
    pub map: String,
    pub mode: String,
    pub max_players: u32,
    pub players: HashMap<String, PlayerSlot>,
}

impl GameSnapshot {
    /// True when every joined player has flagged ready.
    pub fn all_ready(&self) -> bool {
        self.players.values().all(|slot| slot.ready)
    }
}

// -----------------------------------------------------------------------------
// Convenience constructors
// -----------------------------------------------------------------------------

impl ServerMessage {
    /// Convenience constructor for an acknowledgement.
    pub fn message(content: impl Into<String>) -> Self {
        ServerMessage::Message {
            content: content.into(),
        }
    }

    /// Convenience constructor for an error reply.
    pub fn error(content: impl Into<String>) -> Self {
        ServerMessage::Error {
            content: content.into(),
        }
    }

    /// Convenience constructor for a delivered chat line.
    pub fn chat_out(origin: impl Into<String>, content: impl Into<String>) -> Self {
        ServerMessage::ChatOut {
            origin: origin.into(),
            content: content.into(),
        }
    }
}
