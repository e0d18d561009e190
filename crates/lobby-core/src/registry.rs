//! Shared registry of logged-in clients and open games.
//!
//! The registry owns the two maps every session reads and mutates:
//! `username -> Client` and `game name -> Game`. Both live under a single
//! `RwLock` so that every multi-step mutation (displace a duplicate login,
//! cascade a disconnect through game memberships, close a lobby) executes as
//! one transaction while the guard is held. Pure observations take the read
//! guard and copy out a snapshot.
//!
//! Invariants maintained by the write methods:
//! 1. A game's host is always one of its players.
//! 2. A game never holds more players than `max_players`, and `max_players`
//!    can only be lowered to at least the current count.
//! 3. Every username seated in a game is a logged-in client.
//! 4. A username maps to exactly one client record, and a username hosts at
//!    most one game.
//!
//! Message pushes done inside a write transaction (displacement `Logout`,
//! `GameClosedByHost` on lobby closure) land on recipients' inboxes before
//! any later transaction can observe the new state, which gives displaced
//! and evicted sessions a deterministic shutdown signal.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::client::{Client, ClientId};
use crate::error::RegistryError;
use crate::game::{Game, PlayerSlot};
use crate::messages::{ClientMessage, GameSnapshot, GameSummary};

/// How a `leave_game` call resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// A non-host member left; the game stays open.
    Left,
    /// The host left; the game was closed and remaining members notified.
    Closed,
}

#[derive(Default)]
struct RegistryInner {
    clients: HashMap<String, Client>,
    games: HashMap<String, Game>,
}

/// The pair of shared maps with atomic mutators.
#[derive(Default)]
pub struct Registry {
    inner: RwLock<RegistryInner>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Register a freshly authenticated client.
    ///
    /// If the username is already taken, the incumbent is displaced: it gets
    /// a `Logout` on its inbox, its game memberships are dissolved (closing
    /// any game it hosted), and the new record takes the slot, all in one
    /// transaction, so the `Logout` is enqueued before the new client is
    /// visible.
    pub async fn add_client(&self, client: Client) {
        let mut inner = self.inner.write().await;
        let displaced = match inner.clients.get(&client.name) {
            Some(old) => {
                old.push_inbox(ClientMessage::Logout);
                true
            }
            None => false,
        };
        if displaced {
            info!(name = %client.name, "duplicate login, displacing incumbent");
            inner.leave_all_games(&client.name);
        }
        inner.clients.insert(client.name.clone(), client);
    }

    /// Remove a client and cascade a leave through every game it was in.
    ///
    /// Identity-checked: if the username meanwhile belongs to a newer session
    /// (the caller was displaced), the call is a no-op: the replacement owns
    /// the name and all memberships now.
    pub async fn remove_client(&self, name: &str, id: ClientId) {
        let mut inner = self.inner.write().await;
        match inner.clients.get(name) {
            Some(current) if current.id == id => {}
            _ => {
                debug!(name, "skipping cleanup for displaced session");
                return;
            }
        }
        inner.clients.remove(name);
        inner.leave_all_games(name);
    }

    /// Snapshot of all open games for the lobby browser.
    pub async fn game_list(&self) -> Vec<GameSummary> {
        let inner = self.inner.read().await;
        inner.games.values().map(Game::summary).collect()
    }

    /// Create a game if the name is free, with the host seated in a default
    /// slot (so the host-is-a-player invariant holds as soon as the game is
    /// visible).
    pub async fn check_add_game(
        &self,
        host: &str,
        name: &str,
        map: &str,
        mode: &str,
        max_players: u32,
    ) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().await;
        if name.is_empty() {
            return Err(RegistryError::InvalidName);
        }
        if max_players < 1 {
            return Err(RegistryError::CapacityTooLow);
        }
        if !inner.clients.contains_key(host) {
            return Err(RegistryError::NoSuchClient);
        }
        if inner.games.contains_key(name) {
            return Err(RegistryError::NameTaken);
        }
        if inner.games.values().any(|g| g.host == host) {
            return Err(RegistryError::AlreadyHosting);
        }
        info!(game = name, host, "game created");
        inner
            .games
            .insert(name.to_string(), Game::new(name, host, map, mode, max_players));
        Ok(())
    }

    /// Seat a player in a game with a default slot.
    pub async fn join_game(&self, name: &str, game_name: &str) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().await;
        if !inner.clients.contains_key(name) {
            return Err(RegistryError::NoSuchClient);
        }
        let game = inner
            .games
            .get_mut(game_name)
            .ok_or(RegistryError::NoSuchGame)?;
        if game.players.contains_key(name) {
            return Err(RegistryError::AlreadyJoined);
        }
        if game.is_full() {
            return Err(RegistryError::GameFull);
        }
        game.players.insert(name.to_string(), PlayerSlot::default());
        debug!(game = game_name, player = name, "player joined");
        Ok(())
    }

    /// Remove a player from a game. If the leaver hosts the game, the game is
    /// closed: remaining members get `GameClosedByHost` on their inboxes and
    /// the entry is deleted.
    pub async fn leave_game(
        &self,
        name: &str,
        game_name: &str,
    ) -> Result<LeaveOutcome, RegistryError> {
        let mut inner = self.inner.write().await;
        inner.leave_game(name, game_name)
    }

    /// Reconfigure a game. Capacity can only be lowered to at least the
    /// current player count.
    pub async fn update_game(
        &self,
        game_name: &str,
        map: &str,
        mode: &str,
        max_players: u32,
    ) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().await;
        let game = inner
            .games
            .get_mut(game_name)
            .ok_or(RegistryError::NoSuchGame)?;
        if max_players < game.players.len() as u32 || max_players < 1 {
            return Err(RegistryError::CapacityTooLow);
        }
        game.map = map.to_string();
        game.mode = mode.to_string();
        game.max_players = max_players;
        Ok(())
    }

    /// Update one player's slot in a game.
    pub async fn update_player(
        &self,
        game_name: &str,
        name: &str,
        civ: &str,
        team: i32,
        ready: bool,
    ) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().await;
        let game = inner
            .games
            .get_mut(game_name)
            .ok_or(RegistryError::NoSuchGame)?;
        let slot = game
            .players
            .get_mut(name)
            .ok_or(RegistryError::NotInGame)?;
        slot.civ = civ.to_string();
        slot.team = team;
        slot.ready = ready;
        Ok(())
    }

    /// Copy of one game's full state, if it exists.
    pub async fn game_snapshot(&self, game_name: &str) -> Option<GameSnapshot> {
        let inner = self.inner.read().await;
        inner.games.get(game_name).map(Game::snapshot)
    }

    /// Username -> peer address for every member of a game that is still
    /// logged in. Used for the host's `GameStartAnswer`.
    pub async fn host_map(&self, game_name: &str) -> Option<HashMap<String, String>> {
        let inner = self.inner.read().await;
        let game = inner.games.get(game_name)?;
        Some(
            game.players
                .keys()
                .filter_map(|member| {
                    inner
                        .clients
                        .get(member)
                        .map(|c| (member.clone(), c.host.clone()))
                })
                .collect(),
        )
    }

    /// Fan a message out to every member of a game.
    ///
    /// The read guard is held for the whole fan-out, so one call's pushes are
    /// contiguous in each recipient's inbox. Members whose client record is
    /// gone are skipped.
    pub async fn broadcast_to_game(&self, game_name: &str, msg: ClientMessage) {
        let inner = self.inner.read().await;
        inner.broadcast(game_name, msg);
    }

    pub async fn contains_client(&self, name: &str) -> bool {
        self.inner.read().await.clients.contains_key(name)
    }

    /// Session id currently holding a username, if any.
    pub async fn client_id(&self, name: &str) -> Option<ClientId> {
        self.inner.read().await.clients.get(name).map(|c| c.id)
    }

    pub async fn client_count(&self) -> usize {
        self.inner.read().await.clients.len()
    }
}

impl RegistryInner {
    /// Dissolve every game membership of `name`, closing games it hosted.
    fn leave_all_games(&mut self, name: &str) {
        let member_of: Vec<String> = self
            .games
            .values()
            .filter(|g| g.players.contains_key(name))
            .map(|g| g.name.clone())
            .collect();
        for game_name in member_of {
            let _ = self.leave_game(name, &game_name);
        }
    }

    fn leave_game(
        &mut self,
        name: &str,
        game_name: &str,
    ) -> Result<LeaveOutcome, RegistryError> {
        let game = self
            .games
            .get_mut(game_name)
            .ok_or(RegistryError::NoSuchGame)?;
        if !game.players.contains_key(name) {
            return Err(RegistryError::NotInGame);
        }
        if game.host == name {
            game.players.remove(name);
            let remaining: Vec<String> = game.players.keys().cloned().collect();
            self.games.remove(game_name);
            info!(game = game_name, host = name, "host left, closing game");
            for member in remaining {
                if let Some(client) = self.clients.get(&member) {
                    client.push_inbox(ClientMessage::GameClosedByHost);
                }
            }
            Ok(LeaveOutcome::Closed)
        } else {
            game.players.remove(name);
            debug!(game = game_name, player = name, "player left");
            Ok(LeaveOutcome::Left)
        }
    }

    fn broadcast(&self, game_name: &str, msg: ClientMessage) {
        let Some(game) = self.games.get(game_name) else {
            return;
        };
        for member in game.players.keys() {
            if let Some(client) = self.clients.get(member) {
                client.push_inbox(msg.clone());
            }
        }
    }
}
