//! Game (lobby) record and per-player slot data.
//!
//! Pure data: all mutation goes through the registry's atomic methods so the
//! lobby invariants hold after every update.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::messages::{GameSnapshot, GameSummary};

/// One participant's configuration inside a game lobby.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSlot {
    /// Opaque civilisation identifier chosen by the player.
    pub civ: String,
    pub team: i32,
    pub ready: bool,
}

impl Default for PlayerSlot {
    /// The slot a player occupies right after joining.
    fn default() -> Self {
        PlayerSlot {
            civ: String::new(),
            team: 0,
            ready: false,
        }
    }
}

/// A named pre-match lobby with a host, a map/mode/capacity, and the set of
/// joined players.
#[derive(Debug, Clone)]
pub struct Game {
    /// Unique lobby name; the registry key.
    pub name: String,
    /// Username of the creator; immutable for the lobby's lifetime.
    pub host: String,
    pub map: String,
    pub mode: String,
    pub max_players: u32,
    /// Username -> slot for every joined player (the host included).
    pub players: HashMap<String, PlayerSlot>,
}

impl Game {
    /// Create a game with the host already seated in a default slot.
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        map: impl Into<String>,
        mode: impl Into<String>,
        max_players: u32,
    ) -> Self {
        let host = host.into();
        let mut players = HashMap::new();
        players.insert(host.clone(), PlayerSlot::default());
        Game {
            name: name.into(),
            host,
            map: map.into(),
            mode: mode.into(),
            max_players,
            players,
        }
    }

    pub fn is_full(&self) -> bool {
        self.players.len() as u32 >= self.max_players
    }

    /// Browser row for `GameQueryAnswer`.
    pub fn summary(&self) -> GameSummary {
        GameSummary {
            name: self.name.clone(),
            host: self.host.clone(),
            map: self.map.clone(),
            mode: self.mode.clone(),
            num_players: self.players.len() as u32,
            max_players: self.max_players,
        }
    }

    /// Full copy for `GameInfoAnswer` and state-machine checks.
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            name: self.name.clone(),
            host: self.host.clone(),
            map: self.map.clone(),
            mode: self.mode.clone(),
            max_players: self.max_players,
            players: self.players.clone(),
        }
    }
}
