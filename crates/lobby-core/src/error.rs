//! Error type for registry operations.

use thiserror::Error;

/// Why an atomic registry operation refused to apply.
///
/// These map onto the domain `Error` replies the state machine sends; a
/// session hitting one of them keeps running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("game name already taken")]
    NameTaken,

    #[error("name must not be empty")]
    InvalidName,

    #[error("game does not exist")]
    NoSuchGame,

    #[error("client is not logged in")]
    NoSuchClient,

    #[error("game is full")]
    GameFull,

    #[error("player is already in the game")]
    AlreadyJoined,

    #[error("player is not in the game")]
    NotInGame,

    #[error("player already hosts a game")]
    AlreadyHosting,

    #[error("capacity below current player count")]
    CapacityTooLow,
}
