//! lobby-core
//!
//! Pure masterserver lobby logic:
//! - messages (logical client/server message types)
//! - client and game records
//! - the shared registry with atomic mutators and game broadcast

pub mod client;
pub mod error;
pub mod game;
pub mod messages;
pub mod registry;

pub use client::{Client, ClientId, InboxRx, InboxTx, OutboundRx, OutboundTx};
pub use error::RegistryError;
pub use game::{Game, PlayerSlot};
pub use messages::{ClientMessage, GameSnapshot, GameSummary, ServerMessage};
pub use registry::{LeaveOutcome, Registry};
