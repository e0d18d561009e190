//! Per-client lobby state machine.
//!
//! The processor task owns this loop. It consumes the client's inbox (fed
//! by the session's socket reader and by broadcasting peers) and dispatches
//! on (state, message). Replies go onto the client's outbound queue; peer
//! deliveries go through the registry broadcast, never to peer sockets
//! directly.
//!
//! States:
//! - `Lobby`: logged in, not in any game.
//! - `InLobbyGame(g)`: joined game `g`, pre-start.
//! - `InRunningGame(g)`: game `g` was started by its host.
//!
//! Unhandled (state, message) pairs reply `Error "Unknown Message."` and
//! keep the current state. `Logout` ends the loop from every state; the
//! session layer then runs the registry cleanup.

use std::sync::Arc;

use tracing::debug;

use lobby_core::{ClientMessage, InboxRx, OutboundTx, Registry, RegistryError, ServerMessage};

/// Where a client currently is in the lobby protocol.
#[derive(Debug, Clone, PartialEq)]
enum State {
    Lobby,
    InLobbyGame(String),
    InRunningGame(String),
}

enum Step {
    Continue(State),
    Terminate,
}

/// Run the state machine until logout or inbox closure.
pub async fn run(name: String, out: OutboundTx, mut inbox: InboxRx, registry: Arc<Registry>) {
    let mut state = State::Lobby;
    while let Some(msg) = inbox.recv().await {
        let step = match state.clone() {
            State::Lobby => lobby_step(&name, &out, &registry, msg).await,
            State::InLobbyGame(game) => lobby_game_step(&name, &out, &registry, game, msg).await,
            State::InRunningGame(game) => {
                running_game_step(&name, &out, &registry, game, msg).await
            }
        };
        match step {
            Step::Continue(next) => state = next,
            Step::Terminate => break,
        }
    }
    debug!(client = %name, "state machine finished");
}

fn send(out: &OutboundTx, msg: ServerMessage) {
    // Best-effort: a closed queue means the writer (and session) are gone.
    let _ = out.send(msg);
}

fn unknown(out: &OutboundTx, state: State) -> Step {
    send(out, ServerMessage::error("Unknown Message."));
    Step::Continue(state)
}

fn logout(out: &OutboundTx) -> Step {
    send(out, ServerMessage::message("You have been logged out."));
    Step::Terminate
}

async fn lobby_step(
    name: &str,
    out: &OutboundTx,
    registry: &Registry,
    msg: ClientMessage,
) -> Step {
    match msg {
        ClientMessage::GameQuery => {
            send(
                out,
                ServerMessage::GameQueryAnswer {
                    games: registry.game_list().await,
                },
            );
            Step::Continue(State::Lobby)
        }

        ClientMessage::GameInit {
            game_init_name,
            game_map,
            game_mode,
            num_players,
        } => match registry
            .check_add_game(name, &game_init_name, &game_map, &game_mode, num_players)
            .await
        {
            Ok(()) => {
                send(out, ServerMessage::message("Added game."));
                Step::Continue(State::InLobbyGame(game_init_name))
            }
            Err(err) => {
                debug!(client = name, game = %game_init_name, %err, "game init refused");
                send(out, ServerMessage::error("Failed adding game."));
                Step::Continue(State::Lobby)
            }
        },

        ClientMessage::GameJoin { game_id } => match registry.join_game(name, &game_id).await {
            Ok(()) => {
                send(out, ServerMessage::message("Joined Game."));
                Step::Continue(State::InLobbyGame(game_id))
            }
            Err(RegistryError::GameFull) => {
                send(out, ServerMessage::error("Game is full."));
                Step::Continue(State::Lobby)
            }
            Err(RegistryError::NoSuchGame) => {
                send(out, ServerMessage::error("Game does not exist."));
                Step::Continue(State::Lobby)
            }
            Err(err) => {
                debug!(client = name, game = %game_id, %err, "join refused");
                send(out, ServerMessage::error("Failed joining game."));
                Step::Continue(State::Lobby)
            }
        },

        // A stray game-over broadcast can land here when the sender was a
        // host that just returned to the lobby; deliver the text.
        ClientMessage::Broadcast { content } => {
            send(out, ServerMessage::message(content));
            Step::Continue(State::Lobby)
        }

        ClientMessage::Logout => logout(out),

        _ => unknown(out, State::Lobby),
    }
}

async fn lobby_game_step(
    name: &str,
    out: &OutboundTx,
    registry: &Registry,
    game: String,
    msg: ClientMessage,
) -> Step {
    match msg {
        ClientMessage::ChatFromClient { content } => {
            registry
                .broadcast_to_game(
                    &game,
                    ClientMessage::ChatFromThread {
                        origin: name.to_string(),
                        content,
                    },
                )
                .await;
            Step::Continue(State::InLobbyGame(game))
        }

        ClientMessage::ChatFromThread { origin, content } => {
            send(out, ServerMessage::chat_out(origin, content));
            Step::Continue(State::InLobbyGame(game))
        }

        ClientMessage::GameStart => {
            let Some(snap) = registry.game_snapshot(&game).await else {
                send(out, ServerMessage::error("Game does not exist."));
                return Step::Continue(State::InLobbyGame(game));
            };
            if snap.host != name {
                send(out, ServerMessage::error("Only the host can start the game."));
            } else if !snap.all_ready() {
                send(out, ServerMessage::error("Players not ready."));
            } else {
                registry
                    .broadcast_to_game(&game, ClientMessage::GameStartedByHost)
                    .await;
                if let Some(host_map) = registry.host_map(&game).await {
                    send(out, ServerMessage::GameStartAnswer { host_map });
                }
            }
            // The transition to the running state happens when our own
            // GameStartedByHost arrives on the inbox.
            Step::Continue(State::InLobbyGame(game))
        }

        ClientMessage::GameInfo => {
            match registry.game_snapshot(&game).await {
                Some(snap) => send(out, ServerMessage::GameInfoAnswer { game: snap }),
                None => send(out, ServerMessage::error("Game does not exist.")),
            }
            Step::Continue(State::InLobbyGame(game))
        }

        ClientMessage::GameConfig {
            game_conf_map,
            game_conf_mode,
            game_conf_player_num,
        } => {
            let Some(snap) = registry.game_snapshot(&game).await else {
                send(out, ServerMessage::error("Game does not exist."));
                return Step::Continue(State::InLobbyGame(game));
            };
            if snap.host != name {
                // Only the host may reconfigure; non-hosts get the generic
                // rejection and keep their state.
                send(out, ServerMessage::error("Unknown Message."));
            } else if game_conf_player_num < snap.players.len() as u32
                || registry
                    .update_game(&game, &game_conf_map, &game_conf_mode, game_conf_player_num)
                    .await
                    .is_err()
            {
                send(out, ServerMessage::error("Can't choose less Players."));
            }
            Step::Continue(State::InLobbyGame(game))
        }

        ClientMessage::PlayerConfig {
            player_civ,
            player_team,
            player_ready,
        } => {
            if let Err(err) = registry
                .update_player(&game, name, &player_civ, player_team, player_ready)
                .await
            {
                debug!(client = name, %game, %err, "player config refused");
            }
            Step::Continue(State::InLobbyGame(game))
        }

        ClientMessage::GameClosedByHost => {
            let _ = registry.leave_game(name, &game).await;
            send(out, ServerMessage::message("Game was closed by Host."));
            Step::Continue(State::Lobby)
        }

        ClientMessage::GameLeave => game_leave_handler(name, registry, &game).await,

        ClientMessage::GameStartedByHost => {
            send(out, ServerMessage::message("Game started..."));
            Step::Continue(State::InRunningGame(game))
        }

        ClientMessage::Logout => logout(out),

        _ => unknown(out, State::InLobbyGame(game)),
    }
}

async fn running_game_step(
    name: &str,
    out: &OutboundTx,
    registry: &Registry,
    game: String,
    msg: ClientMessage,
) -> Step {
    match msg {
        ClientMessage::Broadcast { content } => {
            send(out, ServerMessage::message(content));
            Step::Continue(State::InRunningGame(game))
        }

        ClientMessage::ChatFromClient { content } => {
            registry
                .broadcast_to_game(
                    &game,
                    ClientMessage::ChatFromThread {
                        origin: name.to_string(),
                        content,
                    },
                )
                .await;
            Step::Continue(State::InRunningGame(game))
        }

        ClientMessage::ChatFromThread { origin, content } => {
            send(out, ServerMessage::chat_out(origin, content));
            Step::Continue(State::InRunningGame(game))
        }

        ClientMessage::GameClosedByHost => {
            let _ = registry.leave_game(name, &game).await;
            send(out, ServerMessage::message("Game was closed by Host."));
            Step::Continue(State::Lobby)
        }

        ClientMessage::GameLeave => game_leave_handler(name, registry, &game).await,

        ClientMessage::GameOver => {
            let is_host = registry
                .game_snapshot(&game)
                .await
                .map(|snap| snap.host == name)
                .unwrap_or(false);
            if !is_host {
                return unknown(out, State::InRunningGame(game));
            }
            registry
                .broadcast_to_game(
                    &game,
                    ClientMessage::Broadcast {
                        content: "Game Over.".to_string(),
                    },
                )
                .await;
            // Closing the game also tells the remaining members via
            // GameClosedByHost.
            game_leave_handler(name, registry, &game).await
        }

        ClientMessage::Logout => logout(out),

        _ => unknown(out, State::InRunningGame(game)),
    }
}

/// Leave the current game and return to the lobby.
///
/// When the leaver hosts the game the registry closes it, notifying the
/// remaining members. The game may already be gone (the host closed it
/// concurrently); that is fine, the leaver still lands in the lobby.
async fn game_leave_handler(name: &str, registry: &Registry, game: &str) -> Step {
    if let Err(err) = registry.leave_game(name, game).await {
        debug!(client = name, game, %err, "leave on absent game");
    }
    Step::Continue(State::Lobby)
}
