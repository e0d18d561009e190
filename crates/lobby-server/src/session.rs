//! Per-connection session.
//!
//! Runs once per accepted socket:
//! 1. **Version check**: first frame must be a `VersionMessage` matching the
//!    configured accepted version, or the connection ends.
//! 2. **Authenticate / register loop**: `Login` verifies against the
//!    credential store; `AddPlayer` hashes and inserts, then loops so the
//!    fresh account can log in on the same connection.
//! 3. **State machine**: a reader task decodes frames onto the client's
//!    inbox while the processor task runs the lobby state machine. Whichever
//!    exits first cancels the other; the registry cleanup then runs exactly
//!    once, on every termination path (logout, protocol error, peer
//!    disconnect, panic).
//!
//! A dedicated writer task drains the outbound queue and is the only task
//! that touches the socket's write half; everything else (including peers,
//! via the registry) only enqueues.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::BufReader;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use lobby_core::{Client, ClientMessage, InboxTx, OutboundRx, OutboundTx, ServerMessage};
use lobby_protocol::{decode_client, encode_server, next_frame, write_frame};

use crate::auth;
use crate::server::ServerCtx;

type SocketReader = BufReader<OwnedReadHalf>;

/// Drive one connection from accept to close.
pub async fn run(stream: TcpStream, peer: SocketAddr, ctx: Arc<ServerCtx>) -> anyhow::Result<()> {
    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let (out_tx, out_rx) = mpsc::unbounded_channel::<ServerMessage>();
    let writer = tokio::spawn(writer_loop(write_half, out_rx));

    let outcome = handshake(&mut reader, &out_tx, &ctx).await;

    if let Ok(Some(name)) = &outcome {
        run_state_machine(reader, out_tx, name.clone(), peer, &ctx).await;
    } else {
        drop(out_tx);
    }

    // Let the writer flush whatever is still queued before reporting.
    let _ = writer.await;
    outcome.map(|_| ())
}

/// Phases 1 and 2. Returns the authenticated username, or `None` when the
/// connection ends without a login (version mismatch, failed login, EOF).
async fn handshake(
    reader: &mut SocketReader,
    out: &OutboundTx,
    ctx: &ServerCtx,
) -> anyhow::Result<Option<String>> {
    // Phase 1: version check.
    let Some(line) = next_frame(reader).await.context("handshake read")? else {
        return Ok(None);
    };
    match decode_client(&line) {
        Ok(ClientMessage::VersionMessage {
            peer_protocol_version,
        }) => {
            let accepted = ctx.config.read().await.accepted_version.clone();
            if peer_protocol_version != accepted {
                debug!(?peer_protocol_version, ?accepted, "version mismatch");
                send(out, ServerMessage::error("Incompatible Version."));
                return Ok(None);
            }
            send(out, ServerMessage::message("Version accepted."));
        }
        _ => {
            send(out, ServerMessage::error("Unknown Format."));
            return Ok(None);
        }
    }

    // Phase 2: authenticate or register, looping so a freshly registered
    // account can log in on the same connection.
    loop {
        let Some(line) = next_frame(reader).await.context("auth read")? else {
            return Ok(None);
        };
        match decode_client(&line) {
            Ok(ClientMessage::Login {
                login_name,
                login_password,
            }) => {
                let record = match ctx.store.get_player(&login_name).await {
                    Ok(record) => record,
                    Err(err) => {
                        warn!(name = %login_name, "credential store lookup failed: {err}");
                        None
                    }
                };
                let verified = record
                    .map(|r| auth::verify_password(&login_password, &r.password_hash))
                    .unwrap_or(false);
                if !verified {
                    send(out, ServerMessage::error("Login failed."));
                    return Ok(None);
                }
                send(out, ServerMessage::message("Login success."));
                return Ok(Some(login_name));
            }

            Ok(ClientMessage::AddPlayer { name, pw }) => {
                if name.is_empty() {
                    send(out, ServerMessage::error("Name taken."));
                    continue;
                }
                // A hashing failure is fatal for this session.
                let digest = auth::hash_password(&pw).context("hashing password")?;
                match ctx.store.add_player(&name, &digest).await {
                    Ok(Some(_)) => {
                        info!(name = %name, "player registered");
                        send(out, ServerMessage::message("Player successfully added."));
                    }
                    Ok(None) => send(out, ServerMessage::error("Name taken.")),
                    Err(err) => {
                        warn!(name = %name, "credential store insert failed: {err}");
                        send(out, ServerMessage::error("Login failed."));
                        return Ok(None);
                    }
                }
            }

            _ => {
                send(out, ServerMessage::error("Unknown Format."));
                return Ok(None);
            }
        }
    }
}

/// Phase 3: register the client, race the reader against the processor, and
/// run the guaranteed cleanup when either finishes.
async fn run_state_machine(
    reader: SocketReader,
    out_tx: OutboundTx,
    name: String,
    peer: SocketAddr,
    ctx: &ServerCtx,
) {
    let (inbox_tx, inbox_rx) = mpsc::unbounded_channel::<ClientMessage>();
    let client = Client::new(name.clone(), peer.to_string(), inbox_tx.clone());
    let id = client.id;
    ctx.registry.add_client(client).await;
    info!(client = %name, %peer, "logged in");

    let mut read_task = tokio::spawn(reader_loop(reader, inbox_tx, out_tx.clone()));
    let mut processor_task = tokio::spawn(crate::state_machine::run(
        name.clone(),
        out_tx.clone(),
        inbox_rx,
        ctx.registry.clone(),
    ));

    // First exit wins; the sibling is cancelled. Panics surface here as
    // join errors, so the cleanup below runs regardless.
    tokio::select! {
        _ = &mut read_task => {
            processor_task.abort();
            let _ = processor_task.await;
        }
        _ = &mut processor_task => {
            read_task.abort();
            let _ = read_task.await;
        }
    }

    ctx.registry.remove_client(&name, id).await;
    info!(client = %name, %peer, "session closed");
    drop(out_tx);
}

/// Decode frames from the socket onto the inbox until EOF or socket error.
/// A frame that fails to decode gets an error reply but keeps the
/// connection.
async fn reader_loop(mut reader: SocketReader, inbox: InboxTx, out: OutboundTx) {
    loop {
        match next_frame(&mut reader).await {
            Ok(Some(line)) => match decode_client(&line) {
                Ok(msg) => {
                    if inbox.send(msg).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    debug!("undecodable frame: {err}");
                    send(&out, ServerMessage::error("Could not read message."));
                }
            },
            Ok(None) => break,
            Err(err) => {
                debug!("socket read failed: {err}");
                break;
            }
        }
    }
}

/// Sole writer to the socket: drain the outbound queue, one frame per
/// message. Exits when every sender is gone or the peer stops reading.
async fn writer_loop(mut write_half: OwnedWriteHalf, mut out_rx: OutboundRx) {
    while let Some(msg) = out_rx.recv().await {
        let line = match encode_server(&msg) {
            Ok(line) => line,
            Err(err) => {
                warn!("dropping unencodable reply: {err}");
                continue;
            }
        };
        if let Err(err) = write_frame(&mut write_half, &line).await {
            debug!("socket write failed: {err}");
            break;
        }
    }
}

fn send(out: &OutboundTx, msg: ServerMessage) {
    let _ = out.send(msg);
}
