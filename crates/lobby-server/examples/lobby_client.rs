//! Interactive line client for poking at a running masterserver.
//!
//! Shorthand commands are translated to protocol frames; a line starting
//! with `{` is sent as raw JSON. Server replies print as they arrive.

use std::env;
use std::error::Error;
use std::io::{self, Write};

use tokio::io::BufReader;
use tokio::net::TcpStream;

use lobby_core::ClientMessage;
use lobby_protocol::{encode_client, next_frame, write_frame, PROTOCOL_VERSION};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let addr = env::var("LOBBY_CLIENT_ADDR").unwrap_or_else(|_| "127.0.0.1:30500".to_string());

    println!("Connecting to {addr}...");
    let stream = TcpStream::connect(&addr).await?;
    println!("Connected. Commands:");
    println!("  version                        send the protocol handshake");
    println!("  register <name> <pw>           create an account");
    println!("  login <name> <pw>              authenticate");
    println!("  query                          list open games");
    println!("  init <name> <map> <mode> <n>   create a game");
    println!("  join <name>                    join a game");
    println!("  info                           show the current game");
    println!("  config <civ> <team> <ready>    update your player slot");
    println!("  start | leave | over | logout");
    println!("  chat <text>                    chat to the current game");
    println!("  {{...}}                          raw JSON frame");
    println!("Type 'quit' to leave.\n");

    let (read_half, mut write_half) = stream.into_split();

    // Print server frames as they arrive.
    tokio::spawn(async move {
        let mut reader = BufReader::new(read_half);
        loop {
            match next_frame(&mut reader).await {
                Ok(Some(line)) => println!("<< {line}"),
                Ok(None) => {
                    println!("\nServer closed the connection.");
                    std::process::exit(0);
                }
                Err(err) => {
                    eprintln!("\nRead error: {err}");
                    std::process::exit(1);
                }
            }
        }
    });

    let stdin = io::stdin();
    loop {
        print!(">> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            println!("\nEOF on stdin, exiting client.");
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.eq_ignore_ascii_case("quit") {
            break;
        }

        let frame = if trimmed.starts_with('{') {
            trimmed.to_string()
        } else {
            match parse_command(trimmed) {
                Some(msg) => encode_client(&msg)?,
                None => {
                    eprintln!("Could not parse command. See the list above.");
                    continue;
                }
            }
        };
        write_frame(&mut write_half, &frame).await?;
    }

    Ok(())
}

fn parse_command(line: &str) -> Option<ClientMessage> {
    let mut words = line.split_whitespace();
    let command = words.next()?;
    match command {
        "version" => Some(ClientMessage::VersionMessage {
            peer_protocol_version: PROTOCOL_VERSION.to_vec(),
        }),
        "register" => Some(ClientMessage::AddPlayer {
            name: words.next()?.to_string(),
            pw: words.next()?.to_string(),
        }),
        "login" => Some(ClientMessage::Login {
            login_name: words.next()?.to_string(),
            login_password: words.next()?.to_string(),
        }),
        "query" => Some(ClientMessage::GameQuery),
        "init" => Some(ClientMessage::GameInit {
            game_init_name: words.next()?.to_string(),
            game_map: words.next()?.to_string(),
            game_mode: words.next()?.to_string(),
            num_players: words.next()?.parse().ok()?,
        }),
        "join" => Some(ClientMessage::GameJoin {
            game_id: words.next()?.to_string(),
        }),
        "info" => Some(ClientMessage::GameInfo),
        "config" => Some(ClientMessage::PlayerConfig {
            player_civ: words.next()?.to_string(),
            player_team: words.next()?.parse().ok()?,
            player_ready: words.next()?.parse().ok()?,
        }),
        "start" => Some(ClientMessage::GameStart),
        "leave" => Some(ClientMessage::GameLeave),
        "over" => Some(ClientMessage::GameOver),
        "logout" => Some(ClientMessage::Logout),
        "chat" => {
            let rest = line.splitn(2, ' ').nth(1)?.to_string();
            Some(ClientMessage::ChatFromClient { content: rest })
        }
        _ => None,
    }
}
