//! JSON encode/decode for framed messages.
//!
//! Every message is a single JSON object with a `tag` field selecting the
//! variant. Unknown tags and malformed payloads decode to
//! [`ProtocolError::Decode`]; outside the handshake the session surfaces
//! that as an `Error` reply without dropping the connection.

use lobby_core::{ClientMessage, ServerMessage};
use thiserror::Error;

/// Codec failure for one frame.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("could not decode message: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("could not encode message: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Decode one frame into a client-originated message.
pub fn decode_client(line: &str) -> Result<ClientMessage, ProtocolError> {
    serde_json::from_str(line).map_err(ProtocolError::Decode)
}

/// Decode one frame into a server-originated message (client side / tests).
pub fn decode_server(line: &str) -> Result<ServerMessage, ProtocolError> {
    serde_json::from_str(line).map_err(ProtocolError::Decode)
}

/// Encode a client-originated message as one frame (client side / tests).
pub fn encode_client(msg: &ClientMessage) -> Result<String, ProtocolError> {
    serde_json::to_string(msg).map_err(ProtocolError::Encode)
}

/// Encode a server reply as one frame (no trailing newline; the framing
/// layer appends it).
pub fn encode_server(msg: &ServerMessage) -> Result<String, ProtocolError> {
    serde_json::to_string(msg).map_err(ProtocolError::Encode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_version_message() {
        let msg = decode_client(r#"{"tag":"VersionMessage","peerProtocolVersion":[0,3,0]}"#)
            .unwrap();
        assert_eq!(
            msg,
            ClientMessage::VersionMessage {
                peer_protocol_version: vec![0, 3, 0]
            }
        );
    }

    #[test]
    fn decodes_login_wire_names() {
        let msg =
            decode_client(r#"{"tag":"Login","loginName":"alice","loginPassword":"s3cret"}"#)
                .unwrap();
        assert_eq!(
            msg,
            ClientMessage::Login {
                login_name: "alice".into(),
                login_password: "s3cret".into()
            }
        );
    }

    #[test]
    fn decodes_game_init_wire_names() {
        let msg = decode_client(
            r#"{"tag":"GameInit","gameInitName":"g1","gameMap":"m","gameMode":"mode","numPlayers":2}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::GameInit {
                game_init_name: "g1".into(),
                game_map: "m".into(),
                game_mode: "mode".into(),
                num_players: 2
            }
        );
    }

    #[test]
    fn unit_variants_need_only_the_tag() {
        assert_eq!(
            decode_client(r#"{"tag":"GameQuery"}"#).unwrap(),
            ClientMessage::GameQuery
        );
        assert_eq!(
            decode_client(r#"{"tag":"Logout"}"#).unwrap(),
            ClientMessage::Logout
        );
    }

    #[test]
    fn unknown_tag_is_a_decode_error() {
        assert!(matches!(
            decode_client(r#"{"tag":"Nonsense"}"#),
            Err(ProtocolError::Decode(_))
        ));
        assert!(matches!(
            decode_client("not json at all"),
            Err(ProtocolError::Decode(_))
        ));
    }

    #[test]
    fn encodes_error_reply() {
        let line = encode_server(&ServerMessage::error("Incompatible Version.")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"tag": "Error", "content": "Incompatible Version."})
        );
    }

    #[test]
    fn chat_thread_round_trips_wire_names() {
        let msg = ClientMessage::ChatFromThread {
            origin: "alice".into(),
            content: "hi".into(),
        };
        let line = encode_client(&msg).unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["chatFromTOrign"], "alice");
        assert_eq!(value["chatFromTContent"], "hi");
        assert_eq!(decode_client(&line).unwrap(), msg);
    }
}
