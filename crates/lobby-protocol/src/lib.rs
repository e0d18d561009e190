//! lobby-protocol
//!
//! Wire protocol for the masterserver: one JSON object per line, each object
//! tagged with a `tag` field naming the message variant.
//!
//! - `framing`: async line framing with universal newline handling.
//! - `json_codec`: encode/decode between lines and the logical message types
//!   defined in `lobby-core`.

pub mod framing;
pub mod json_codec;

pub use framing::{next_frame, read_frame, write_frame};
pub use json_codec::{
    decode_client, decode_server, encode_client, encode_server, ProtocolError,
};

/// Protocol version this server build speaks.
///
/// The handshake compares the peer's announced version element-wise against
/// the configured accepted version, which defaults to this constant.
pub const PROTOCOL_VERSION: &[u32] = &[0, 3, 1];
