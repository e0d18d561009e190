//! Async line framing.
//!
//! A frame is the bytes up to the next line terminator. Input applies
//! universal newline handling: both `\r` and `\n` end a frame, so a `\r\n`
//! pair yields one frame plus one empty frame. [`next_frame`] skips the
//! empties, which is what sessions want.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Read one raw frame. Returns `None` on EOF with no buffered bytes.
///
/// The terminator is consumed but not included. Bytes that are not valid
/// UTF-8 are replaced, which lets the JSON decoder produce a proper error
/// instead of the framing layer guessing.
pub async fn read_frame<R>(reader: &mut R) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line: Vec<u8> = Vec::new();
    loop {
        let buf = reader.fill_buf().await?;
        if buf.is_empty() {
            // EOF. Return a trailing unterminated frame if there is one.
            if line.is_empty() {
                return Ok(None);
            }
            break;
        }
        match buf.iter().position(|&b| b == b'\n' || b == b'\r') {
            Some(pos) => {
                line.extend_from_slice(&buf[..pos]);
                reader.consume(pos + 1);
                break;
            }
            None => {
                let len = buf.len();
                line.extend_from_slice(buf);
                reader.consume(len);
            }
        }
    }
    Ok(Some(String::from_utf8_lossy(&line).into_owned()))
}

/// Read the next non-blank frame, or `None` on EOF.
pub async fn next_frame<R>(reader: &mut R) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        match read_frame(reader).await? {
            Some(line) if line.trim().is_empty() => continue,
            other => return Ok(other),
        }
    }
}

/// Write one frame followed by a line feed and flush.
pub async fn write_frame<W>(writer: &mut W, line: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}
