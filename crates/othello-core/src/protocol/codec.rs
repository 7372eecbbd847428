//! JSON line codec.
//!
//! On stream transports (raw TCP) every message is one JSON object followed
//! by a single `\n`.  JSON never contains a raw newline (newlines inside
//! strings are escaped as `\n`), so the newline is an unambiguous frame
//! delimiter.  On message-oriented transports (WebSocket) the same JSON text
//! is sent without the trailing newline, one object per frame.
//!
//! ```text
//! {"type":"connect","game_id":"game1","player_name":"Ana"}\n
//! {"type":"connected","color":"black","game_id":"game1","game_started":false}\n
//! ```
//!
//! Decoding is strict: an unknown `"type"`, a missing field, or a value of
//! the wrong type yields [`ProtocolError::InvalidJson`].  A bad frame is a
//! per-message failure; it never poisons the stream, because the next
//! newline starts a fresh frame.

use serde::Serialize;
use thiserror::Error;

use super::messages::{ClientMessage, ServerMessage};

/// Largest accepted frame, in bytes, excluding the trailing newline.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Errors that can occur while encoding or decoding a frame.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The frame was not valid JSON for the expected message type.
    #[error("invalid message: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The frame exceeded [`MAX_FRAME_LEN`].
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },

    /// The frame was empty or whitespace only.
    #[error("empty frame")]
    EmptyFrame,
}

/// Serializes `msg` as a single JSON line terminated by `\n`.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidJson`] if serialization fails (which
/// cannot happen for the message types in this crate) or
/// [`ProtocolError::FrameTooLarge`] if the encoded frame is over the limit.
pub fn encode_line<T: Serialize>(msg: &T) -> Result<String, ProtocolError> {
    let mut line = serde_json::to_string(msg)?;
    if line.len() > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            len: line.len(),
            max: MAX_FRAME_LEN,
        });
    }
    line.push('\n');
    Ok(line)
}

/// Decodes one frame sent by a client.
///
/// Leading and trailing whitespace (including the `\n` delimiter and a
/// Windows-style `\r`) is ignored.
pub fn decode_client_message(frame: &str) -> Result<ClientMessage, ProtocolError> {
    let frame = check_frame(frame)?;
    Ok(serde_json::from_str(frame)?)
}

/// Decodes one frame sent by the server.
pub fn decode_server_message(frame: &str) -> Result<ServerMessage, ProtocolError> {
    let frame = check_frame(frame)?;
    Ok(serde_json::from_str(frame)?)
}

/// Moves bytes of `chunk` into `frame` up to the first `\n`.
///
/// Returns how many bytes of `chunk` were used (delimiter included) and
/// whether the frame is now complete.  `frame` holds the frame body without
/// the delimiter and never grows past [`MAX_FRAME_LEN`]: a longer frame is
/// rejected as soon as the limit is passed, without waiting for its end.
///
/// # Errors
///
/// [`ProtocolError::FrameTooLarge`] once the frame exceeds the limit.  The
/// rest of that frame is still unread, so the stream cannot be resynced by
/// the caller and should be closed.
pub fn scan_line(frame: &mut Vec<u8>, chunk: &[u8]) -> Result<(usize, bool), ProtocolError> {
    let (body, used, complete) = match chunk.iter().position(|&b| b == b'\n') {
        Some(i) => (i, i + 1, true),
        None => (chunk.len(), chunk.len(), false),
    };
    let len = frame.len() + body;
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            len,
            max: MAX_FRAME_LEN,
        });
    }
    frame.extend_from_slice(&chunk[..body]);
    Ok((used, complete))
}

fn check_frame(frame: &str) -> Result<&str, ProtocolError> {
    let trimmed = frame.trim();
    if trimmed.is_empty() {
        return Err(ProtocolError::EmptyFrame);
    }
    if trimmed.len() > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            len: trimmed.len(),
            max: MAX_FRAME_LEN,
        });
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::board::Color;

    #[test]
    fn test_encode_line_appends_single_newline() {
        let line = encode_line(&ClientMessage::GetState).unwrap();

        assert_eq!(line, "{\"type\":\"get_state\"}\n");
        assert_eq!(line.matches('\n').count(), 1);
    }

    #[test]
    fn test_chat_text_with_newline_stays_on_one_line() {
        let msg = ClientMessage::Chat {
            message: "line one\nline two".to_string(),
            player_name: None,
        };

        let line = encode_line(&msg).unwrap();

        assert_eq!(line.matches('\n').count(), 1, "embedded newline must be escaped");
        assert_eq!(decode_client_message(&line).unwrap(), msg);
    }

    #[test]
    fn test_decode_client_message_tolerates_crlf() {
        let msg = decode_client_message("{\"type\":\"move\",\"row\":2,\"col\":3}\r\n").unwrap();

        assert_eq!(msg, ClientMessage::Move { row: 2, col: 3 });
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        let result = decode_client_message(r#"{"type":"teleport"}"#);

        assert!(matches!(result, Err(ProtocolError::InvalidJson(_))));
    }

    #[test]
    fn test_decode_rejects_empty_frame() {
        assert!(matches!(
            decode_client_message("   \n"),
            Err(ProtocolError::EmptyFrame)
        ));
    }

    #[test]
    fn test_decode_rejects_oversized_frame() {
        let huge = format!(
            r#"{{"type":"chat","message":"{}"}}"#,
            "x".repeat(MAX_FRAME_LEN)
        );

        assert!(matches!(
            decode_client_message(&huge),
            Err(ProtocolError::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn test_scan_line_stops_at_first_newline() {
        let mut frame = b"{\"type\":".to_vec();

        let (used, complete) = scan_line(&mut frame, b"\"reset\"}\n{\"type\"").unwrap();

        assert!(complete);
        assert_eq!(used, 9);
        assert_eq!(frame, b"{\"type\":\"reset\"}");
    }

    #[test]
    fn test_scan_line_keeps_partial_frame() {
        let mut frame = Vec::new();

        let (used, complete) = scan_line(&mut frame, b"{\"type\"").unwrap();

        assert!(!complete);
        assert_eq!(used, 7);
        assert_eq!(frame.len(), 7);
    }

    #[test]
    fn test_scan_line_rejects_frame_past_limit_before_delimiter() {
        // Arrange: a frame already at the limit.
        let mut frame = vec![b'x'; MAX_FRAME_LEN];

        // Act: one more byte with no newline in sight.
        let result = scan_line(&mut frame, b"x");

        // Assert
        assert!(matches!(
            result,
            Err(ProtocolError::FrameTooLarge { len, .. }) if len == MAX_FRAME_LEN + 1
        ));
        assert_eq!(frame.len(), MAX_FRAME_LEN);
    }

    #[test]
    fn test_scan_line_accepts_frame_exactly_at_limit() {
        let mut frame = vec![b'x'; MAX_FRAME_LEN - 1];

        let (_, complete) = scan_line(&mut frame, b"x\n").unwrap();

        assert!(complete);
        assert_eq!(frame.len(), MAX_FRAME_LEN);
    }

    #[test]
    fn test_decode_server_message_reads_game_start() {
        let msg = decode_server_message(r#"{"type":"game_start","current_turn":"black"}"#).unwrap();

        assert_eq!(
            msg,
            ServerMessage::GameStart {
                current_turn: Color::Black
            }
        );
    }
}
