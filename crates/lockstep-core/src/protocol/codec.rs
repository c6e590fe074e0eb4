//! Line codec for encoding and decoding Lockstep protocol commands.
//!
//! Wire format: one command per message. A message is a line of
//! space-separated tokens terminated by a single delimiter byte (by default
//! `\n`). The leading token selects the command; the remaining tokens are
//! integers or raw trailing text depending on the command.
//!
//! Decoding is purely syntactic. Malformed input is reported as a
//! [`ProtocolError`] value and never panics; the caller drops the message and
//! keeps the connection open.

use crate::protocol::command::{
    ClientId, Command, FrameNumber, FIELD_SEPARATOR, RECIPIENT_SEPARATOR,
};
use thiserror::Error;

/// Errors that can occur during command encoding or decoding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The message contains no tokens at all.
    #[error("empty message")]
    Empty,

    /// The leading token is not a recognized command tag.
    #[error("unknown command tag: {0:?}")]
    UnknownTag(String),

    /// A required field is absent from the message.
    #[error("{tag} message is missing its {field} field")]
    MissingField {
        tag: &'static str,
        field: &'static str,
    },

    /// A field is present but could not be parsed.
    #[error("{tag} message has an invalid {field} field: {value:?}")]
    InvalidField {
        tag: &'static str,
        field: &'static str,
        value: String,
    },

    /// The message bytes are not valid UTF-8.
    #[error("message is not valid UTF-8: {0}")]
    InvalidUtf8(String),

    /// The encoded line would contain the message delimiter. Textual payloads
    /// containing the delimiter are an encoding precondition violation.
    #[error("encoded command contains the message delimiter 0x{0:02X}")]
    DelimiterInPayload(u8),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a [`Command`] into its wire line, terminated with `delimiter`.
///
/// # Errors
///
/// Returns [`ProtocolError::DelimiterInPayload`] if the encoded line would
/// contain the delimiter byte — the message would be split mid-command on the
/// receiving side, so it is refused instead of silently mangled.
///
/// # Examples
///
/// ```rust
/// use lockstep_core::{decode_command, encode_command, Command, DEFAULT_DELIMITER};
///
/// let command = Command::AdvanceFrame(7);
/// let bytes = encode_command(&command, DEFAULT_DELIMITER).unwrap();
/// assert_eq!(bytes, b"FRAME 7\n");
///
/// // The transport strips the delimiter before handing the message back.
/// let decoded = decode_command(&bytes[..bytes.len() - 1]).unwrap();
/// assert_eq!(decoded, command);
/// ```
pub fn encode_command(command: &Command, delimiter: u8) -> Result<Vec<u8>, ProtocolError> {
    let line = match command {
        Command::AssignClientId(id) => format!("ID {id}"),
        Command::AdvanceFrame(frame) => format!("FRAME {frame}"),
        Command::RenderDone(id) => format!("DONE {id}"),
        Command::BroadcastString { sender, payload } => format!("MSG {sender} {payload}"),
        Command::TargetedString {
            sender,
            recipients,
            payload,
        } => {
            let ids = recipients
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(&RECIPIENT_SEPARATOR.to_string());
            format!("MSGTO {sender} {ids} {payload}")
        }
        Command::Reset => "RESET".to_string(),
    };

    if line.as_bytes().contains(&delimiter) {
        return Err(ProtocolError::DelimiterInPayload(delimiter));
    }

    let mut bytes = line.into_bytes();
    bytes.push(delimiter);
    Ok(bytes)
}

/// Decodes one delimited message (delimiter already stripped) into a
/// [`Command`].
///
/// Round-trip law: `decode_command` is the exact inverse of
/// [`encode_command`] for every constructible command.
///
/// # Errors
///
/// Returns [`ProtocolError`] describing the first syntactic problem found.
pub fn decode_command(message: &[u8]) -> Result<Command, ProtocolError> {
    let text = std::str::from_utf8(message)
        .map_err(|e| ProtocolError::InvalidUtf8(e.to_string()))?;
    if text.is_empty() {
        return Err(ProtocolError::Empty);
    }

    // Split off the leading tag; the remainder (if any) is parsed per tag.
    let (tag, rest) = match text.split_once(FIELD_SEPARATOR) {
        Some((tag, rest)) => (tag, Some(rest)),
        None => (text, None),
    };

    match tag {
        "ID" => {
            let token = require_field("ID", "client id", rest)?;
            Ok(Command::AssignClientId(parse_client_id(
                "ID",
                "client id",
                token,
            )?))
        }
        "FRAME" => {
            let token = require_field("FRAME", "frame number", rest)?;
            Ok(Command::AdvanceFrame(parse_frame_number(token)?))
        }
        "DONE" => {
            let token = require_field("DONE", "client id", rest)?;
            Ok(Command::RenderDone(parse_client_id(
                "DONE",
                "client id",
                token,
            )?))
        }
        "MSG" => {
            let rest = require_field("MSG", "sender id", rest)?;
            let (sender_token, payload) = rest
                .split_once(FIELD_SEPARATOR)
                .ok_or(ProtocolError::MissingField {
                    tag: "MSG",
                    field: "payload",
                })?;
            Ok(Command::BroadcastString {
                sender: parse_client_id("MSG", "sender id", sender_token)?,
                payload: payload.to_string(),
            })
        }
        "MSGTO" => {
            let rest = require_field("MSGTO", "sender id", rest)?;
            let (sender_token, rest) = rest
                .split_once(FIELD_SEPARATOR)
                .ok_or(ProtocolError::MissingField {
                    tag: "MSGTO",
                    field: "recipients",
                })?;
            let (ids_token, payload) = rest
                .split_once(FIELD_SEPARATOR)
                .ok_or(ProtocolError::MissingField {
                    tag: "MSGTO",
                    field: "payload",
                })?;
            Ok(Command::TargetedString {
                sender: parse_client_id("MSGTO", "sender id", sender_token)?,
                recipients: parse_recipients(ids_token)?,
                payload: payload.to_string(),
            })
        }
        "RESET" => match rest {
            None => Ok(Command::Reset),
            Some(extra) => Err(ProtocolError::InvalidField {
                tag: "RESET",
                field: "arguments",
                value: extra.to_string(),
            }),
        },
        _ => Err(ProtocolError::UnknownTag(tag.to_string())),
    }
}

// ── Field parsing helpers ─────────────────────────────────────────────────────

fn require_field<'a>(
    tag: &'static str,
    field: &'static str,
    value: Option<&'a str>,
) -> Result<&'a str, ProtocolError> {
    value.ok_or(ProtocolError::MissingField { tag, field })
}

fn parse_client_id(
    tag: &'static str,
    field: &'static str,
    token: &str,
) -> Result<ClientId, ProtocolError> {
    token.parse().map_err(|_| ProtocolError::InvalidField {
        tag,
        field,
        value: token.to_string(),
    })
}

fn parse_frame_number(token: &str) -> Result<FrameNumber, ProtocolError> {
    token.parse().map_err(|_| ProtocolError::InvalidField {
        tag: "FRAME",
        field: "frame number",
        value: token.to_string(),
    })
}

/// Parses a comma-separated recipient list. An empty token decodes to an
/// empty recipient set so that every constructible command round-trips.
fn parse_recipients(token: &str) -> Result<Vec<ClientId>, ProtocolError> {
    if token.is_empty() {
        return Ok(Vec::new());
    }
    token
        .split(RECIPIENT_SEPARATOR)
        .map(|id| parse_client_id("MSGTO", "recipients", id))
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::command::DEFAULT_DELIMITER;

    fn round_trip(command: &Command) -> Command {
        let encoded = encode_command(command, DEFAULT_DELIMITER).expect("encode failed");
        assert_eq!(
            *encoded.last().expect("encoded command is never empty"),
            DEFAULT_DELIMITER,
            "every encoded command must end with the delimiter"
        );
        decode_command(&encoded[..encoded.len() - 1]).expect("decode failed")
    }

    // ── Round trips ──────────────────────────────────────────────────────────

    #[test]
    fn test_assign_client_id_round_trip() {
        let command = Command::AssignClientId(3);
        assert_eq!(round_trip(&command), command);
    }

    #[test]
    fn test_advance_frame_round_trip() {
        let command = Command::AdvanceFrame(1_234_567);
        assert_eq!(round_trip(&command), command);
    }

    #[test]
    fn test_render_done_round_trip() {
        let command = Command::RenderDone(0);
        assert_eq!(round_trip(&command), command);
    }

    #[test]
    fn test_broadcast_round_trip_with_spaces_in_payload() {
        let command = Command::BroadcastString {
            sender: 2,
            payload: "ball position 14.5 92.1".to_string(),
        };
        assert_eq!(round_trip(&command), command);
    }

    #[test]
    fn test_broadcast_round_trip_with_empty_payload() {
        let command = Command::BroadcastString {
            sender: 7,
            payload: String::new(),
        };
        assert_eq!(round_trip(&command), command);
    }

    #[test]
    fn test_targeted_round_trip_with_multiple_recipients() {
        let command = Command::TargetedString {
            sender: 1,
            recipients: vec![2, 3, 5],
            payload: "only for some of you".to_string(),
        };
        assert_eq!(round_trip(&command), command);
    }

    #[test]
    fn test_targeted_round_trip_with_single_recipient() {
        let command = Command::TargetedString {
            sender: 4,
            recipients: vec![1],
            payload: "x".to_string(),
        };
        assert_eq!(round_trip(&command), command);
    }

    #[test]
    fn test_targeted_round_trip_with_empty_recipient_set() {
        let command = Command::TargetedString {
            sender: 4,
            recipients: vec![],
            payload: "nobody hears this".to_string(),
        };
        assert_eq!(round_trip(&command), command);
    }

    #[test]
    fn test_reset_round_trip() {
        assert_eq!(round_trip(&Command::Reset), Command::Reset);
    }

    // ── Wire shapes ──────────────────────────────────────────────────────────

    #[test]
    fn test_encoded_wire_shapes_match_the_protocol() {
        let cases: Vec<(Command, &[u8])> = vec![
            (Command::AssignClientId(3), b"ID 3\n"),
            (Command::AdvanceFrame(42), b"FRAME 42\n"),
            (Command::RenderDone(3), b"DONE 3\n"),
            (
                Command::BroadcastString {
                    sender: 2,
                    payload: "hello".to_string(),
                },
                b"MSG 2 hello\n",
            ),
            (
                Command::TargetedString {
                    sender: 1,
                    recipients: vec![2, 3],
                    payload: "hi".to_string(),
                },
                b"MSGTO 1 2,3 hi\n",
            ),
            (Command::Reset, b"RESET\n"),
        ];

        for (command, expected) in cases {
            let encoded = encode_command(&command, DEFAULT_DELIMITER).expect("encode failed");
            assert_eq!(encoded, expected, "wire bytes for {command:?}");
        }
    }

    #[test]
    fn test_encode_with_alternate_delimiter() {
        let encoded = encode_command(&Command::AdvanceFrame(9), b'\0').expect("encode failed");
        assert_eq!(encoded, b"FRAME 9\0");
    }

    // ── Malformed input ──────────────────────────────────────────────────────

    #[test]
    fn test_decode_empty_message_is_an_error() {
        assert_eq!(decode_command(b""), Err(ProtocolError::Empty));
    }

    #[test]
    fn test_decode_unknown_tag_is_an_error() {
        assert_eq!(
            decode_command(b"BOGUS 1 2"),
            Err(ProtocolError::UnknownTag("BOGUS".to_string()))
        );
    }

    #[test]
    fn test_decode_non_numeric_frame_is_an_error() {
        assert_eq!(
            decode_command(b"FRAME soon"),
            Err(ProtocolError::InvalidField {
                tag: "FRAME",
                field: "frame number",
                value: "soon".to_string(),
            })
        );
    }

    #[test]
    fn test_decode_negative_client_id_is_an_error() {
        assert!(matches!(
            decode_command(b"ID -1"),
            Err(ProtocolError::InvalidField { tag: "ID", .. })
        ));
    }

    #[test]
    fn test_decode_id_without_value_is_an_error() {
        assert_eq!(
            decode_command(b"ID"),
            Err(ProtocolError::MissingField {
                tag: "ID",
                field: "client id",
            })
        );
    }

    #[test]
    fn test_decode_msg_without_payload_is_an_error() {
        assert_eq!(
            decode_command(b"MSG 2"),
            Err(ProtocolError::MissingField {
                tag: "MSG",
                field: "payload",
            })
        );
    }

    #[test]
    fn test_decode_msgto_with_bad_recipient_is_an_error() {
        assert!(matches!(
            decode_command(b"MSGTO 1 2,x,3 hi"),
            Err(ProtocolError::InvalidField {
                tag: "MSGTO",
                field: "recipients",
                ..
            })
        ));
    }

    #[test]
    fn test_decode_reset_with_trailing_tokens_is_an_error() {
        assert!(matches!(
            decode_command(b"RESET now"),
            Err(ProtocolError::InvalidField { tag: "RESET", .. })
        ));
    }

    #[test]
    fn test_decode_invalid_utf8_is_an_error() {
        assert!(matches!(
            decode_command(&[0xFF, 0xFE, 0x20]),
            Err(ProtocolError::InvalidUtf8(_))
        ));
    }

    #[test]
    fn test_encode_refuses_payload_containing_the_delimiter() {
        let command = Command::BroadcastString {
            sender: 1,
            payload: "two\nlines".to_string(),
        };
        assert_eq!(
            encode_command(&command, DEFAULT_DELIMITER),
            Err(ProtocolError::DelimiterInPayload(DEFAULT_DELIMITER))
        );
    }
}
