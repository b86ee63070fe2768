// command.rs — Decoding of pipe frames and handshake replies.
//
// Frames are raw byte reads (no length prefix, no terminator). Everything after
// the first NUL is ignored, the rest is split on whitespace:
//
//   Relogin <language> <server> <channel> <character>
//
// The character number is 1-based on the wire. Each field is the integer at
// the start of its token, so "4Relogin" (two writes merged into one read)
// still yields 4. A field with no leading integer rejects the whole frame;
// there are no partially filled requests.

use crate::error::FrameError;

/// Only command the control process sends after the handshake.
const RELOGIN: &str = "Relogin";

/// A decoded request to log into a server/channel and optionally pick a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginRequest {
    pub language: i32,
    pub server: i32,
    pub channel: i32,
    /// 0-based slot, `None` when the wire value was 0 or negative.
    pub character_slot: Option<u32>,
}

impl LoginRequest {
    /// Build a request from wire values (1-based character number).
    pub fn from_wire(language: i32, server: i32, channel: i32, character: i32) -> Self {
        let character_slot = character
            .checked_sub(1)
            .and_then(|slot| u32::try_from(slot).ok());
        Self { language, server, channel, character_slot }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Relogin(LoginRequest),
}

impl Command {
    /// Decode one frame as read from a pipe.
    pub fn decode(frame: &[u8]) -> Result<Self, FrameError> {
        let text = String::from_utf8_lossy(until_nul(frame));
        let mut tokens = text.split_whitespace();

        match tokens.next() {
            None => Err(FrameError::Empty),
            Some(RELOGIN) => {
                let language = int_field(tokens.next(), "language")?;
                let server = int_field(tokens.next(), "server")?;
                let channel = int_field(tokens.next(), "channel")?;
                let character = int_field(tokens.next(), "character")?;
                Ok(Command::Relogin(LoginRequest::from_wire(language, server, channel, character)))
            }
            Some(other) => Err(FrameError::UnknownCommand(other.to_string())),
        }
    }
}

/// Decode a handshake reply the way the control process encodes booleans:
/// an integer, non-zero meaning true. Leading whitespace is skipped.
pub fn decode_flag(reply: &[u8]) -> Option<bool> {
    let text = String::from_utf8_lossy(until_nul(reply));
    leading_int(text.trim_start()).map(|v| v != 0)
}

/// Integer at the start of `text`: optional sign, then digits. Anything after
/// the digits is ignored. `None` if there are no digits or the value doesn't
/// fit an i32.
fn leading_int(text: &str) -> Option<i32> {
    let sign_len = usize::from(text.starts_with(|c: char| c == '+' || c == '-'));
    let digits = text[sign_len..].bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 { return None; }

    text[..sign_len + digits].parse().ok()
}

fn int_field(token: Option<&str>, field: &'static str) -> Result<i32, FrameError> {
    let token = token.ok_or(FrameError::MissingField(field))?;
    leading_int(token).ok_or_else(|| FrameError::InvalidField {
        field,
        value: token.to_string(),
    })
}

fn until_nul(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b == 0) {
        Some(end) => &bytes[..end],
        None => bytes,
    }
}
