//! Subscriber commands
//!
//! ```text
//! SUB <key>\n      subscribe, answered with OK\n
//! UNSUB <key>\n    unsubscribe, answered with OK\n
//! ```
//!
//! Anything else is ignored without a response.

use bytes::Bytes;

/// Acknowledgement written after every accepted command
pub const ACK: &[u8] = b"OK\n";

/// A parsed subscriber command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `SUB <key>`
    Subscribe(Bytes),
    /// `UNSUB <key>`
    Unsubscribe(Bytes),
}

impl Command {
    /// Parse one command line
    ///
    /// Surrounding whitespace is trimmed; the rest must be exactly a verb and
    /// a key separated by a single space. Returns `None` for anything else.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.trim().split(' ');
        let verb = parts.next()?;
        let key = parts.next()?;
        if parts.next().is_some() || key.is_empty() {
            return None;
        }

        let key = Bytes::copy_from_slice(key.as_bytes());
        match verb {
            "SUB" => Some(Command::Subscribe(key)),
            "UNSUB" => Some(Command::Unsubscribe(key)),
            _ => None,
        }
    }

    /// The key the command refers to
    pub fn key(&self) -> &Bytes {
        match self {
            Command::Subscribe(key) | Command::Unsubscribe(key) => key,
        }
    }
}
