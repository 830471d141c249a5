use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

pub const ROOM_CODE_LEN: usize = 6;
pub(crate) const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Invalid room code")]
pub struct InvalidRoomCode;

/// Six uppercase alphanumerics. Input is case-insensitive and trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    pub fn parse(raw: &str) -> Result<Self, InvalidRoomCode> {
        let normalized = raw.trim().to_ascii_uppercase();
        if normalized.len() == ROOM_CODE_LEN && normalized.bytes().all(is_code_byte) {
            Ok(Self(normalized))
        } else {
            Err(InvalidRoomCode)
        }
    }

    pub(crate) fn generate<R: Rng>(rng: &mut R) -> Self {
        let code = (0..ROOM_CODE_LEN)
            .map(|_| ROOM_CODE_ALPHABET[rng.gen_range(0..ROOM_CODE_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub(crate) fn is_code_byte(byte: u8) -> bool {
    ROOM_CODE_ALPHABET.contains(&byte)
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RoomCode {
    type Error = InvalidRoomCode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}
