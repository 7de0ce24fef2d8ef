//! Decoded input atom.
//!
//! A `CharUnit` is what the terminal decoder hands to the rest of the system:
//! one UTF-8 encoded character (1–4 bytes) or, for ESC-introduced control
//! sequences, the whole sequence (at most [`MAX_UNIT_BYTES`] bytes). Truncated
//! or invalid UTF-8 still produces a unit: the raw bytes are kept verbatim and
//! the code point is reported as U+FFFD.

use crate::key::Key;
use crate::width::char_width;
use smallvec::SmallVec;
use std::cmp::Ordering;

/// Escape byte introducing terminal control sequences.
pub const ESC: u8 = 0x1B;

/// Upper bound on the raw length of one unit (escape sequences included).
pub const MAX_UNIT_BYTES: usize = 8;

/// Code point reported for units that do not decode to a single scalar value.
pub const REPLACEMENT: u32 = 0xFFFD;

/// UTF-8 byte length implied by the high bits of a leading byte.
///
/// Continuation bytes and invalid leads report 1 so that the decoder always
/// makes progress.
#[inline]
pub fn utf8_len(lead: u8) -> usize {
    if lead & 0x80 == 0x00 {
        1
    } else if lead & 0xE0 == 0xC0 {
        2
    } else if lead & 0xF0 == 0xE0 {
        3
    } else if lead & 0xF8 == 0xF0 {
        4
    } else {
        1
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CharUnit {
    bytes: SmallVec<[u8; 4]>,
    code: u32,
    width: u8,
}

impl CharUnit {
    pub fn from_char(c: char) -> Self {
        let mut buf = [0u8; 4];
        let encoded = c.encode_utf8(&mut buf);
        Self {
            bytes: SmallVec::from_slice(encoded.as_bytes()),
            code: c as u32,
            width: char_width(c),
        }
    }

    /// Build a unit from raw bytes as read from the terminal.
    ///
    /// A slice holding exactly one valid scalar value decodes to it. An
    /// escape sequence keeps ESC as its code point. Anything else (partial
    /// or invalid UTF-8) is a best-effort unit carrying U+FFFD.
    pub fn from_bytes(raw: &[u8]) -> Self {
        let bytes: SmallVec<[u8; 4]> = SmallVec::from_slice(raw);
        if raw.len() > 1 && raw[0] == ESC {
            return Self {
                bytes,
                code: ESC as u32,
                width: 1,
            };
        }
        if let Ok(s) = std::str::from_utf8(raw) {
            let mut chars = s.chars();
            if let (Some(c), None) = (chars.next(), chars.next()) {
                return Self {
                    bytes,
                    code: c as u32,
                    width: char_width(c),
                };
            }
        }
        Self {
            bytes,
            code: REPLACEMENT,
            width: 1,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Raw byte length of this unit.
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn code(&self) -> u32 {
        self.code
    }

    /// Display width in terminal columns (1 or 2).
    pub fn width(&self) -> usize {
        self.width as usize
    }

    /// The decoded scalar value, if the unit is a single well-formed character.
    pub fn as_char(&self) -> Option<char> {
        if self.is_escape_sequence() {
            return None;
        }
        if self.code == REPLACEMENT && self.bytes.as_slice() != "\u{FFFD}".as_bytes() {
            return None;
        }
        char::from_u32(self.code)
    }

    /// Single C0 control byte or DEL.
    pub fn is_control(&self) -> bool {
        self.bytes.len() == 1 && (self.bytes[0] < 0x20 || self.bytes[0] == 0x7F)
    }

    pub fn is_escape_sequence(&self) -> bool {
        self.bytes.len() > 1 && self.bytes[0] == ESC
    }

    /// True for units that may be inserted into an edit line.
    pub fn is_printable(&self) -> bool {
        !self.is_control() && self.as_char().is_some()
    }

    pub fn is_whitespace(&self) -> bool {
        self.as_char().is_some_and(char::is_whitespace)
    }

    /// Caret notation used as the keybind lookup key.
    ///
    /// `0x06` renders as `^F`, DEL as `^?`, ESC-sequences as `^[` followed by
    /// the remaining bytes. Printable characters render as themselves.
    pub fn printable(&self) -> String {
        if let Some(c) = self.as_char()
            && !self.is_control()
        {
            return c.to_string();
        }
        let mut out = String::new();
        for &b in self.bytes.iter() {
            match b {
                0x00..=0x1F => {
                    out.push('^');
                    out.push((0x40 + b) as char);
                }
                0x7F => out.push_str("^?"),
                0x20..=0x7E => out.push(b as char),
                _ => out.push_str(&format!("<{b:02x}>")),
            }
        }
        out
    }

    /// Keyboard classification used by the edit buffer and dispatcher.
    pub fn key(&self) -> Key {
        Key::classify(self)
    }
}

impl From<char> for CharUnit {
    fn from(c: char) -> Self {
        Self::from_char(c)
    }
}

impl PartialOrd for CharUnit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CharUnit {
    fn cmp(&self, other: &Self) -> Ordering {
        self.code
            .cmp(&other.code)
            .then_with(|| self.bytes.as_slice().cmp(other.bytes.as_slice()))
    }
}
