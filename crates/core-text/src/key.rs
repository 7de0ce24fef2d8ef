//! Keyboard classification of decoded units.

use crate::unit::{CharUnit, ESC};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Printable character.
    Char(char),
    /// C0 control byte, reported by its caret letter (`^A` => `Ctrl('A')`).
    Ctrl(char),
    /// Lone ESC.
    Escape,
    /// DEL (0x7F), sent by most terminals for the backspace key.
    Backspace,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    Insert,
    Delete,
    PageUp,
    PageDown,
    /// Escape sequence or byte pattern with no mapping.
    Unknown,
}

impl Key {
    pub fn classify(unit: &CharUnit) -> Key {
        let bytes = unit.bytes();
        match bytes {
            [ESC] => Key::Escape,
            [0x7F] => Key::Backspace,
            [b] if *b < 0x20 => Key::Ctrl((0x40 + b) as char),
            [ESC, rest @ ..] => classify_sequence(rest),
            _ => unit.as_char().map_or(Key::Unknown, Key::Char),
        }
    }
}

fn classify_sequence(rest: &[u8]) -> Key {
    match rest {
        b"[A" | b"OA" => Key::Up,
        b"[B" | b"OB" => Key::Down,
        b"[C" | b"OC" => Key::Right,
        b"[D" | b"OD" => Key::Left,
        b"[H" | b"OH" | b"[1~" | b"[7~" => Key::Home,
        b"[F" | b"OF" | b"[4~" | b"[8~" => Key::End,
        b"[2~" => Key::Insert,
        b"[3~" => Key::Delete,
        b"[5~" => Key::PageUp,
        b"[6~" => Key::PageDown,
        _ => Key::Unknown,
    }
}
