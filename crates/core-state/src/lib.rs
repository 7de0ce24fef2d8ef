//! Edit state: the cursor-split line buffer with its history ring, and the
//! persistent history log.
//!
//! The buffer never stores a cursor index. Each ring entry is a `(left,
//! right)` pair whose concatenation is the line; the cursor sits between the
//! two halves, so every motion is a unit move from one side to the other and
//! `cursor == left.len()` holds by construction.
//!
//! The ring is seeded from history (oldest first) and always ends with the
//! live entry being typed. Recalling an older entry edits that entry in
//! place; each entry keeps its own split while the user moves around.

use core_text::{CharUnit, Key, TextLine};
use tracing::trace;

pub mod history;
pub use history::{HistoryError, HistoryStore, is_recordable, normalize_entries};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditMode {
    #[default]
    Insert,
    Overwrite,
}

impl EditMode {
    /// Three-letter tag shown in the header row.
    pub fn tag(self) -> &'static str {
        match self {
            EditMode::Insert => "INS",
            EditMode::Overwrite => "OVR",
        }
    }

    fn toggled(self) -> Self {
        match self {
            EditMode::Insert => EditMode::Overwrite,
            EditMode::Overwrite => EditMode::Insert,
        }
    }
}

/// One ring entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    pub left: TextLine,
    pub right: TextLine,
}

impl Entry {
    pub fn new(left: TextLine, right: TextLine) -> Self {
        Self { left, right }
    }

    pub fn line(&self) -> TextLine {
        &self.left + &self.right
    }
}

#[derive(Debug, Clone)]
pub struct EditBuffer {
    entries: Vec<Entry>,
    current: usize,
    mode: EditMode,
    wrap: bool,
}

impl Default for EditBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl EditBuffer {
    /// Buffer holding a single empty live entry.
    pub fn new() -> Self {
        Self {
            entries: vec![Entry::default()],
            current: 0,
            mode: EditMode::Insert,
            wrap: false,
        }
    }

    /// Seed the ring with past lines (oldest first), cursor at the start of
    /// each, followed by an empty live entry.
    pub fn from_history<I>(lines: I) -> Self
    where
        I: IntoIterator<Item = TextLine>,
    {
        let mut entries: Vec<Entry> = lines
            .into_iter()
            .map(|line| Entry::new(TextLine::new(), line))
            .collect();
        entries.push(Entry::default());
        let current = entries.len() - 1;
        Self {
            entries,
            current,
            mode: EditMode::Insert,
            wrap: false,
        }
    }

    /// Wrap around at either end of the ring instead of stopping.
    pub fn set_wrap(&mut self, wrap: bool) {
        self.wrap = wrap;
    }

    /// Append an entry and make it active.
    pub fn push_preset(&mut self, left: TextLine, right: TextLine) {
        self.entries.push(Entry::new(left, right));
        self.current = self.entries.len() - 1;
        trace!(target: "state.edit", entries = self.entries.len(), "push_preset");
    }

    /// Begin the next read cycle with `(left, right)` as the live entry.
    ///
    /// A recalled entry that was active moves to the end of the ring. Entries
    /// left behind that are not worth recalling are dropped, the rest are
    /// trimmed. Mode resets to Insert.
    pub fn open_line(&mut self, left: TextLine, right: TextLine) {
        let last = self.entries.len() - 1;
        if self.current < last {
            let recalled = self.entries.remove(self.current);
            self.entries.push(recalled);
            self.settle(self.entries.len() - 2);
        }
        self.settle(self.entries.len() - 1);
        self.mode = EditMode::Insert;
        self.push_preset(left, right);
    }

    fn settle(&mut self, idx: usize) {
        let Some(entry) = self.entries.get_mut(idx) else {
            return;
        };
        let line = entry.line();
        if !is_recordable(&line) {
            self.entries.remove(idx);
            return;
        }
        let leading = line.iter().take_while(|u| u.is_whitespace()).count();
        let trimmed = line.trim();
        let cursor = entry.left.len().saturating_sub(leading).min(trimmed.len());
        let (left, right) = trimmed.split_at(cursor);
        entry.left = left;
        entry.right = right;
    }

    /// Apply one keystroke to the active entry.
    pub fn edit(&mut self, unit: &CharUnit) {
        let key = unit.key();
        trace!(target: "state.edit", ?key, "edit");
        match key {
            Key::Left | Key::Ctrl('B') => self.move_left(),
            Key::Right | Key::Ctrl('F') => self.move_right(),
            Key::Home | Key::Ctrl('A') => {
                let entry = self.active_mut();
                let moved = std::mem::take(&mut entry.left);
                entry.right = &moved + &entry.right;
            }
            Key::End | Key::Ctrl('E') => {
                let entry = self.active_mut();
                let moved = std::mem::take(&mut entry.right);
                entry.left.append(&moved);
            }
            Key::Backspace | Key::Ctrl('H') => {
                self.active_mut().left.pop_back();
            }
            Key::Delete => {
                self.active_mut().right.pop_front();
            }
            Key::Up | Key::Ctrl('P') => self.select_previous(),
            Key::Down => self.select_next(),
            Key::Insert => self.toggle_mode(),
            Key::Char(_) if unit.is_printable() => self.insert(unit.clone()),
            _ => {}
        }
    }

    fn insert(&mut self, unit: CharUnit) {
        let overwrite = self.mode == EditMode::Overwrite;
        let entry = self.active_mut();
        if overwrite {
            entry.right.pop_front();
        }
        entry.left.push(unit);
    }

    fn move_left(&mut self) {
        let entry = self.active_mut();
        if let Some(unit) = entry.left.pop_back() {
            entry.right.push_front(unit);
        }
    }

    fn move_right(&mut self) {
        let entry = self.active_mut();
        if let Some(unit) = entry.right.pop_front() {
            entry.left.push(unit);
        }
    }

    fn select_previous(&mut self) {
        if self.current > 0 {
            self.current -= 1;
        } else if self.wrap {
            self.current = self.entries.len() - 1;
        }
    }

    fn select_next(&mut self) {
        if self.current + 1 < self.entries.len() {
            self.current += 1;
        } else if self.wrap {
            self.current = 0;
        }
    }

    /// Overwrite the active entry.
    pub fn replace(&mut self, left: TextLine, right: TextLine) {
        *self.active_mut() = Entry::new(left, right);
    }

    pub fn toggle_mode(&mut self) {
        self.mode = self.mode.toggled();
        trace!(target: "state.edit", mode = self.mode.tag(), "mode_toggle");
    }

    pub fn left(&self) -> &TextLine {
        &self.active().left
    }

    pub fn right(&self) -> &TextLine {
        &self.active().right
    }

    pub fn line(&self) -> TextLine {
        self.active().line()
    }

    /// Cursor position in units from the start of the line.
    pub fn cursor(&self) -> usize {
        self.active().left.len()
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn index(&self) -> usize {
        self.current
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    fn active(&self) -> &Entry {
        &self.entries[self.current]
    }

    fn active_mut(&mut self) -> &mut Entry {
        &mut self.entries[self.current]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(s: &[u8]) -> CharUnit {
        CharUnit::from_bytes(s)
    }

    fn type_str(buf: &mut EditBuffer, s: &str) {
        for c in s.chars() {
            buf.edit(&CharUnit::from_char(c));
        }
    }

    fn split(buf: &EditBuffer) -> (String, String) {
        (buf.left().to_string(), buf.right().to_string())
    }

    #[test]
    fn typing_and_motion() {
        let mut buf = EditBuffer::new();
        type_str(&mut buf, "lsx");
        buf.edit(&units(b"\x1b[D"));
        assert_eq!(split(&buf), ("ls".into(), "x".into()));
        buf.edit(&units(&[0x01]));
        assert_eq!(split(&buf), ("".into(), "lsx".into()));
        buf.edit(&units(&[0x06]));
        assert_eq!(split(&buf), ("l".into(), "sx".into()));
        buf.edit(&units(&[0x05]));
        assert_eq!(split(&buf), ("lsx".into(), "".into()));
        assert_eq!(buf.cursor(), 3);
    }

    #[test]
    fn backspace_and_delete() {
        let mut buf = EditBuffer::new();
        buf.replace("abc".into(), "def".into());
        buf.edit(&units(&[0x7F]));
        buf.edit(&units(&[0x08]));
        buf.edit(&units(b"\x1b[3~"));
        assert_eq!(split(&buf), ("a".into(), "ef".into()));
    }

    #[test]
    fn empty_sides_are_noops() {
        let mut buf = EditBuffer::new();
        for raw in [&[0x7F][..], b"\x1b[3~", b"\x1b[D", b"\x1b[C", &[0x01], &[0x05]] {
            buf.edit(&units(raw));
        }
        assert_eq!(split(&buf), ("".into(), "".into()));
    }

    #[test]
    fn overwrite_replaces_right() {
        let mut buf = EditBuffer::new();
        buf.replace("a".into(), "bcd".into());
        buf.edit(&units(b"\x1b[2~"));
        assert_eq!(buf.mode(), EditMode::Overwrite);
        type_str(&mut buf, "XY");
        assert_eq!(split(&buf), ("aXY".into(), "d".into()));
        type_str(&mut buf, "ZW");
        assert_eq!(split(&buf), ("aXYZW".into(), "".into()));
    }

    #[test]
    fn mode_toggles_twice_back() {
        let mut buf = EditBuffer::new();
        buf.toggle_mode();
        buf.toggle_mode();
        assert_eq!(buf.mode(), EditMode::Insert);
    }

    #[test]
    fn controls_and_unknown_sequences_ignored() {
        let mut buf = EditBuffer::new();
        type_str(&mut buf, "ab");
        buf.edit(&units(&[0x0B]));
        buf.edit(&units(b"\x1b[1;5C"));
        buf.edit(&units(&[0x1B]));
        assert_eq!(buf.line().to_string(), "ab");
    }

    #[test]
    fn ring_navigation_keeps_per_entry_split() {
        let mut buf = EditBuffer::from_history(["ls".into(), "pwd".into()]);
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.index(), 2);
        type_str(&mut buf, "ec");
        buf.edit(&units(b"\x1b[A"));
        assert_eq!(split(&buf), ("".into(), "pwd".into()));
        buf.edit(&units(&[0x10]));
        assert_eq!(buf.line().to_string(), "ls");
        buf.edit(&units(b"\x1b[A"));
        assert_eq!(buf.index(), 0);
        buf.edit(&units(b"\x1b[B"));
        buf.edit(&units(b"\x1b[B"));
        assert_eq!(split(&buf), ("ec".into(), "".into()));
        buf.edit(&units(b"\x1b[B"));
        assert_eq!(buf.index(), 2);
    }

    #[test]
    fn ring_wraps_when_enabled() {
        let mut buf = EditBuffer::from_history(["ls".into()]);
        buf.set_wrap(true);
        buf.edit(&units(b"\x1b[B"));
        assert_eq!(buf.index(), 0);
        buf.edit(&units(b"\x1b[A"));
        assert_eq!(buf.index(), 1);
    }

    #[test]
    fn open_line_drops_blank_and_trims() {
        let mut buf = EditBuffer::new();
        buf.replace("   ".into(), "".into());
        buf.open_line("".into(), "".into());
        assert_eq!(buf.len(), 1);

        buf.replace("  echo hi ".into(), "".into());
        buf.toggle_mode();
        buf.open_line("x".into(), "y".into());
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.entries()[0].line().to_string(), "echo hi");
        assert_eq!(split(&buf), ("x".into(), "y".into()));
        assert_eq!(buf.mode(), EditMode::Insert);
        assert_eq!(buf.index(), 1);
    }

    #[test]
    fn open_line_moves_recalled_to_end() {
        let mut buf = EditBuffer::from_history(["a".into(), "b".into(), "c".into()]);
        buf.edit(&units(b"\x1b[A"));
        buf.edit(&units(b"\x1b[A"));
        assert_eq!(buf.line().to_string(), "b");
        buf.open_line("".into(), "".into());
        let lines: Vec<String> = buf.entries().iter().map(|e| e.line().to_string()).collect();
        assert_eq!(lines, vec!["a", "c", "b", ""]);
    }
}
