//! Character units and unit-sequence lines.
//!
//! `TextLine` is the value type shared by the edit buffer, completion engine,
//! history store and renderer. It is a plain ordered sequence of
//! [`CharUnit`]s: indices and lengths are counted in units (not bytes), so
//! splitting a line at the cursor can never cut a multi-byte character.

use std::fmt;
use std::ops::{Add, Range};

pub mod key;
pub mod unit;
pub mod width;

pub use key::Key;
pub use unit::{CharUnit, ESC, MAX_UNIT_BYTES, utf8_len};
pub use width::{char_width, str_width};

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextLine {
    units: Vec<CharUnit>,
}

impl TextLine {
    pub fn new() -> Self {
        Self { units: Vec::new() }
    }

    /// Number of units in the line.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Empty or whitespace-only.
    pub fn is_blank(&self) -> bool {
        self.units.iter().all(CharUnit::is_whitespace)
    }

    /// Display width in terminal columns.
    pub fn width(&self) -> usize {
        self.units.iter().map(CharUnit::width).sum()
    }

    pub fn units(&self) -> &[CharUnit] {
        &self.units
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CharUnit> {
        self.units.iter()
    }

    pub fn first(&self) -> Option<&CharUnit> {
        self.units.first()
    }

    pub fn last(&self) -> Option<&CharUnit> {
        self.units.last()
    }

    pub fn push(&mut self, unit: CharUnit) {
        self.units.push(unit);
    }

    pub fn push_front(&mut self, unit: CharUnit) {
        self.units.insert(0, unit);
    }

    pub fn pop_back(&mut self) -> Option<CharUnit> {
        self.units.pop()
    }

    pub fn pop_front(&mut self) -> Option<CharUnit> {
        if self.units.is_empty() {
            None
        } else {
            Some(self.units.remove(0))
        }
    }

    pub fn clear(&mut self) {
        self.units.clear();
    }

    pub fn append(&mut self, other: &TextLine) {
        self.units.extend(other.units.iter().cloned());
    }

    pub fn starts_with(&self, prefix: &TextLine) -> bool {
        self.units.starts_with(&prefix.units)
    }

    pub fn ends_with_unit(&self, c: char) -> bool {
        self.units.last().and_then(CharUnit::as_char) == Some(c)
    }

    /// Remainder after `prefix`, or `None` if `prefix` does not match.
    pub fn strip_prefix(&self, prefix: &TextLine) -> Option<TextLine> {
        self.units
            .strip_prefix(prefix.units.as_slice())
            .map(|rest| TextLine {
                units: rest.to_vec(),
            })
    }

    /// Sub-line over a unit range (clamped to the line length).
    pub fn slice(&self, range: Range<usize>) -> TextLine {
        let end = range.end.min(self.units.len());
        let start = range.start.min(end);
        TextLine {
            units: self.units[start..end].to_vec(),
        }
    }

    /// Split into `[0, at)` and `[at, len)`.
    pub fn split_at(&self, at: usize) -> (TextLine, TextLine) {
        let at = at.min(self.units.len());
        (self.slice(0..at), self.slice(at..self.units.len()))
    }

    pub fn trim_start(&self) -> TextLine {
        let start = self
            .units
            .iter()
            .position(|u| !u.is_whitespace())
            .unwrap_or(self.units.len());
        self.slice(start..self.units.len())
    }

    pub fn trim_end(&self) -> TextLine {
        let end = self
            .units
            .iter()
            .rposition(|u| !u.is_whitespace())
            .map_or(0, |i| i + 1);
        self.slice(0..end)
    }

    pub fn trim(&self) -> TextLine {
        self.trim_start().trim_end()
    }

    /// Raw bytes of every unit, concatenated.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.units
            .iter()
            .flat_map(|u| u.bytes().iter().copied())
            .collect()
    }
}

impl fmt::Display for TextLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.to_bytes()))
    }
}

impl From<&str> for TextLine {
    fn from(s: &str) -> Self {
        s.chars().map(CharUnit::from_char).collect()
    }
}

impl From<String> for TextLine {
    fn from(s: String) -> Self {
        TextLine::from(s.as_str())
    }
}

impl FromIterator<CharUnit> for TextLine {
    fn from_iter<I: IntoIterator<Item = CharUnit>>(iter: I) -> Self {
        TextLine {
            units: iter.into_iter().collect(),
        }
    }
}

impl Extend<CharUnit> for TextLine {
    fn extend<I: IntoIterator<Item = CharUnit>>(&mut self, iter: I) {
        self.units.extend(iter);
    }
}

impl Add<&TextLine> for &TextLine {
    type Output = TextLine;

    fn add(self, rhs: &TextLine) -> TextLine {
        let mut out = self.clone();
        out.append(rhs);
        out
    }
}

impl Add<&TextLine> for TextLine {
    type Output = TextLine;

    fn add(mut self, rhs: &TextLine) -> TextLine {
        self.append(rhs);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_str_counts_units_not_bytes() {
        let line = TextLine::from("a漢😀");
        assert_eq!(line.len(), 3);
        assert_eq!(line.width(), 5);
        assert_eq!(line.to_string(), "a漢😀");
    }

    #[test]
    fn concatenation_reconstructs() {
        let (l, r) = TextLine::from("hello world").split_at(5);
        assert_eq!(l.to_string(), "hello");
        assert_eq!(r.to_string(), " world");
        assert_eq!((&l + &r).to_string(), "hello world");
    }

    #[test]
    fn pop_front_and_back() {
        let mut line = TextLine::from("abc");
        assert_eq!(line.pop_front().and_then(|u| u.as_char()), Some('a'));
        assert_eq!(line.pop_back().and_then(|u| u.as_char()), Some('c'));
        assert_eq!(line.to_string(), "b");
        line.clear();
        assert_eq!(line.pop_front(), None);
        assert_eq!(line.pop_back(), None);
    }

    #[test]
    fn prefix_handling() {
        let line = TextLine::from("git commit -m x");
        let prefix = TextLine::from("git ");
        assert!(line.starts_with(&prefix));
        assert_eq!(
            line.strip_prefix(&prefix).map(|t| t.to_string()),
            Some("commit -m x".to_string())
        );
        assert!(line.strip_prefix(&TextLine::from("ls")).is_none());
    }

    #[test]
    fn trimming() {
        let line = TextLine::from("  ls -la \t");
        assert_eq!(line.trim_start().to_string(), "ls -la \t");
        assert_eq!(line.trim_end().to_string(), "  ls -la");
        assert_eq!(line.trim().to_string(), "ls -la");
        assert!(TextLine::from(" \t ").is_blank());
        assert!(TextLine::new().is_blank());
        assert!(TextLine::from(" \t ").trim().is_empty());
    }

    #[test]
    fn slice_is_clamped() {
        let line = TextLine::from("abc");
        assert_eq!(line.slice(1..10).to_string(), "bc");
        assert_eq!(line.slice(5..10).to_string(), "");
    }
}
