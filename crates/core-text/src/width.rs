//! Display width of a single decoded character unit.
//!
//! Every width decision for the edit line and the candidate rows flows through
//! [`char_width`]. A unit is either one or two terminal columns wide; zero-width
//! characters (combining marks, joiners) are widened to one column so the cursor
//! marker can never collapse onto a neighbouring cell.
//!
//! Invariants:
//! - Return value is always 1 or 2.
//! - Pictographic code points are treated as wide even where `unicode_width`
//!   reports 1; over-estimation only leaves a blank cell, under-estimation
//!   causes render drift.

use unicode_width::UnicodeWidthChar;

// Rough Extended Pictographic heuristic (covers most emoji blocks + misc symbols used as emoji)
fn is_extended_pictographic(c: char) -> bool {
    ('\u{1F300}'..='\u{1FAFF}').contains(&c)
}

/// Column width of one character, clamped to the 1..=2 range.
#[inline]
pub fn char_width(c: char) -> u8 {
    if c.is_ascii() {
        return 1;
    }
    if is_extended_pictographic(c) {
        return 2;
    }
    match UnicodeWidthChar::width(c) {
        Some(2) => 2,
        _ => 1,
    }
}

/// Sum of the column widths of a string.
pub fn str_width(s: &str) -> usize {
    s.chars().map(|c| char_width(c) as usize).sum()
}
