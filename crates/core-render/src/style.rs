//! Span styles and their terminal colors.

use core_complete::FileCategory;
use crossterm::style::Color;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Style {
    #[default]
    Plain,
    /// Header row (working directory, mode tag).
    Header,
    /// Inline error replacing the header for one frame.
    Error,
    /// Reverse-video cursor cell.
    Cursor,
    /// Dimmed history suggestion after the cursor.
    Suggestion,
    /// Completion candidate, colored by its file category.
    Candidate(Option<FileCategory>),
    /// `… N more` indicator.
    Overflow,
    /// Edit-line word from the configured command list.
    Command,
    Keyword,
    /// Shell operator such as `|` or `&&`.
    Symbol,
    /// Quoted string on the edit line.
    Quoted,
    /// Separator and timestamp printed above an echoed command.
    Rule,
}

/// Gray used for [`Style::Rule`].
pub const RULE_COLOR: Color = Color::Rgb {
    r: 112,
    g: 120,
    b: 128,
};

/// Foreground color for a file category; `None` keeps the terminal default.
pub fn category_color(category: FileCategory) -> Option<Color> {
    match category {
        FileCategory::Directory => Some(Color::Blue),
        FileCategory::Symlink => Some(Color::Cyan),
        FileCategory::BlockDevice
        | FileCategory::CharDevice
        | FileCategory::Fifo
        | FileCategory::Socket => Some(Color::Yellow),
        FileCategory::Regular | FileCategory::Other => None,
    }
}

impl Style {
    pub fn foreground(self) -> Option<Color> {
        match self {
            Style::Error => Some(Color::Red),
            Style::Header | Style::Command => Some(Color::Green),
            Style::Keyword => Some(Color::Yellow),
            Style::Symbol => Some(Color::Blue),
            Style::Quoted => Some(Color::Red),
            Style::Rule => Some(RULE_COLOR),
            Style::Candidate(Some(cat)) => category_color(cat),
            _ => None,
        }
    }

    pub fn is_reversed(self) -> bool {
        matches!(self, Style::Cursor)
    }

    pub fn is_dim(self) -> bool {
        matches!(self, Style::Suggestion | Style::Overflow)
    }
}
