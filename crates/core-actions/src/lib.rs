//! core-actions: the per-keystroke dispatch loop and the session loop.
//!
//! `Dispatcher::read_line` owns one read cycle: render, read one unit,
//! resolve it against the keymap and built-in keys, repeat until the line is
//! submitted, a directive fires or input ends. `Session::run` strings cycles
//! together, handing each outcome to an [`Executor`] and seeding the next
//! cycle with whatever the executor returns.

use core_keymap::Directive;
use core_text::TextLine;

pub mod dispatcher;
pub mod session;

pub use dispatcher::Dispatcher;
pub use session::{Executor, Session};

/// Line reported for an end-of-input outcome.
pub const EOF_MARKER: &str = "^D";

/// Initial split of the next edit line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Seed {
    pub left: TextLine,
    pub right: TextLine,
}

impl Seed {
    pub fn new(left: impl Into<TextLine>, right: impl Into<TextLine>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }
}

/// How one read cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Enter, or a literal keybind.
    Submitted(String),
    /// `^D` or end of input.
    Eof,
    /// A directive keybind fired.
    Directive(Directive),
}

impl ReadOutcome {
    /// Single-line form: the submitted text, [`EOF_MARKER`], or the encoded
    /// directive.
    pub fn into_line(self) -> String {
        match self {
            ReadOutcome::Submitted(line) => line,
            ReadOutcome::Eof => EOF_MARKER.to_string(),
            ReadOutcome::Directive(d) => d.encode(),
        }
    }
}
