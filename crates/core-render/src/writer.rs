//! Frame emission.
//!
//! The prompt area is drawn inline, below whatever the terminal showed
//! before, rather than on an alternate screen. The first present reserves the
//! area by printing `height - 1` newlines (scrolling the terminal if the
//! prompt sits near the bottom); every later present walks back to the top
//! row with relative moves and repaints each row in place, so the output of
//! previous commands is never disturbed.
//!
//! Echoed rows are printed below the cursor once the area has been released
//! by `finish`, so they scroll away with the rest of the terminal output.
//!
//! Invariants:
//! * While an area is reserved, newlines are written only to reserve it.
//! * Every row of the area is cleared before it is repainted, including rows
//!   the frame leaves empty.
//! * `MoveUp(0)` is never emitted (several terminals treat it as 1).

use crate::style::Style;
use crate::{Frame, Row};
use anyhow::Result;
use crossterm::{
    cursor::{Hide, MoveDown, MoveToColumn, MoveUp, Show},
    queue,
    style::{Attribute, Print, ResetColor, SetAttribute, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use std::io::Write;
use tracing::trace;

/// Destination for composed frames.
pub trait FrameSink {
    fn present(&mut self, frame: &Frame) -> Result<()>;
    /// Current terminal size as `(columns, rows)`.
    fn viewport(&self) -> (u16, u16);
    /// Clear the area and restore the cursor; the next present reserves a
    /// fresh area.
    fn finish(&mut self) -> Result<()>;
    /// Print `rows` as ordinary output, one line each.
    fn echo(&mut self, rows: &[Row]) -> Result<()>;
}

pub struct TermWriter<W: Write> {
    out: W,
    size: (u16, u16),
    reserved: Option<u16>,
    /// Row (relative to the area top) the terminal cursor is on.
    cursor_row: u16,
}

impl<W: Write> TermWriter<W> {
    pub fn new(out: W, size: (u16, u16)) -> Self {
        Self {
            out,
            size,
            reserved: None,
            cursor_row: 0,
        }
    }

    pub fn set_size(&mut self, size: (u16, u16)) {
        self.size = size;
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn move_to_top(&mut self) -> Result<()> {
        if self.cursor_row > 0 {
            queue!(self.out, MoveUp(self.cursor_row))?;
        }
        queue!(self.out, MoveToColumn(0))?;
        self.cursor_row = 0;
        Ok(())
    }

    fn write_row(&mut self, row: &Row) -> Result<()> {
        for span in &row.spans {
            if let Some(color) = span.style.foreground() {
                queue!(self.out, SetForegroundColor(color))?;
            }
            if span.style.is_reversed() {
                queue!(self.out, SetAttribute(Attribute::Reverse))?;
            }
            if span.style.is_dim() {
                queue!(self.out, SetAttribute(Attribute::Dim))?;
            }
            if span.style == Style::Header {
                queue!(self.out, SetAttribute(Attribute::Bold))?;
            }
            queue!(self.out, Print(&span.text))?;
            if span.style != Style::Plain {
                queue!(self.out, SetAttribute(Attribute::Reset), ResetColor)?;
            }
        }
        Ok(())
    }
}

impl<W: Write> FrameSink for TermWriter<W> {
    fn present(&mut self, frame: &Frame) -> Result<()> {
        let height = frame.height.max(1);
        queue!(self.out, Hide)?;
        match self.reserved {
            Some(h) if h == height => self.move_to_top()?,
            Some(_) => {
                // height changed: clear the old area and reserve again
                self.move_to_top()?;
                queue!(self.out, Clear(ClearType::FromCursorDown))?;
                self.reserve(height)?;
            }
            None => {
                queue!(self.out, MoveToColumn(0))?;
                self.reserve(height)?;
            }
        }
        for i in 0..height {
            if i > 0 {
                queue!(self.out, MoveDown(1))?;
                self.cursor_row += 1;
            }
            queue!(self.out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
            if let Some(row) = frame.rows.get(i as usize) {
                self.write_row(row)?;
            }
        }
        self.out.flush()?;
        trace!(target: "render", height, rows = frame.rows.len(), "present");
        Ok(())
    }

    fn viewport(&self) -> (u16, u16) {
        self.size
    }

    fn finish(&mut self) -> Result<()> {
        if self.reserved.take().is_some() {
            self.move_to_top()?;
            queue!(self.out, Clear(ClearType::FromCursorDown))?;
        }
        queue!(self.out, Show)?;
        self.out.flush()?;
        Ok(())
    }

    fn echo(&mut self, rows: &[Row]) -> Result<()> {
        if self.reserved.is_some() {
            self.finish()?;
        }
        for row in rows {
            queue!(self.out, MoveToColumn(0))?;
            self.write_row(row)?;
            queue!(self.out, Print("\n"))?;
        }
        self.out.flush()?;
        trace!(target: "render", rows = rows.len(), "echo");
        Ok(())
    }
}

impl<W: Write> TermWriter<W> {
    /// Print `height - 1` newlines, then return to the area top.
    fn reserve(&mut self, height: u16) -> Result<()> {
        for _ in 1..height {
            queue!(self.out, Print("\n"))?;
        }
        self.cursor_row = height - 1;
        self.move_to_top()?;
        self.reserved = Some(height);
        Ok(())
    }
}
