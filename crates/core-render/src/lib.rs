//! Fixed-height viewport composition.
//!
//! The prompt area is a block of `height` terminal rows below the current
//! output position:
//!
//! ```text
//! row 0      [INS] /current/dir            (or the pending inline error)
//! row 1      > left█right                  (█ = reversed cursor cell, words highlighted)
//! row 2..    cand1   cand2   cand3         (row-major, colored by category)
//! last row   … 12 more                     (only when candidates overflow)
//! ```
//!
//! [`Renderer::compose`] is pure: it turns a [`RenderContext`] into a
//! [`Frame`] whose rows never exceed the viewport width and whose row count
//! never exceeds its height. Emission lives in [`writer`].
//!
//! [`Renderer::compose_echo`] builds the record of a submitted command that
//! is printed to scrollback before the command runs: a rule across the
//! terminal, then the timestamped, highlighted command.

use core_complete::Candidate;
use core_state::EditMode;
use core_text::{CharUnit, TextLine, char_width};
use tracing::trace;

pub mod highlight;
pub mod style;
pub mod writer;

pub use highlight::Highlight;
pub use style::{Style, category_color};
pub use writer::{FrameSink, TermWriter};

/// Minimum rows the renderer lays out (header and edit line).
const FIXED_ROWS: u16 = 2;

const RULE_CHAR: &str = "⎯";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub style: Style,
    pub width: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Row {
    pub spans: Vec<Span>,
}

impl Row {
    /// Display width in columns.
    pub fn width(&self) -> usize {
        self.spans.iter().map(|s| s.width).sum()
    }

    /// Concatenated text without styling.
    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    pub fn spans_with(&self, style: Style) -> impl Iterator<Item = &Span> {
        self.spans.iter().filter(move |s| s.style == style)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    pub width: u16,
    pub height: u16,
    pub rows: Vec<Row>,
}

/// Everything one frame depends on.
#[derive(Clone, Copy, Debug)]
pub struct RenderContext<'a> {
    pub cwd: &'a str,
    pub mode: EditMode,
    pub error: Option<&'a str>,
    pub prompt: &'a str,
    pub left: &'a TextLine,
    pub right: &'a TextLine,
    pub suggestion: &'a TextLine,
    pub candidates: &'a [Candidate],
    /// Match count before the candidate limit.
    pub total: usize,
    pub column_margin: u16,
    pub highlight: &'a Highlight,
}

/// Builds one row while enforcing the column budget.
struct RowBuilder {
    row: Row,
    used: usize,
    limit: usize,
}

impl RowBuilder {
    fn new(limit: usize) -> Self {
        Self {
            row: Row::default(),
            used: 0,
            limit,
        }
    }

    fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.used)
    }

    /// Push as much of `text` as fits. Returns false if anything was cut.
    fn push_str(&mut self, text: &str, style: Style) -> bool {
        let mut out = String::new();
        let mut width = 0;
        let mut complete = true;
        for c in text.chars() {
            let c = if c.is_control() { '?' } else { c };
            let w = char_width(c) as usize;
            if width + w > self.remaining() {
                complete = false;
                break;
            }
            out.push(c);
            width += w;
        }
        self.push_span(out, style, width);
        complete
    }

    fn push_unit(&mut self, unit: &CharUnit, style: Style) -> bool {
        let text = match unit.as_char() {
            Some(c) if !c.is_control() => c.to_string(),
            _ => "?".to_string(),
        };
        let w = unit.width();
        if w > self.remaining() {
            return false;
        }
        self.push_span(text, style, w);
        true
    }

    fn push_span(&mut self, text: String, style: Style, width: usize) {
        if text.is_empty() {
            return;
        }
        self.used += width;
        // merge with the previous span when the style matches
        if let Some(last) = self.row.spans.last_mut()
            && last.style == style
        {
            last.text.push_str(&text);
            last.width += width;
            return;
        }
        self.row.spans.push(Span { text, style, width });
    }

    fn finish(self) -> Row {
        self.row
    }
}

#[derive(Debug, Clone)]
pub struct Renderer {
    width: u16,
    height: u16,
}

impl Renderer {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    pub fn set_viewport(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
    }

    pub fn viewport(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    pub fn compose(&self, ctx: &RenderContext<'_>) -> Frame {
        let width = self.width as usize;
        let mut rows = Vec::with_capacity(self.height as usize);
        if self.height >= 1 {
            rows.push(self.header_row(ctx));
        }
        if self.height >= FIXED_ROWS {
            rows.push(self.edit_row(ctx));
        }
        let grid_rows = self.height.saturating_sub(FIXED_ROWS) as usize;
        rows.extend(candidate_rows(ctx, width, grid_rows));
        trace!(target: "render", rows = rows.len(), width = self.width, height = self.height, "compose");
        Frame {
            width: self.width,
            height: self.height,
            rows,
        }
    }

    /// Rows echoing a submitted `line`. The command row is not clipped; the
    /// terminal wraps it like any other output.
    pub fn compose_echo(&self, line: &str, stamp: &str, highlight: &Highlight) -> Vec<Row> {
        let mut rule = RowBuilder::new(self.width as usize);
        rule.push_str(&RULE_CHAR.repeat((self.width as usize).saturating_sub(1)), Style::Rule);

        let mut record = RowBuilder::new(usize::MAX);
        record.push_str(&format!("[{stamp}]"), Style::Rule);
        record.push_str(" ", Style::Plain);
        let text = TextLine::from(line);
        for (unit, style) in text.iter().zip(highlight.unit_styles(&text)) {
            record.push_unit(unit, style);
        }
        vec![rule.finish(), record.finish()]
    }

    fn header_row(&self, ctx: &RenderContext<'_>) -> Row {
        let mut row = RowBuilder::new(self.width as usize);
        match ctx.error {
            Some(err) => {
                row.push_str(err, Style::Error);
            }
            None => {
                row.push_str(&format!("[{}] ", ctx.mode.tag()), Style::Header);
                row.push_str(ctx.cwd, Style::Plain);
            }
        }
        row.finish()
    }

    fn edit_row(&self, ctx: &RenderContext<'_>) -> Row {
        let width = self.width as usize;
        let (cursor, rest, rest_style) = match ctx.right.first() {
            Some(first) => (
                first.clone(),
                ctx.right.slice(1..ctx.right.len()),
                Style::Plain,
            ),
            None => match ctx.suggestion.first() {
                Some(first) => (
                    first.clone(),
                    ctx.suggestion.slice(1..ctx.suggestion.len()),
                    Style::Suggestion,
                ),
                None => (CharUnit::from_char(' '), TextLine::new(), Style::Plain),
            },
        };

        // Scroll `left` so prompt + visible left + cursor cell fit.
        let prompt_width = core_text::str_width(ctx.prompt);
        let budget = width.saturating_sub(prompt_width + cursor.width());
        let mut skip = 0;
        let mut left_width = ctx.left.width();
        for unit in ctx.left.iter() {
            if left_width <= budget {
                break;
            }
            left_width -= unit.width();
            skip += 1;
        }

        // highlight the typed text as a whole so words spanning the cursor keep one style
        let styles = ctx.highlight.unit_styles(&(ctx.left + ctx.right));
        let typed = |i: usize| styles.get(i).copied().unwrap_or(Style::Plain);

        let mut row = RowBuilder::new(width);
        row.push_str(ctx.prompt, Style::Plain);
        for (i, unit) in ctx.left.iter().enumerate().skip(skip) {
            if !row.push_unit(unit, typed(i)) {
                break;
            }
        }
        row.push_unit(&cursor, Style::Cursor);
        let after_cursor = ctx.left.len() + 1;
        for (i, unit) in rest.iter().enumerate() {
            let style = match rest_style {
                Style::Suggestion => Style::Suggestion,
                _ => typed(after_cursor + i),
            };
            if !row.push_unit(unit, style) {
                break;
            }
        }
        row.finish()
    }
}

fn candidate_rows(ctx: &RenderContext<'_>, width: usize, avail: usize) -> Vec<Row> {
    let shown_all = ctx.candidates.len();
    if avail == 0 || shown_all == 0 || width == 0 {
        return Vec::new();
    }
    let margin = ctx.column_margin as usize;
    let widest = ctx
        .candidates
        .iter()
        .map(|c| core_text::str_width(&c.display))
        .max()
        .unwrap_or(0)
        .min(width);
    let column = widest + margin;
    let cols = ((width + margin) / column.max(1)).max(1);
    let total = ctx.total.max(shown_all);

    let fits = shown_all <= avail * cols && total == shown_all;
    let shown = if fits {
        shown_all
    } else {
        shown_all.min((avail - 1) * cols)
    };

    let mut rows: Vec<Row> = ctx.candidates[..shown]
        .chunks(cols)
        .map(|chunk| {
            let mut row = RowBuilder::new(width);
            for (i, cand) in chunk.iter().enumerate() {
                let before = row.used;
                row.push_str(&cand.display, Style::Candidate(cand.category));
                if i + 1 < chunk.len() {
                    let written = row.used - before;
                    let pad = column.saturating_sub(written);
                    row.push_str(&" ".repeat(pad), Style::Plain);
                }
            }
            row.finish()
        })
        .collect();

    if !fits {
        let mut row = RowBuilder::new(width);
        row.push_str(&format!("… {} more", total - shown), Style::Overflow);
        rows.push(row.finish());
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_complete::FileCategory;
    use pretty_assertions::assert_eq;

    fn cand(name: &str, category: FileCategory) -> Candidate {
        Candidate {
            replacement: TextLine::from(name),
            display: name.to_string(),
            category: Some(category),
        }
    }

    struct Fixture {
        left: TextLine,
        right: TextLine,
        suggestion: TextLine,
        candidates: Vec<Candidate>,
        total: usize,
        error: Option<String>,
        highlight: Highlight,
    }

    impl Fixture {
        fn new(left: &str, right: &str) -> Self {
            Self {
                left: left.into(),
                right: right.into(),
                suggestion: TextLine::new(),
                candidates: Vec::new(),
                total: 0,
                error: None,
                highlight: Highlight::default(),
            }
        }

        fn ctx(&self) -> RenderContext<'_> {
            RenderContext {
                cwd: "/home/user",
                mode: EditMode::Insert,
                error: self.error.as_deref(),
                prompt: "> ",
                left: &self.left,
                right: &self.right,
                suggestion: &self.suggestion,
                candidates: &self.candidates,
                total: self.total,
                column_margin: 3,
                highlight: &self.highlight,
            }
        }
    }

    #[test]
    fn header_and_edit_line() {
        let fx = Fixture::new("ls -", "la");
        let frame = Renderer::new(40, 4).compose(&fx.ctx());
        assert_eq!(frame.rows.len(), 2);
        assert_eq!(frame.rows[0].text(), "[INS] /home/user");
        assert_eq!(frame.rows[1].text(), "> ls -la");
        let cursor: Vec<&Span> = frame.rows[1].spans_with(Style::Cursor).collect();
        assert_eq!(cursor.len(), 1);
        assert_eq!(cursor[0].text, "l");
    }

    #[test]
    fn edit_line_tokens_are_highlighted() {
        let mut fx = Fixture::new("ls -la | grep \"x\"", "");
        fx.highlight = Highlight::new(["ls", "grep"], ["if"], ["|"]);
        let frame = Renderer::new(40, 3).compose(&fx.ctx());
        let spans: Vec<(&str, Style)> = frame.rows[1]
            .spans
            .iter()
            .map(|s| (s.text.as_str(), s.style))
            .collect();
        assert_eq!(
            spans,
            vec![
                ("> ", Style::Plain),
                ("ls", Style::Command),
                (" -la ", Style::Plain),
                ("|", Style::Symbol),
                (" ", Style::Plain),
                ("grep", Style::Command),
                (" ", Style::Plain),
                ("\"x\"", Style::Quoted),
                (" ", Style::Cursor),
            ]
        );
    }

    #[test]
    fn word_split_by_cursor_keeps_its_style() {
        let mut fx = Fixture::new("gr", "ep x");
        fx.highlight = Highlight::new(["grep"], Vec::<String>::new(), Vec::<String>::new());
        let frame = Renderer::new(40, 3).compose(&fx.ctx());
        let row = &frame.rows[1];
        assert_eq!(row.text(), "> grep x");
        let command: Vec<&str> = row.spans_with(Style::Command).map(|s| s.text.as_str()).collect();
        assert_eq!(command, vec!["gr", "p"]);
        assert_eq!(row.spans_with(Style::Cursor).next().map(|s| s.text.as_str()), Some("e"));
    }

    #[test]
    fn suggestion_is_not_highlighted() {
        let mut fx = Fixture::new("", "");
        fx.suggestion = "ls".into();
        fx.highlight = Highlight::new(["ls"], Vec::<String>::new(), Vec::<String>::new());
        let frame = Renderer::new(40, 3).compose(&fx.ctx());
        assert_eq!(frame.rows[1].spans_with(Style::Command).count(), 0);
        assert_eq!(frame.rows[1].spans_with(Style::Suggestion).count(), 1);
    }

    #[test]
    fn echo_has_rule_then_stamped_command() {
        let highlight = Highlight::new(["ls"], Vec::<String>::new(), ["|"]);
        let rows = Renderer::new(6, 4).compose_echo("ls | wc", "2024-05-01 09:30:00", &highlight);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].text(), "⎯⎯⎯⎯⎯");
        assert_eq!(rows[0].spans[0].style, Style::Rule);
        // wider than the viewport, left for the terminal to wrap
        assert_eq!(rows[1].text(), "[2024-05-01 09:30:00] ls | wc");
        let styles: Vec<Style> = rows[1].spans.iter().map(|s| s.style).collect();
        assert_eq!(
            styles,
            vec![Style::Rule, Style::Plain, Style::Command, Style::Plain, Style::Symbol, Style::Plain]
        );
    }

    #[test]
    fn error_replaces_header() {
        let mut fx = Fixture::new("", "");
        fx.error = Some("keybind ^G: malformed".into());
        let frame = Renderer::new(40, 3).compose(&fx.ctx());
        assert_eq!(frame.rows[0].spans[0].style, Style::Error);
        assert_eq!(frame.rows[0].text(), "keybind ^G: malformed");
        // empty line still shows a reversed blank cursor
        assert_eq!(frame.rows[1].text(), ">  ");
    }

    #[test]
    fn suggestion_only_when_right_empty() {
        let mut fx = Fixture::new("git ", "");
        fx.suggestion = "commit".into();
        let frame = Renderer::new(40, 3).compose(&fx.ctx());
        assert_eq!(frame.rows[1].text(), "> git commit");
        let dim: String = frame.rows[1]
            .spans_with(Style::Suggestion)
            .map(|s| s.text.as_str())
            .collect();
        assert_eq!(dim, "ommit");

        fx.right = "x".into();
        let frame = Renderer::new(40, 3).compose(&fx.ctx());
        assert_eq!(frame.rows[1].text(), "> git x");
        assert_eq!(frame.rows[1].spans_with(Style::Suggestion).count(), 0);
    }

    #[test]
    fn long_left_scrolls_to_keep_cursor_visible() {
        let fx = Fixture::new(&"a".repeat(30), "");
        let frame = Renderer::new(10, 3).compose(&fx.ctx());
        let row = &frame.rows[1];
        assert_eq!(row.width(), 10);
        assert!(row.text().starts_with("> aaaaaaa"));
        assert_eq!(row.spans.last().map(|s| s.style), Some(Style::Cursor));
    }

    #[test]
    fn wide_chars_respect_width() {
        let fx = Fixture::new("漢字漢字漢字", "");
        let frame = Renderer::new(9, 3).compose(&fx.ctx());
        assert!(frame.rows[1].width() <= 9);
        assert_eq!(frame.rows[1].spans.last().map(|s| s.style), Some(Style::Cursor));
    }

    #[test]
    fn candidates_pack_row_major() {
        let mut fx = Fixture::new("ls ", "");
        fx.candidates = vec![
            cand("alpha", FileCategory::Regular),
            cand("beta/", FileCategory::Directory),
            cand("gamma", FileCategory::Regular),
        ];
        fx.total = 3;
        let frame = Renderer::new(20, 5).compose(&fx.ctx());
        assert_eq!(frame.rows.len(), 4);
        assert_eq!(frame.rows[2].text(), "alpha   beta/");
        assert_eq!(frame.rows[3].text(), "gamma");
        let dirs: Vec<&Span> = frame.rows[2]
            .spans_with(Style::Candidate(Some(FileCategory::Directory)))
            .collect();
        assert_eq!(dirs[0].text, "beta/");
    }

    #[test]
    fn overflow_indicator_on_last_row() {
        let mut fx = Fixture::new("ls ", "");
        fx.candidates = (0..20)
            .map(|i| cand(&format!("file{i:02}"), FileCategory::Regular))
            .collect();
        fx.total = 25;
        let frame = Renderer::new(20, 5).compose(&fx.ctx());
        assert_eq!(frame.rows.len(), 5);
        // two columns of width 6+3, two grid rows before the indicator
        assert_eq!(frame.rows[4].text(), "… 21 more");
        assert_eq!(frame.rows[4].spans[0].style, Style::Overflow);
    }

    #[test]
    fn total_beyond_limit_reports_overflow() {
        let mut fx = Fixture::new("ls ", "");
        fx.candidates = vec![cand("a", FileCategory::Regular)];
        fx.total = 300;
        let frame = Renderer::new(20, 5).compose(&fx.ctx());
        assert_eq!(frame.rows.last().map(Row::text), Some("… 299 more".to_string()));
    }
}
