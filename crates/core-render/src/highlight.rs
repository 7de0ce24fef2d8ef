//! Token highlighting for the edit line.
//!
//! The line is split into quoted strings, blank runs and plain words. Words
//! found in one of the configured sets take that set's style; a token that
//! starts with a quote is styled as a string even when left unterminated.

use crate::Style;
use core_text::TextLine;
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct Highlight {
    commands: HashSet<String>,
    keywords: HashSet<String>,
    symbols: HashSet<String>,
}

impl Highlight {
    pub fn new<C, K, S>(commands: C, keywords: K, symbols: S) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        K: IntoIterator,
        K::Item: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        Self {
            commands: commands.into_iter().map(Into::into).collect(),
            keywords: keywords.into_iter().map(Into::into).collect(),
            symbols: symbols.into_iter().map(Into::into).collect(),
        }
    }

    /// Style for a single word. Commands win over keywords and symbols.
    pub fn classify(&self, token: &str) -> Style {
        if self.commands.contains(token) {
            Style::Command
        } else if self.keywords.contains(token) {
            Style::Keyword
        } else if self.symbols.contains(token) {
            Style::Symbol
        } else if token.starts_with(['"', '\'']) {
            Style::Quoted
        } else {
            Style::Plain
        }
    }

    /// One style per unit of `line`.
    pub fn unit_styles(&self, line: &TextLine) -> Vec<Style> {
        let chars: Vec<Option<char>> = line.iter().map(|u| u.as_char()).collect();
        let mut styles = Vec::with_capacity(chars.len());
        let mut start = 0;
        while start < chars.len() {
            let end = token_end(&chars, start);
            let style = match chars[start] {
                Some(c) if is_blank(c) => Style::Plain,
                _ => {
                    let token: String = chars[start..end].iter().map(|c| c.unwrap_or('?')).collect();
                    self.classify(&token)
                }
            };
            styles.extend(std::iter::repeat_n(style, end - start));
            start = end;
        }
        styles
    }
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Index one past the token starting at `start`.
fn token_end(chars: &[Option<char>], start: usize) -> usize {
    let rest = &chars[start + 1..];
    let len = match chars[start] {
        Some(q @ ('"' | '\'')) => rest
            .iter()
            .position(|c| *c == Some(q))
            .map_or(rest.len(), |i| i + 1),
        Some(c) if is_blank(c) => rest
            .iter()
            .position(|c| !matches!(c, Some(b) if is_blank(*b)))
            .unwrap_or(rest.len()),
        _ => rest
            .iter()
            .position(|c| matches!(c, Some(b) if is_blank(*b)))
            .unwrap_or(rest.len()),
    };
    start + 1 + len
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn shell() -> Highlight {
        Highlight::new(["ls", "grep"], ["if", "then"], ["|", "&&"])
    }

    fn runs(hl: &Highlight, text: &str) -> Vec<(String, Style)> {
        let line = TextLine::from(text);
        let mut out: Vec<(String, Style)> = Vec::new();
        for (unit, style) in line.iter().zip(hl.unit_styles(&line)) {
            let c = unit.as_char().unwrap_or('?');
            match out.last_mut() {
                Some((text, last)) if *last == style => text.push(c),
                _ => out.push((c.to_string(), style)),
            }
        }
        out
    }

    #[test]
    fn words_take_their_set_style() {
        assert_eq!(
            runs(&shell(), "if ls && x"),
            vec![
                ("if".to_string(), Style::Keyword),
                (" ".to_string(), Style::Plain),
                ("ls".to_string(), Style::Command),
                (" ".to_string(), Style::Plain),
                ("&&".to_string(), Style::Symbol),
                (" x".to_string(), Style::Plain),
            ]
        );
    }

    #[test]
    fn quoted_token_keeps_inner_blanks() {
        assert_eq!(
            runs(&shell(), "grep 'a b' c"),
            vec![
                ("grep".to_string(), Style::Command),
                (" ".to_string(), Style::Plain),
                ("'a b'".to_string(), Style::Quoted),
                (" c".to_string(), Style::Plain),
            ]
        );
        // unterminated quote runs to the end of the line
        assert_eq!(
            runs(&shell(), "ls \"x y"),
            vec![
                ("ls".to_string(), Style::Command),
                (" ".to_string(), Style::Plain),
                ("\"x y".to_string(), Style::Quoted),
            ]
        );
    }

    #[test]
    fn partial_words_are_plain() {
        assert_eq!(runs(&shell(), "lsx |x"), vec![("lsx |x".to_string(), Style::Plain)]);
        assert!(Highlight::default().unit_styles(&TextLine::from("ls | grep")).iter().all(|s| *s == Style::Plain));
    }
}
