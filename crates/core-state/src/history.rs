//! Persistent command history.
//!
//! Accepted lines are appended to an in-memory list and mirrored to a plain
//! text log (one trimmed entry per line). Duplicates are kept until
//! [`HistoryStore::normalize`] runs at shutdown. The first disk failure is
//! logged once and the store continues memory-only for the rest of the
//! session.

use core_keymap::is_directive_wire;
use core_text::TextLine;
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default cap on retained entries after normalization.
pub const DEFAULT_MAX_ENTRIES: usize = 5000;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to read history file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write history file {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Whether a line is worth keeping at all: non-blank and not an encoded
/// directive.
pub fn is_recordable(line: &TextLine) -> bool {
    !line.is_blank() && !is_directive_wire(&line.to_string())
}

/// Collapse duplicates keeping each line's most recent occurrence, drop
/// blanks and keep at most the newest `max_entries`.
///
/// Lines compare after trimming outer whitespace, case-sensitively.
pub fn normalize_entries<I>(lines: I, max_entries: usize) -> Vec<TextLine>
where
    I: IntoIterator<Item = TextLine>,
{
    let trimmed: Vec<TextLine> = lines
        .into_iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect();
    let mut seen = HashSet::new();
    let mut out: Vec<TextLine> = trimmed
        .into_iter()
        .rev()
        .filter(|line| seen.insert(line.clone()))
        .collect();
    out.truncate(max_entries);
    out.reverse();
    out
}

#[derive(Debug)]
pub struct HistoryStore {
    path: Option<PathBuf>,
    entries: Vec<TextLine>,
    max_entries: usize,
}

impl HistoryStore {
    /// History backed by the log at `path`.
    ///
    /// A missing file is an empty history. A file that exists but cannot be
    /// read leaves the store memory-only.
    pub fn open(path: impl Into<PathBuf>, max_entries: usize) -> Self {
        let path = path.into();
        match read_log(&path).map(Option::unwrap_or_default) {
            Ok(entries) => {
                debug!(target: "state.history", path = %path.display(), entries = entries.len(), "history_loaded");
                Self {
                    path: Some(path),
                    entries,
                    max_entries,
                }
            }
            Err(err) => {
                warn!(target: "state.history", error = %err, "history_unavailable_memory_only");
                Self {
                    path: None,
                    entries: Vec::new(),
                    max_entries,
                }
            }
        }
    }

    /// History with no backing file.
    pub fn in_memory(entries: Vec<TextLine>) -> Self {
        Self {
            path: None,
            entries,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }

    pub fn entries(&self) -> &[TextLine] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Log file in use, `None` once the store is memory-only.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether `line` would be recorded by [`append`](Self::append).
    pub fn is_eligible(&self, line: &TextLine) -> bool {
        if !is_recordable(line) {
            return false;
        }
        let trimmed = line.trim();
        self.entries.last() != Some(&trimmed)
    }

    /// Record an accepted line. Returns whether it was recorded.
    pub fn append(&mut self, line: &TextLine) -> bool {
        if !self.is_eligible(line) {
            debug!(target: "state.history", len = line.len(), "append_skipped");
            return false;
        }
        let trimmed = line.trim();
        if let Some(path) = &self.path
            && let Err(err) = append_log(path, &trimmed)
        {
            warn!(target: "state.history", error = %err, "history_write_failed_memory_only");
            self.path = None;
        }
        self.entries.push(trimmed);
        true
    }

    /// Deduplicate and rewrite the log.
    ///
    /// The on-disk log is the source when readable, so lines appended by
    /// other sessions survive. When the log is missing (removed or rotated
    /// away mid-session) or unreadable, the in-memory entries are used.
    ///
    /// # Errors
    /// Returns [`HistoryError::Write`] when the rewritten log cannot be
    /// saved. The in-memory entries are normalized either way.
    pub fn normalize(&mut self) -> Result<(), HistoryError> {
        let source = match &self.path {
            Some(path) => match read_log(path) {
                Ok(Some(entries)) => entries,
                Ok(None) => {
                    debug!(target: "state.history", path = %path.display(), "normalize_log_missing_using_memory");
                    self.entries.clone()
                }
                Err(err) => {
                    warn!(target: "state.history", error = %err, "normalize_source_fallback");
                    self.entries.clone()
                }
            },
            None => self.entries.clone(),
        };
        let before = source.len();
        self.entries = normalize_entries(source, self.max_entries);
        info!(target: "state.history", before, after = self.entries.len(), "history_normalized");
        if let Some(path) = &self.path {
            write_log(path, &self.entries)?;
        }
        Ok(())
    }
}

/// Entries of the log at `path`, `None` when no such file exists.
fn read_log(path: &Path) -> Result<Option<Vec<TextLine>>, HistoryError> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(HistoryError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    Ok(Some(
        raw.split(|&b| b == b'\n')
            .map(|line| TextLine::from(String::from_utf8_lossy(line).trim_end_matches('\r')))
            .filter(|line| !line.is_empty())
            .collect(),
    ))
}

fn append_log(path: &Path, line: &TextLine) -> Result<(), HistoryError> {
    let write_err = |source| HistoryError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        fs::create_dir_all(dir).map_err(write_err)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(write_err)?;
    let mut bytes = line.to_bytes();
    bytes.push(b'\n');
    file.write_all(&bytes).map_err(write_err)
}

fn write_log(path: &Path, entries: &[TextLine]) -> Result<(), HistoryError> {
    let mut bytes = Vec::new();
    for line in entries {
        bytes.extend_from_slice(&line.to_bytes());
        bytes.push(b'\n');
    }
    fs::write(path, bytes).map_err(|source| HistoryError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_keymap::{Directive, DirectiveKind};

    fn lines(items: &[&str]) -> Vec<TextLine> {
        items.iter().map(|s| TextLine::from(*s)).collect()
    }

    fn strings(items: &[TextLine]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn normalization_keeps_latest_occurrence() {
        let out = normalize_entries(lines(&["ls", "ls", "pwd", "ls"]), 5000);
        assert_eq!(strings(&out), vec!["pwd", "ls"]);
    }

    #[test]
    fn normalization_trims_drops_blanks_and_caps() {
        let out = normalize_entries(lines(&[" a ", "", "b", "   ", "a", "c", "LS", "ls"]), 3);
        assert_eq!(strings(&out), vec!["c", "LS", "ls"]);
    }

    #[test]
    fn eligibility_rules() {
        let mut store = HistoryStore::in_memory(Vec::new());
        assert!(!store.is_eligible(&"".into()));
        assert!(!store.is_eligible(&"  \t".into()));
        assert!(store.append(&"  ls -la ".into()));
        assert!(!store.is_eligible(&"ls -la".into()));
        assert!(!store.is_eligible(&" ls -la  ".into()));
        assert!(store.is_eligible(&"pwd".into()));

        let wire = Directive::new(DirectiveKind::External, "cd ".into(), "".into(), "fzf")
            .unwrap()
            .encode();
        assert!(!store.is_eligible(&TextLine::from(wire.as_str())));
    }

    #[test]
    fn append_preserves_insertion_order_with_duplicates() {
        let mut store = HistoryStore::in_memory(Vec::new());
        for l in ["ls", "pwd", "ls"] {
            store.append(&l.into());
        }
        assert_eq!(strings(store.entries()), vec!["ls", "pwd", "ls"]);
    }
}
