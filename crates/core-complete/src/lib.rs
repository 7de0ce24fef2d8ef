//! Completion feedback for the edit line.
//!
//! Two independent sources:
//!
//! - path/command completion of the token left of the cursor
//!   ([`CompletionEngine::complete_path`]), and
//! - history-prefix suggestion of the rest of the line
//!   ([`history_suggestion`]).
//!
//! Both are pure with respect to the edit buffer: they return candidates and
//! the `accept_*` helpers compute the replacement `left` for the dispatcher to
//! apply.

use core_text::TextLine;
use std::env;
use std::path::{Path, PathBuf};
use tracing::{trace, warn};

pub mod command;
pub mod directory;

pub use command::CommandIndex;
pub use directory::{DirEntryInfo, Directory, DirectoryLister, FileCategory, FsLister};

/// Default cap on candidates kept per completion.
pub const DEFAULT_CANDIDATE_LIMIT: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Full token text once accepted; directories end in `/`.
    pub replacement: TextLine,
    /// Entry name as shown in the candidate grid.
    pub display: String,
    pub category: Option<FileCategory>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathCompletion {
    /// Unit index in `left` where the completed token begins.
    pub token_start: usize,
    pub token: TextLine,
    pub candidates: Vec<Candidate>,
    /// Number of matches before the candidate limit was applied.
    pub total: usize,
    /// Longest common prefix of every match's replacement.
    pub common: TextLine,
}

impl PathCompletion {
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// Unit index where the trailing non-whitespace run of `left` begins.
pub fn token_start(left: &TextLine) -> usize {
    left.iter()
        .rposition(|u| u.is_whitespace())
        .map_or(0, |i| i + 1)
}

pub struct CompletionEngine<L: DirectoryLister = FsLister> {
    lister: L,
    directory: Directory,
    commands: CommandIndex,
    working_dir: Option<PathBuf>,
    limit: usize,
}

impl CompletionEngine<FsLister> {
    /// Engine over the real filesystem and `$PATH`.
    pub fn from_env(limit: usize) -> Self {
        Self::new(FsLister, CommandIndex::from_env(), limit)
    }
}

impl<L: DirectoryLister> CompletionEngine<L> {
    pub fn new(lister: L, commands: CommandIndex, limit: usize) -> Self {
        Self {
            lister,
            directory: Directory::new(),
            commands,
            working_dir: None,
            limit: limit.max(1),
        }
    }

    /// Resolve relative tokens against `dir` instead of the process's
    /// current directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Force the next completion to re-list its directory.
    pub fn invalidate(&mut self) {
        self.directory.invalidate();
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    fn working_dir(&self) -> Option<PathBuf> {
        match &self.working_dir {
            Some(dir) => Some(dir.clone()),
            None => env::current_dir()
                .inspect_err(|err| {
                    warn!(target: "complete.path", error = %err, "current_dir_unavailable")
                })
                .ok(),
        }
    }

    /// Candidates for the token directly left of the cursor.
    pub fn complete_path(&mut self, left: &TextLine) -> PathCompletion {
        if left.is_empty() {
            return PathCompletion::default();
        }
        let start = token_start(left);
        let token = left.slice(start..left.len());
        let token_text = token.to_string();
        let command_position = left.slice(0..start).is_blank();

        let (dir_part, query) = match token_text.rfind('/') {
            Some(i) => token_text.split_at(i + 1),
            None => ("", token_text.as_str()),
        };

        let entries: Vec<DirEntryInfo> = if command_position && dir_part.is_empty() {
            self.commands.names(&self.lister).to_vec()
        } else {
            let Some(cwd) = self.working_dir() else {
                return PathCompletion {
                    token_start: start,
                    token,
                    ..PathCompletion::default()
                };
            };
            let dir = resolve_dir(&cwd, dir_part);
            self.directory.refresh(&dir, &self.lister).to_vec()
        };

        let show_hidden = query.starts_with('.');
        let matches: Vec<Candidate> = entries
            .into_iter()
            .filter(|e| e.name.starts_with(query))
            .filter(|e| show_hidden || !e.name.starts_with('.'))
            .map(|e| {
                let suffix = if e.category == FileCategory::Directory { "/" } else { "" };
                Candidate {
                    replacement: TextLine::from(format!("{dir_part}{}{suffix}", e.name)),
                    display: format!("{}{suffix}", e.name),
                    category: Some(e.category),
                }
            })
            .collect();

        let total = matches.len();
        let common = common_prefix(matches.iter().map(|c| &c.replacement));
        let mut candidates = matches;
        candidates.truncate(self.limit);
        trace!(target: "complete.path", token_len = token.len(), total, command_position, "complete_path");
        PathCompletion {
            token_start: start,
            token,
            candidates,
            total,
            common,
        }
    }
}

fn resolve_dir(cwd: &Path, dir_part: &str) -> PathBuf {
    if dir_part.is_empty() {
        cwd.to_path_buf()
    } else {
        // joining an absolute path replaces cwd
        cwd.join(dir_part)
    }
}

fn common_prefix<'a>(mut lines: impl Iterator<Item = &'a TextLine>) -> TextLine {
    let Some(first) = lines.next() else {
        return TextLine::new();
    };
    let mut len = first.len();
    for line in lines {
        len = first
            .iter()
            .zip(line.iter())
            .take(len)
            .take_while(|(a, b)| a == b)
            .count();
    }
    first.slice(0..len)
}

/// `left` with its trailing token replaced by `candidate`.
pub fn accept_candidate(left: &TextLine, candidate: &Candidate) -> TextLine {
    left.slice(0..token_start(left)) + &candidate.replacement
}

/// Tab behavior: take the only match (plus a separating space unless it is a
/// directory), or extend the token to the matches' common prefix.
pub fn accept_best(left: &TextLine, completion: &PathCompletion) -> TextLine {
    let head = left.slice(0..completion.token_start.min(left.len()));
    if completion.total == 1
        && let Some(only) = completion.candidates.first()
    {
        let mut out = head + &only.replacement;
        if !only.replacement.ends_with_unit('/') {
            out.push(' '.into());
        }
        return out;
    }
    if completion.total > 1 && completion.common.len() > completion.token.len() {
        return head + &completion.common;
    }
    left.clone()
}

/// Remainder of the most recent history entry that strictly extends `left`.
pub fn history_suggestion(history: &[TextLine], left: &TextLine) -> TextLine {
    if left.is_empty() {
        return TextLine::new();
    }
    history
        .iter()
        .rev()
        .find(|entry| entry.len() > left.len() && entry.starts_with(left))
        .map(|entry| entry.slice(left.len()..entry.len()))
        .unwrap_or_default()
}

/// `left + suggestion + " "`, or `left` unchanged when there is nothing to
/// accept.
pub fn accept_history(left: &TextLine, suggestion: &TextLine) -> TextLine {
    if suggestion.is_empty() {
        return left.clone();
    }
    let mut out = left + suggestion;
    out.push(' '.into());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io;

    /// Lister answering from a fixed map of directory contents.
    struct StaticLister(HashMap<PathBuf, Vec<DirEntryInfo>>);

    impl DirectoryLister for StaticLister {
        fn list(&self, dir: &Path) -> io::Result<Vec<DirEntryInfo>> {
            self.0
                .get(dir)
                .cloned()
                .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
        }
    }

    fn regular(name: &str) -> DirEntryInfo {
        DirEntryInfo::new(name, FileCategory::Regular)
    }

    fn engine() -> CompletionEngine<StaticLister> {
        let mut dirs = HashMap::new();
        dirs.insert(
            PathBuf::from("/work"),
            vec![
                regular("foobar"),
                regular("foo.txt"),
                regular(".hidden"),
                DirEntryInfo::new("src", FileCategory::Directory),
            ],
        );
        dirs.insert(
            PathBuf::from("/work/src"),
            vec![regular("main.rs"), regular("lib.rs")],
        );
        dirs.insert(
            PathBuf::from("/bin"),
            vec![regular("git"), regular("grep"), DirEntryInfo::new("gz", FileCategory::Directory)],
        );
        dirs.insert(PathBuf::from("/usr/bin"), vec![regular("git"), regular("gawk")]);
        let commands = CommandIndex::new(vec![PathBuf::from("/bin"), PathBuf::from("/usr/bin")]);
        CompletionEngine::new(StaticLister(dirs), commands, 16).with_working_dir("/work")
    }

    fn texts(c: &PathCompletion) -> Vec<String> {
        c.candidates.iter().map(|c| c.replacement.to_string()).collect()
    }

    #[test]
    fn argument_token_completes_from_working_dir() {
        let mut eng = engine();
        let left = TextLine::from("cat fo");
        let c = eng.complete_path(&left);
        assert_eq!(texts(&c), vec!["foo.txt", "foobar"]);
        assert_eq!(c.token_start, 4);
        assert_eq!(c.total, 2);
        let picked = accept_candidate(&left, &c.candidates[1]);
        assert_eq!(picked.to_string(), "cat foobar");
        assert_eq!(accept_best(&left, &c).to_string(), "cat foo");
    }

    #[test]
    fn command_token_uses_search_path() {
        let mut eng = engine();
        let c = eng.complete_path(&TextLine::from("  g"));
        assert_eq!(texts(&c), vec!["gawk", "git", "grep"]);
    }

    #[test]
    fn single_match_gets_space_directory_gets_slash() {
        let mut eng = engine();
        let left = TextLine::from("cat foob");
        let c = eng.complete_path(&left);
        assert_eq!(accept_best(&left, &c).to_string(), "cat foobar ");

        let left = TextLine::from("cd s");
        let c = eng.complete_path(&left);
        assert_eq!(accept_best(&left, &c).to_string(), "cd src/");
    }

    #[test]
    fn nested_token_keeps_directory_part() {
        let mut eng = engine();
        let left = TextLine::from("vim src/m");
        let c = eng.complete_path(&left);
        assert_eq!(texts(&c), vec!["src/main.rs"]);
        assert_eq!(c.candidates[0].display, "main.rs");
    }

    #[test]
    fn hidden_entries_need_dot_query() {
        let mut eng = engine();
        assert!(texts(&eng.complete_path(&TextLine::from("ls "))).iter().all(|t| !t.starts_with('.')));
        assert_eq!(texts(&eng.complete_path(&TextLine::from("ls ."))), vec![".hidden"]);
    }

    #[test]
    fn empty_line_and_no_match() {
        let mut eng = engine();
        assert!(eng.complete_path(&TextLine::new()).is_empty());
        let left = TextLine::from("cat zz");
        let c = eng.complete_path(&left);
        assert!(c.is_empty());
        assert_eq!(accept_best(&left, &c), left);
    }

    #[test]
    fn candidate_limit_keeps_total() {
        let mut eng = engine();
        eng.limit = 1;
        let c = eng.complete_path(&TextLine::from("cat f"));
        assert_eq!(c.candidates.len(), 1);
        assert_eq!(c.total, 2);
    }

    #[test]
    fn history_prefix_suggestion() {
        let history: Vec<TextLine> = ["git status", "git commit -m x", "ls"]
            .into_iter()
            .map(TextLine::from)
            .collect();
        let left = TextLine::from("git ");
        let sugg = history_suggestion(&history, &left);
        assert_eq!(sugg.to_string(), "commit -m x");
        assert_eq!(accept_history(&left, &sugg).to_string(), "git commit -m x ");
        assert!(history_suggestion(&history, &TextLine::new()).is_empty());
        assert!(history_suggestion(&history, &TextLine::from("ls")).is_empty());
        assert_eq!(accept_history(&left, &TextLine::new()), left);
    }
}
