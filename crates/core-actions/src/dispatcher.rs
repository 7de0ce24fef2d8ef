//! One read cycle.
//!
//! Per keystroke:
//! 1. compute completion feedback and present a frame,
//! 2. read one unit,
//! 3. resolve it against the keymap (a match always ends or reports),
//! 4. otherwise apply the built-ins: `^D`, Tab, `^N`, Enter, then plain edits.

use crate::{ReadOutcome, Seed};
use anyhow::{Context, Result};
use core_complete::{
    CompletionEngine, DirectoryLister, FsLister, PathCompletion, accept_best, accept_history,
    history_suggestion,
};
use core_config::Config;
use core_keymap::{Binding, Directive, Keymap};
use core_render::{FrameSink, Highlight, RenderContext, Renderer, Row};
use core_state::{EditBuffer, HistoryStore};
use core_terminal::KeySource;
use core_text::{CharUnit, Key, TextLine};
use std::env;
use tracing::{debug, trace};

pub struct Dispatcher<'a, L: DirectoryLister = FsLister> {
    config: &'a Config,
    keymap: &'a Keymap,
    buffer: EditBuffer,
    completion: CompletionEngine<L>,
    renderer: Renderer,
    highlight: Highlight,
    cwd_label: Option<String>,
    pending_error: Option<String>,
}

impl<'a> Dispatcher<'a, FsLister> {
    /// Dispatcher over the real filesystem and `$PATH`, ring seeded from
    /// `history`.
    pub fn new(config: &'a Config, keymap: &'a Keymap, history: &HistoryStore) -> Self {
        let engine = CompletionEngine::from_env(config.file.general.candidate_limit);
        Self::with_engine(config, keymap, history, engine)
    }
}

impl<'a, L: DirectoryLister> Dispatcher<'a, L> {
    pub fn with_engine(
        config: &'a Config,
        keymap: &'a Keymap,
        history: &HistoryStore,
        completion: CompletionEngine<L>,
    ) -> Self {
        let mut buffer = EditBuffer::from_history(history.entries().iter().cloned());
        let general = &config.file.general;
        buffer.set_wrap(general.ring_wrap);
        let highlight = Highlight::new(
            general.colorize_commands.iter().cloned(),
            general.colorize_keywords.iter().cloned(),
            general.colorize_symbols.iter().cloned(),
        );
        Self {
            config,
            keymap,
            buffer,
            completion,
            renderer: Renderer::new(80, config.effective_area_height),
            highlight,
            cwd_label: None,
            pending_error: None,
        }
    }

    /// Fixed header text instead of the process's current directory.
    pub fn with_cwd_label(mut self, label: impl Into<String>) -> Self {
        self.cwd_label = Some(label.into());
        self
    }

    pub fn buffer(&self) -> &EditBuffer {
        &self.buffer
    }

    /// Drop cached directory listings; the next keystroke re-lists.
    pub fn invalidate_completion(&mut self) {
        self.completion.invalidate();
    }

    /// Scrollback record of a submitted `line`, sized to the last viewport.
    pub fn echo_rows(&self, line: &str, stamp: &str) -> Vec<Row> {
        self.renderer.compose_echo(line, stamp, &self.highlight)
    }

    /// Show `message` in place of the header on the next frame.
    pub fn report_error(&mut self, message: impl Into<String>) {
        self.pending_error = Some(message.into());
    }

    /// Run one read cycle starting from `seed`.
    ///
    /// # Errors
    /// Fails when reading input or presenting a frame fails.
    pub fn read_line<K, S>(
        &mut self,
        seed: Seed,
        history: &HistoryStore,
        input: &mut K,
        sink: &mut S,
    ) -> Result<ReadOutcome>
    where
        K: KeySource,
        S: FrameSink,
    {
        self.buffer.open_line(seed.left, seed.right);
        let (width, rows) = sink.viewport();
        let height = self.config.effective_area_height.min(rows.max(1));
        self.renderer.set_viewport(width, height);

        loop {
            self.present(history, sink)?;
            let Some(unit) = input.next_unit().context("failed to read keyboard input")? else {
                debug!(target: "actions.dispatch", "input_closed");
                return Ok(ReadOutcome::Eof);
            };
            trace!(target: "actions.dispatch", bytes = unit.byte_len(), "unit");
            if let Some(outcome) = self.resolve(&unit, history) {
                debug!(target: "actions.dispatch", outcome = outcome_kind(&outcome), "read_line_done");
                return Ok(outcome);
            }
        }
    }

    fn resolve(&mut self, unit: &CharUnit, history: &HistoryStore) -> Option<ReadOutcome> {
        let key = unit.printable();
        if let Some(binding) = self.keymap.lookup(&key) {
            return match binding {
                Binding::Literal(text) => Some(ReadOutcome::Submitted(text.clone())),
                Binding::Directive { kind, payload } => {
                    match Directive::new(
                        *kind,
                        self.buffer.left().clone(),
                        self.buffer.right().clone(),
                        payload.clone(),
                    ) {
                        Ok(directive) => Some(ReadOutcome::Directive(directive)),
                        Err(err) => {
                            self.report_error(format!("keybind {key}: {err}"));
                            None
                        }
                    }
                }
                Binding::Malformed(err) => {
                    self.report_error(format!("keybind {key}: {err}"));
                    None
                }
            };
        }

        match unit.key() {
            Key::Ctrl('D') => return Some(ReadOutcome::Eof),
            Key::Ctrl('I') => {
                let completion = self.path_completion();
                let left = accept_best(self.buffer.left(), &completion);
                let right = self.buffer.right().clone();
                self.buffer.replace(left, right);
            }
            Key::Ctrl('N') => {
                let suggestion = history_suggestion(history.entries(), self.buffer.left());
                let left = accept_history(self.buffer.left(), &suggestion);
                let right = self.buffer.right().clone();
                self.buffer.replace(left, right);
            }
            Key::Ctrl('M') | Key::Ctrl('J') => {
                return Some(ReadOutcome::Submitted(self.buffer.line().to_string()));
            }
            _ => self.buffer.edit(unit),
        }
        None
    }

    fn path_completion(&mut self) -> PathCompletion {
        if self.buffer.line().is_empty() {
            return PathCompletion::default();
        }
        let left = self.buffer.left().clone();
        self.completion.complete_path(&left)
    }

    fn cwd_label(&self) -> String {
        match &self.cwd_label {
            Some(label) => label.clone(),
            None => env::current_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        }
    }

    fn present<S: FrameSink>(&mut self, history: &HistoryStore, sink: &mut S) -> Result<()> {
        let completion = self.path_completion();
        let suggestion = if self.buffer.right().is_empty() {
            history_suggestion(history.entries(), self.buffer.left())
        } else {
            TextLine::new()
        };
        let cwd = self.cwd_label();
        let error = self.pending_error.take();
        let ctx = RenderContext {
            cwd: &cwd,
            mode: self.buffer.mode(),
            error: error.as_deref(),
            prompt: &self.config.file.general.prompt,
            left: self.buffer.left(),
            right: self.buffer.right(),
            suggestion: &suggestion,
            candidates: &completion.candidates,
            total: completion.total,
            column_margin: self.config.file.general.column_margin,
            highlight: &self.highlight,
        };
        let frame = self.renderer.compose(&ctx);
        sink.present(&frame)
    }
}

fn outcome_kind(outcome: &ReadOutcome) -> &'static str {
    match outcome {
        ReadOutcome::Submitted(_) => "submitted",
        ReadOutcome::Eof => "eof",
        ReadOutcome::Directive(_) => "directive",
    }
}
