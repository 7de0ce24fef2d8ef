//! Read, hand off, repeat.
//!
//! Raw mode is held only while a line is being read. Commands and directives
//! run with the terminal restored, and the prompt area is cleared before they
//! start so their output lands where the prompt was. A submitted command is
//! echoed first: a rule, the local time and the highlighted line.

use crate::{Dispatcher, ReadOutcome, Seed};
use anyhow::Result;
use chrono::Local;
use core_complete::{DirectoryLister, FsLister};
use core_render::FrameSink;
use core_state::HistoryStore;
use core_terminal::KeySource;
use core_text::TextLine;
use tracing::{debug, error, info, warn};

/// Builtin that ends the session.
pub const EXIT_COMMAND: &str = "exit";

const STAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn local_stamp() -> String {
    Local::now().format(STAMP_FORMAT).to_string()
}

/// Runs what the dispatcher hands back and picks the next line's seed.
pub trait Executor {
    /// Execute a submitted line.
    fn run_command(&mut self, line: &str) -> Result<Seed>;
    /// Execute a directive given in its wire form.
    fn run_directive(&mut self, wire: &str) -> Result<Seed>;
}

pub struct Session<'a, K, S, L: DirectoryLister = FsLister> {
    dispatcher: Dispatcher<'a, L>,
    input: K,
    sink: S,
    clock: fn() -> String,
}

enum Step {
    Next(Seed),
    Stop,
}

impl<'a, K, S, L> Session<'a, K, S, L>
where
    K: KeySource,
    S: FrameSink,
    L: DirectoryLister,
{
    pub fn new(dispatcher: Dispatcher<'a, L>, input: K, sink: S) -> Self {
        Self {
            dispatcher,
            input,
            sink,
            clock: local_stamp,
        }
    }

    /// Replace the timestamp source used when echoing commands.
    pub fn with_clock(mut self, clock: fn() -> String) -> Self {
        self.clock = clock;
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn dispatcher(&self) -> &Dispatcher<'a, L> {
        &self.dispatcher
    }

    /// Loop until end of input or `exit`, then normalize `history`.
    ///
    /// `enter_raw` is called before every read; the value it returns is
    /// dropped as soon as the read ends.
    ///
    /// # Errors
    /// Fails when raw mode cannot be entered or a read cycle fails. Executor
    /// failures are reported inline and do not end the session.
    pub fn run<E, G, F>(
        &mut self,
        history: &mut HistoryStore,
        executor: &mut E,
        enter_raw: F,
    ) -> Result<()>
    where
        E: Executor,
        F: FnMut() -> Result<G>,
    {
        info!(target: "session", entries = history.len(), "session_start");
        let result = self.cycles(history, executor, enter_raw);
        if let Err(err) = history.normalize() {
            warn!(target: "session", error = %err, "history_normalize_failed");
        }
        info!(target: "session", ok = result.is_ok(), "session_end");
        result
    }

    fn cycles<E, G, F>(
        &mut self,
        history: &mut HistoryStore,
        executor: &mut E,
        mut enter_raw: F,
    ) -> Result<()>
    where
        E: Executor,
        F: FnMut() -> Result<G>,
    {
        let mut seed = Seed::default();
        loop {
            let outcome = {
                let _raw = enter_raw()?;
                let read = self
                    .dispatcher
                    .read_line(seed, history, &mut self.input, &mut self.sink);
                // clear the area even when the read failed
                let finished = self.sink.finish();
                let outcome = read?;
                finished?;
                outcome
            };

            let step = self.hand_off(outcome, history, executor);
            self.dispatcher.invalidate_completion();
            match step {
                Step::Next(next) => seed = next,
                Step::Stop => return Ok(()),
            }
        }
    }

    fn hand_off<E: Executor>(
        &mut self,
        outcome: ReadOutcome,
        history: &mut HistoryStore,
        executor: &mut E,
    ) -> Step {
        let result = match outcome {
            ReadOutcome::Eof => {
                debug!(target: "session", "eof");
                return Step::Stop;
            }
            ReadOutcome::Submitted(line) => {
                let command = line.trim();
                if command.is_empty() {
                    return Step::Next(Seed::default());
                }
                if command == EXIT_COMMAND {
                    debug!(target: "session", "exit_builtin");
                    return Step::Stop;
                }
                history.append(&TextLine::from(line.as_str()));
                let rows = self.dispatcher.echo_rows(&line, &(self.clock)());
                if let Err(err) = self.sink.echo(&rows) {
                    warn!(target: "session", error = %err, "echo_failed");
                }
                debug!(target: "session", len = line.len(), "run_command");
                executor.run_command(&line)
            }
            ReadOutcome::Directive(directive) => {
                debug!(target: "session", kind = directive.kind().wire_tag(), "run_directive");
                executor.run_directive(&directive.encode())
            }
        };
        match result {
            Ok(seed) => Step::Next(seed),
            Err(err) => {
                error!(target: "session", error = %format!("{err:#}"), "executor_failed");
                self.dispatcher.report_error(format!("{err:#}"));
                Step::Next(Seed::default())
            }
        }
    }
}
