//! tessera entrypoint.
use anyhow::{Context, Result};
use clap::Parser;
use core_actions::{Dispatcher, Session};
use core_keymap::Keymap;
use core_render::{Frame, FrameSink, Row, TermWriter};
use core_state::HistoryStore;
use core_terminal::signal::install_interrupt_catch;
use core_terminal::{CharDecoder, RawMode, SeededInput, TtyPort, TtySource};
use crossterm::terminal;
use std::fs;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::Once;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

mod executor;
mod keys;

use executor::ShellExecutor;

/// Size assumed when the terminal cannot be queried.
const FALLBACK_SIZE: (u16, u16) = (80, 24);

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "tessera", version, about = "Interactive command-line front-end")]
struct Args {
    /// Configuration file path (overrides discovery of `tessera.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// History log path (overrides `[history] path`).
    #[arg(long = "history")]
    pub history: Option<PathBuf>,
    /// Keystrokes replayed before terminal input, with `\r`, `\t`, `\e`,
    /// `\xNN` escapes.
    #[arg(long = "keys")]
    pub keys: Option<String>,
}

/// Stdout writer that re-queries the terminal size on every frame.
struct Screen {
    writer: TermWriter<Stdout>,
}

impl FrameSink for Screen {
    fn present(&mut self, frame: &Frame) -> Result<()> {
        self.writer.present(frame)
    }

    fn viewport(&self) -> (u16, u16) {
        terminal::size().unwrap_or_else(|_| self.writer.viewport())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.finish()
    }

    fn echo(&mut self, rows: &[Row]) -> Result<()> {
        self.writer.echo(rows)
    }
}

fn configure_logging() -> Option<WorkerGuard> {
    let log_dir = core_config::log_dir();
    if fs::create_dir_all(&log_dir).is_err() {
        return None;
    }
    let file_appender = tracing_appender::rolling::never(&log_dir, "tessera.log");
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(nb_writer)
        .with_ansi(false)
        .try_init()
    {
        Ok(_) => Some(guard),
        // a global subscriber is already installed; dropping the guard stops the writer
        Err(_) => None,
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = configure_logging();
    install_panic_hook();
    info!(target: "runtime", "startup");

    let interrupted = install_interrupt_catch().context("failed to install SIGINT handler")?;

    let mut config = core_config::load_from(args.config.clone())?;
    let size = terminal::size().unwrap_or(FALLBACK_SIZE);
    config.apply_terminal_rows(size.1);
    let keymap = Keymap::from_bindings(&config.file.keybind);

    let history_path = args.history.clone().unwrap_or_else(|| config.history_path());
    let mut history = HistoryStore::open(history_path.clone(), config.file.history.max_entries);

    let config_path = config.source().map(|p| p.display().to_string());
    info!(
        target: "runtime.startup",
        config = config_path.as_deref(),
        keybinds = keymap.len(),
        history_entries = history.len(),
        area_height = config.effective_area_height,
        "bootstrap_complete"
    );

    let tty = TtySource::stdin(config.file.input.read_timeout_ms)
        .context("failed to open terminal input")?
        .with_interrupt_flag(interrupted);
    let scripted = keys::unescape(args.keys.as_deref().unwrap_or_default());
    let input = SeededInput::from_bytes(&scripted, CharDecoder::new(tty))
        .context("failed to decode --keys")?;
    let screen = Screen {
        writer: TermWriter::new(io::stdout(), size),
    };

    let dispatcher = Dispatcher::new(&config, &keymap, &history);
    let mut session = Session::new(dispatcher, input, screen);
    let mut executor = ShellExecutor::from_env().with_history_path(history_path);
    let result = session.run(&mut history, &mut executor, || RawMode::enter(TtyPort::new()));
    info!(target: "runtime", ok = result.is_ok(), "shutdown");
    result
}
