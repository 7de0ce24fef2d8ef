//! Configuration loading.
//!
//! A single TOML file with `[general]`, `[history]`, `[input]` and `[keybind]`
//! sections. Every field has a default, unknown fields are ignored and a file
//! that fails to parse falls back to defaults with a warning, so a bad config
//! never prevents the prompt from starting.

use anyhow::Result;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const APP_DIR: &str = "tessera";
const CONFIG_FILE: &str = "tessera.toml";
const HISTORY_FILE: &str = "history.txt";
const LOG_DIR: &str = "logs";

/// Smallest usable area: header, edit line and one candidate row.
pub const MIN_AREA_HEIGHT: u16 = 3;

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    #[serde(default = "GeneralConfig::default_area_height")]
    pub area_height: u16,
    #[serde(default = "GeneralConfig::default_column_margin")]
    pub column_margin: u16,
    #[serde(default = "GeneralConfig::default_prompt")]
    pub prompt: String,
    #[serde(default)]
    pub ring_wrap: bool,
    #[serde(default = "GeneralConfig::default_candidate_limit")]
    pub candidate_limit: usize,
    /// Words highlighted as commands on the edit line.
    #[serde(default = "GeneralConfig::default_colorize_commands")]
    pub colorize_commands: Vec<String>,
    #[serde(default = "GeneralConfig::default_colorize_keywords")]
    pub colorize_keywords: Vec<String>,
    /// Operators such as `|` and `&&`.
    #[serde(default = "GeneralConfig::default_colorize_symbols")]
    pub colorize_symbols: Vec<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            area_height: Self::default_area_height(),
            column_margin: Self::default_column_margin(),
            prompt: Self::default_prompt(),
            ring_wrap: false,
            candidate_limit: Self::default_candidate_limit(),
            colorize_commands: Self::default_colorize_commands(),
            colorize_keywords: Self::default_colorize_keywords(),
            colorize_symbols: Self::default_colorize_symbols(),
        }
    }
}

impl GeneralConfig {
    const fn default_area_height() -> u16 {
        8
    }
    const fn default_column_margin() -> u16 {
        3
    }
    fn default_prompt() -> String {
        "> ".to_string()
    }
    const fn default_candidate_limit() -> usize {
        256
    }
    fn default_colorize_commands() -> Vec<String> {
        words(&[
            "cat", "cd", "chmod", "chown", "cp", "echo", "env", "export", "grep", "let", "ln", "ls",
            "make", "mkdir", "mv", "rm", "sed", "set", "tar", "touch", "umask", "unset",
        ])
    }
    fn default_colorize_keywords() -> Vec<String> {
        words(&[
            "case", "do", "done", "elif", "else", "esac", "exit", "fi", "for", "function", "if",
            "in", "local", "read", "return", "select", "shift", "then", "time", "until", "while",
        ])
    }
    fn default_colorize_symbols() -> Vec<String> {
        words(&["&", "|", ">", "<", "&&", "||", ">>", "<<"])
    }
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistoryConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "HistoryConfig::default_max_entries")]
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_entries: Self::default_max_entries(),
        }
    }
}

impl HistoryConfig {
    const fn default_max_entries() -> usize {
        5000
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    /// Upper bound on one blocking wait for keyboard input.
    #[serde(default = "InputConfig::default_read_timeout_ms")]
    pub read_timeout_ms: u16,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: Self::default_read_timeout_ms(),
        }
    }
}

impl InputConfig {
    const fn default_read_timeout_ms() -> u16 {
        100
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub input: InputConfig,
    /// Caret-notation key => template.
    #[serde(default)]
    pub keybind: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub file: ConfigFile,           // parsed (or default) data
    pub source: Option<PathBuf>,    // file the data came from
    pub effective_area_height: u16, // clamped to terminal rows
}

impl Default for Config {
    fn default() -> Self {
        let file = ConfigFile::default();
        let effective_area_height = file.general.area_height.max(MIN_AREA_HEIGHT);
        Self {
            file,
            source: None,
            effective_area_height,
        }
    }
}

/// Config path to use when none is given explicitly: `./tessera.toml` if it
/// exists, else the platform config directory.
pub fn discover() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join(APP_DIR).join(CONFIG_FILE);
    }
    local
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        debug!(target: "config", path = %path.display(), "config_missing_using_defaults");
        return Ok(Config::default());
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => {
            debug!(target: "config", path = %path.display(), keybinds = file.keybind.len(), "config_loaded");
            let effective_area_height = file.general.area_height.max(MIN_AREA_HEIGHT);
            Ok(Config {
                file,
                source: Some(path),
                effective_area_height,
            })
        }
        Err(err) => {
            warn!(target: "config", path = %path.display(), error = %err, "config_parse_failed_using_defaults");
            Ok(Config::default())
        }
    }
}

/// Default history log location.
pub fn default_history_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(HISTORY_FILE))
        .unwrap_or_else(|| PathBuf::from(HISTORY_FILE))
}

/// Directory for the rolling log file.
pub fn log_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(LOG_DIR))
        .unwrap_or_else(|| PathBuf::from(LOG_DIR))
}

impl Config {
    /// History log path: configured value or the platform default.
    pub fn history_path(&self) -> PathBuf {
        self.file
            .history
            .path
            .clone()
            .unwrap_or_else(default_history_path)
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Clamp the area height to `[MIN_AREA_HEIGHT, rows]` for a terminal of
    /// `rows` lines. Returns the effective height.
    pub fn apply_terminal_rows(&mut self, rows: u16) -> u16 {
        let raw = self.file.general.area_height;
        let max = rows.max(MIN_AREA_HEIGHT);
        let clamped = raw.clamp(MIN_AREA_HEIGHT, max);
        if clamped != raw {
            info!(
                target: "config",
                raw,
                clamped,
                rows,
                "area_height_clamped"
            );
        }
        self.effective_area_height = clamped;
        clamped
    }
}
